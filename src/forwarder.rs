use std::collections::HashMap;

use serde_json::Value;

use crate::{
    collector::Record,
    configuration::{InformationProfile, Target},
    event::Event,
    extractor::stringify,
    registry::InstanceId,
    transport::{OutboundRequest, TransportResponse},
    Logger, Result,
};

/// Request header that carries the id of the sending instance. Responses are routed back by it.
pub const INSTANCE_HEADER: &str = "X-Logging-Instance";

const SERVER_NOT_REACHABLE: &str = "server not reachable";

/// Insert a header, replacing any existing header whose name differs only in case.
fn set_header(headers: &mut HashMap<String, String>, name: &str, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value);
}

impl Logger {
    /// Prepare the POST for `record`. Returns `None` when no receiver is configured.
    pub(crate) fn build_request(
        &self,
        target: &Target,
        profile: &InformationProfile,
        event: &Event,
        record: Record,
    ) -> Option<OutboundRequest> {
        let url = self.instance.receiver_for(target)?;

        let mut headers = HashMap::new();
        set_header(&mut headers, INSTANCE_HEADER, self.instance.id().to_string());
        set_header(&mut headers, "Content-Type", "application/json".to_owned());
        for field in &profile.header {
            if let Some(value) = self.field_value(field, event) {
                set_header(&mut headers, &field.name, stringify(&value));
            }
        }

        Some(OutboundRequest {
            url,
            headers,
            body: Value::Object(record).to_string(),
        })
    }

    /// Send `record` and wait for the outcome. The outcome is handed to the instance named by the
    /// correlation header; failures are logged and never stop the caller.
    pub(crate) async fn forward_information(
        &self,
        target: &Target,
        profile: &InformationProfile,
        event: &Event,
        record: Record,
    ) {
        let Some(request) = self.build_request(target, profile, event, record) else {
            self.instance.message(format!(
                "no receiver for logging the target \"{}\"",
                target.name
            ));
            return;
        };

        let sent_by = request.header(INSTANCE_HEADER).map(str::to_owned);
        let result = self.transport.post(request).await;

        let echoed = result
            .as_ref()
            .ok()
            .and_then(|response| response.header(INSTANCE_HEADER))
            .map(str::to_owned);
        let origin = echoed
            .or(sent_by)
            .and_then(|id| id.parse::<InstanceId>().ok())
            .and_then(|id| self.registry.upgrade()?.get(id));

        match origin {
            Some(origin) => origin.handle_response(&result),
            None => {
                log::warn!(target: "frontlog",
                           instance = usize::from(self.instance.id());
                           "response does not belong to a registered logger instance");
            }
        }
    }

    /// Log the outcome of a delivery.
    pub(crate) fn handle_response(&self, result: &Result<TransportResponse>) {
        match result {
            Ok(response) if response.is_success() => match response.message() {
                Some(message) => self
                    .instance
                    .message(format!("data was sent successfully : {message}")),
                None => self.instance.message("data was sent successfully"),
            },
            Ok(response) => {
                log::debug!(target: "frontlog", status = response.status; "collector rejected record");
                self.instance.message(format!(
                    "data could not be sent : {}",
                    response.message().unwrap_or(SERVER_NOT_REACHABLE)
                ));
            }
            Err(err) => {
                log::debug!(target: "frontlog", "error while sending record: {:?}", err);
                self.instance
                    .message(format!("data could not be sent : {SERVER_NOT_REACHABLE}"));
            }
        }
    }
}
