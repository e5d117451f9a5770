//! Outbound delivery of collected records.
use std::{collections::HashMap, future::Future, pin::Pin};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::Result;

/// Boxed future returned by [`Transport::post`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single POST request carrying one record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Record serialized as JSON.
    pub body: String,
}

impl OutboundRequest {
    /// Header value looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// What came back for an [`OutboundRequest`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Response body, if it was JSON.
    pub body: Option<Value>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `message` property of a JSON body.
    pub fn message(&self) -> Option<&str> {
        self.body.as_ref()?.get("message")?.as_str()
    }
}

/// Sends records to the collector. Completes once the response (or failure) is known.
pub trait Transport: Send + Sync {
    fn post(&self, request: OutboundRequest) -> BoxFuture<'static, Result<TransportResponse>>;
}

/// [`Transport`] over HTTP using `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> HttpTransport {
        HttpTransport::default()
    }

    pub fn with_client(client: reqwest::Client) -> HttpTransport {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: OutboundRequest) -> BoxFuture<'static, Result<TransportResponse>> {
        Box::pin(send(self.client.clone(), request))
    }
}

async fn send(client: reqwest::Client, request: OutboundRequest) -> Result<TransportResponse> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                log::warn!(target: "frontlog", header:display = name; "skipping invalid request header");
            }
        }
    }

    log::debug!(target: "frontlog", url:display = request.url; "posting record");
    let response = client
        .post(&request.url)
        .headers(headers)
        .body(request.body)
        .send()
        .await?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect();
    let body = response.json::<Value>().await.ok();

    Ok(TransportResponse {
        status,
        headers,
        body,
    })
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
