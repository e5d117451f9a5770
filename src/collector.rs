use serde_json::{Map, Value};

use crate::{
    configuration::{Field, InformationProfile, Target},
    event::Event,
    extractor::{adjust, empty, ExtractionError},
    instance::datetime_string,
    Logger,
};

/// Output record of one tracked event.
pub type Record = Map<String, Value>;

/// Record seeded with the target name and collection time, when the profile asks for them.
pub(crate) fn default_information(
    target: &Target,
    profile: &InformationProfile,
    timestamp: impl FnOnce() -> String,
) -> Record {
    let mut record = Record::new();
    if let Some(key) = profile.target_name.as_deref().filter(|k| !k.is_empty()) {
        record.insert(key.to_owned(), Value::String(target.name.clone()));
    }
    if let Some(key) = profile.timestamp_name.as_deref().filter(|k| !k.is_empty()) {
        record.insert(key.to_owned(), Value::String(timestamp()));
    }
    record
}

impl Logger {
    /// Build the record for `target` from `profile`.
    pub(crate) fn collect_information(
        &self,
        target: &Target,
        profile: &InformationProfile,
        event: &Event,
    ) -> Record {
        let mut record = default_information(target, profile, datetime_string);
        for field in &profile.fields {
            if let Some(value) = self.field_value(field, event) {
                record.insert(field.name.clone(), value);
            }
        }
        record
    }

    /// Extract and adjust one field. A field whose source cannot be read becomes an empty
    /// value; only fields with an unsupported source are left out.
    pub(crate) fn field_value(&self, field: &Field, event: &Event) -> Option<Value> {
        let value = match self.extractor().extract(field, event) {
            Ok(Some(value)) => value,
            Ok(None) => empty(),
            Err(err) => {
                self.instance.message(format!(
                    "information for field \"{}\" couldn't be collected : {}",
                    field.name, err
                ));
                if err == ExtractionError::UnknownSource {
                    return None;
                }
                empty()
            }
        };
        Some(adjust(field, value))
    }
}
