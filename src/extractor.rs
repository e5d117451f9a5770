//! Field extraction: resolve one [`Field`] against its source, then apply the configured
//! adjustments.
use chrono::{DateTime, Datelike, Local, SecondsFormat, Timelike, Utc};
use serde_json::Value;

use crate::{
    configuration::{Field, FieldSource},
    event::{resolve_path, Event},
    host::{parse_cookies, CookieSource, Document, VariableLookup, Window},
};

/// Extraction failures that deserve a log line. Everything else that cannot be found simply
/// yields no value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub(crate) enum ExtractionError {
    #[error("variable {0:?} is not defined")]
    UndefinedVariable(String),
    #[error("source is not supported")]
    UnknownSource,
}

/// Borrowed view of the host collaborators a field may read from.
pub(crate) struct Extractor<'a> {
    pub document: &'a dyn Document,
    pub window: &'a dyn Window,
    pub cookies: &'a dyn CookieSource,
    pub variables: &'a dyn VariableLookup,
}

impl Extractor<'_> {
    /// Resolve `field` without adjustments. `Ok(None)` means the source had nothing to offer.
    pub fn extract(&self, field: &Field, event: &Event) -> Result<Option<Value>, ExtractionError> {
        let value = match field.source {
            FieldSource::Event => event.get(&field.value).cloned(),
            FieldSource::Window => self.extract_window(&field.value),
            FieldSource::Date => extract_date(field, Local::now()),
            FieldSource::Query => self.extract_query(field),
            FieldSource::Cookie => {
                let cookie = self.cookies.cookie_string();
                parse_cookies(&cookie)
                    .get(field.value.as_str())
                    .map(|value| Value::String((*value).to_owned()))
            }
            FieldSource::Variable => Some(
                self.variables
                    .lookup(&field.value)
                    .ok_or_else(|| ExtractionError::UndefinedVariable(field.value.clone()))?,
            ),
            FieldSource::Constant => Some(Value::String(field.value.clone())),
            FieldSource::Unknown => return Err(ExtractionError::UnknownSource),
        };
        Ok(value)
    }

    fn extract_window(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        if head.is_empty() {
            return None;
        }

        let global = self.window.global(head)?;
        match rest {
            Some(rest) => resolve_path(&global, rest).cloned(),
            None => Some(global),
        }
    }

    fn extract_query(&self, field: &Field) -> Option<Value> {
        let mut node = self.document.select(&field.value)?;
        for _ in 0..field.element_parent.unwrap_or(0) {
            node = self.document.parent(node)?;
        }

        let method = field.get.as_deref().filter(|get| !get.is_empty())?;
        let parameter = field.parameter.as_deref().filter(|p| !p.is_empty());

        self.document
            .call(node, method, parameter)
            .or_else(|| self.document.call(node, &getter_name(method), parameter))
    }
}

/// `fullYear` -> `getFullYear`.
fn getter_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_owned(),
    }
}

fn extract_date(field: &Field, now: DateTime<Local>) -> Option<Value> {
    let get = field.get.as_deref().filter(|get| !get.is_empty());

    if field.value.is_empty() && get.is_none() {
        // A bare date serializes like `Date.prototype.toJSON`.
        return date_method(&now, "toJSON");
    }
    if let Some(value) = Some(&field.value)
        .filter(|value| !value.is_empty())
        .and_then(|value| date_property(&now, value))
    {
        return Some(value);
    }

    let get = get?;
    date_method(&now, get).or_else(|| date_method(&now, &getter_name(get)))
}

fn date_property(now: &DateTime<Local>, name: &str) -> Option<Value> {
    let value: Value = match name {
        "year" => now.year().into(),
        "month" => now.month().into(),
        "day" => now.day().into(),
        "weekday" => now.weekday().num_days_from_sunday().into(),
        "hours" => now.hour().into(),
        "minutes" => now.minute().into(),
        "seconds" => now.second().into(),
        "milliseconds" => now.timestamp_subsec_millis().into(),
        "time" => now.timestamp_millis().into(),
        _ => return None,
    };
    Some(value)
}

/// Getters of a JavaScript `Date`, including its 0-based months.
fn date_method(now: &DateTime<Local>, name: &str) -> Option<Value> {
    let value: Value = match name {
        "getFullYear" => now.year().into(),
        "getMonth" => now.month0().into(),
        "getDate" => now.day().into(),
        "getDay" => now.weekday().num_days_from_sunday().into(),
        "getHours" => now.hour().into(),
        "getMinutes" => now.minute().into(),
        "getSeconds" => now.second().into(),
        "getMilliseconds" => now.timestamp_subsec_millis().into(),
        "getTime" | "valueOf" => now.timestamp_millis().into(),
        "getTimezoneOffset" => (-now.offset().local_minus_utc() / 60).into(),
        "toISOString" | "toJSON" => now
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .into(),
        "toString" => now.to_rfc2822().into(),
        _ => return None,
    };
    Some(value)
}

/// Apply `divisor`, then `split`/`position`.
pub(crate) fn adjust(field: &Field, value: Value) -> Value {
    let mut value = value;

    if let Some(divisor) = field.divisor {
        value = divide(&value, divisor);
    }

    if let (Some(separator), Some(position)) = (field.split.as_deref(), field.position) {
        let text = stringify(&value);
        value = usize::try_from(position)
            .ok()
            .and_then(|position| segment(&text, separator, position))
            .map(Value::String)
            .unwrap_or_else(empty);
    }

    value
}

/// Segment `position` of `text` split at `separator`. An empty separator splits into
/// characters.
fn segment(text: &str, separator: &str, position: usize) -> Option<String> {
    if separator.is_empty() {
        text.chars().nth(position).map(String::from)
    } else {
        text.split(separator).nth(position).map(str::to_owned)
    }
}

/// Integer floor division. Non-numeric values and a zero divisor yield an empty value.
fn divide(value: &Value, divisor: f64) -> Value {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number.map(|n| (n / divisor).floor()) {
        Some(result) if result.is_finite() => {
            if result.abs() < i64::MAX as f64 {
                Value::from(result as i64)
            } else {
                Value::from(result)
            }
        }
        _ => empty(),
    }
}

/// Text form of a value: strings as-is, `null` as empty, anything else as JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn empty() -> Value {
    Value::String(String::new())
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone, Utc};
    use serde_json::{json, Value};

    use super::{adjust, extract_date, getter_name, ExtractionError, Extractor};
    use crate::{
        configuration::{Field, FieldSource},
        event::Event,
        host::VariableTable,
        test_support::FakeDocument,
    };

    fn field(source: FieldSource, value: &str) -> Field {
        Field {
            name: "out".to_owned(),
            source,
            value: value.to_owned(),
            get: None,
            parameter: None,
            element_parent: None,
            split: None,
            position: None,
            divisor: None,
            datatype: None,
        }
    }

    struct Host {
        document: FakeDocument,
        window: Value,
        cookies: String,
        variables: VariableTable,
    }

    impl Host {
        fn new() -> Host {
            Host {
                document: FakeDocument::new(),
                window: json!({"location": {"href": "https://example.com/page?id=7"}, "innerWidth": 1280}),
                cookies: "sessionId=abc; theme=dark".to_owned(),
                variables: VariableTable::new().with("release", "1.4.2"),
            }
        }

        fn extractor(&self) -> Extractor<'_> {
            Extractor {
                document: &self.document,
                window: &self.window,
                cookies: &self.cookies,
                variables: &self.variables,
            }
        }
    }

    #[test]
    fn constant_is_returned_verbatim() {
        let host = Host::new();
        let constant = field(FieldSource::Constant, "application/json");
        let event = Event::default();

        for _ in 0..3 {
            assert_eq!(
                host.extractor().extract(&constant, &event),
                Ok(Some(json!("application/json")))
            );
        }
    }

    #[test]
    fn reads_event_and_window_paths() {
        let host = Host::new();
        let event = Event::new(json!({"target": {"id": "submit"}, "type": "click"}));

        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Event, "target.id"), &event),
            Ok(Some(json!("submit")))
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Event, "target.missing.id"), &event),
            Ok(None)
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Window, "location.href"), &event),
            Ok(Some(json!("https://example.com/page?id=7")))
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Window, "innerWidth"), &event),
            Ok(Some(json!(1280)))
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Window, "document.title"), &event),
            Ok(None)
        );
    }

    #[test]
    fn reads_cookies() {
        let host = Host::new();

        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Cookie, "theme"), &Event::default()),
            Ok(Some(json!("dark")))
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Cookie, "absent"), &Event::default()),
            Ok(None)
        );
    }

    #[test]
    fn undefined_variables_are_errors() {
        let host = Host::new();

        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Variable, "release"), &Event::default()),
            Ok(Some(json!("1.4.2")))
        );
        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Variable, "window.secret"), &Event::default()),
            Err(ExtractionError::UndefinedVariable("window.secret".to_owned()))
        );
    }

    #[test]
    fn query_walks_parents_and_falls_back_to_getter_names() {
        let host = Host::new();
        let form = host.document.add_node("form", None);
        host.document.set_method(form, "getAttr", json!("checkout"));
        let button = host.document.add_node("#submit", Some(form));
        host.document.set_method(button, "text", json!("Pay"));

        let mut text = field(FieldSource::Query, "#submit");
        text.get = Some("text".to_owned());
        assert_eq!(
            host.extractor().extract(&text, &Event::default()),
            Ok(Some(json!("Pay")))
        );

        let mut attr = field(FieldSource::Query, "#submit");
        attr.element_parent = Some(1);
        attr.get = Some("attr".to_owned());
        attr.parameter = Some("name".to_owned());
        assert_eq!(
            host.extractor().extract(&attr, &Event::default()),
            Ok(Some(json!("checkout")))
        );
        assert_eq!(
            host.document.calls(),
            [
                ("#submit".to_owned(), "text".to_owned(), None),
                ("form".to_owned(), "attr".to_owned(), Some("name".to_owned())),
                ("form".to_owned(), "getAttr".to_owned(), Some("name".to_owned())),
            ]
        );

        attr.element_parent = Some(2);
        assert_eq!(host.extractor().extract(&attr, &Event::default()), Ok(None));

        let missing = field(FieldSource::Query, ".nothing");
        assert_eq!(host.extractor().extract(&missing, &Event::default()), Ok(None));
    }

    #[test]
    fn unknown_source_is_an_error() {
        let host = Host::new();

        assert_eq!(
            host.extractor()
                .extract(&field(FieldSource::Unknown, "x"), &Event::default()),
            Err(ExtractionError::UnknownSource)
        );
    }

    #[test]
    fn date_supports_value_properties_and_getters() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();

        let whole = field(FieldSource::Date, "");
        let iso = now
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        assert_eq!(extract_date(&whole, now), Some(json!(iso)));
        assert!(iso.ends_with(".000Z"), "{iso}");

        let year = field(FieldSource::Date, "year");
        assert_eq!(extract_date(&year, now), Some(json!(2024)));

        let mut month = field(FieldSource::Date, "");
        month.get = Some("getMonth".to_owned());
        assert_eq!(extract_date(&month, now), Some(json!(2)));

        let mut hours = field(FieldSource::Date, "");
        hours.get = Some("hours".to_owned());
        assert_eq!(extract_date(&hours, now), Some(json!(14)));

        let mut fallback = field(FieldSource::Date, "unknownProperty");
        fallback.get = Some("date".to_owned());
        assert_eq!(extract_date(&fallback, now), Some(json!(9)));

        let mut bogus = field(FieldSource::Date, "");
        bogus.get = Some("explode".to_owned());
        assert_eq!(extract_date(&bogus, now), None);
    }

    #[test]
    fn getter_names_are_camel_cased() {
        assert_eq!(getter_name("fullYear"), "getFullYear");
        assert_eq!(getter_name("text"), "getText");
        assert_eq!(getter_name(""), "get");
    }

    #[test]
    fn divisor_floors() {
        let mut seconds = field(FieldSource::Constant, "");
        seconds.divisor = Some(1000.0);

        assert_eq!(adjust(&seconds, json!(2500)), json!(2));
        assert_eq!(adjust(&seconds, json!("2999")), json!(2));
        assert_eq!(adjust(&seconds, json!(-1)), json!(-1));
        assert_eq!(adjust(&seconds, json!("soon")), json!(""));

        seconds.divisor = Some(0.0);
        assert_eq!(adjust(&seconds, json!(5)), json!(""));
    }

    #[test]
    fn split_picks_position() {
        let mut segment = field(FieldSource::Constant, "");
        segment.split = Some("/".to_owned());
        segment.position = Some(5);
        assert_eq!(adjust(&segment, json!("a/b/c/d/e/f")), json!("f"));

        segment.position = Some(99);
        assert_eq!(adjust(&segment, json!("a/b/c/d/e/f")), json!(""));

        segment.position = Some(-1);
        assert_eq!(adjust(&segment, json!("a/b/c/d/e/f")), json!(""));

        segment.split = Some(".".to_owned());
        segment.position = Some(1);
        assert_eq!(adjust(&segment, json!(12.5)), json!("5"));
    }

    #[test]
    fn empty_separator_splits_characters() {
        let mut segment = field(FieldSource::Constant, "");
        segment.split = Some(String::new());
        segment.position = Some(0);
        assert_eq!(adjust(&segment, json!("abc")), json!("a"));

        segment.position = Some(2);
        assert_eq!(adjust(&segment, json!("abc")), json!("c"));

        segment.position = Some(3);
        assert_eq!(adjust(&segment, json!("abc")), json!(""));
    }

    #[test]
    fn split_without_position_is_ignored() {
        let mut segment = field(FieldSource::Constant, "");
        segment.split = Some("/".to_owned());

        assert_eq!(adjust(&segment, json!("a/b")), json!("a/b"));
    }

    #[test]
    fn divisor_then_split() {
        let mut both = field(FieldSource::Constant, "");
        both.divisor = Some(10.0);
        both.split = Some("0".to_owned());
        both.position = Some(0);

        assert_eq!(adjust(&both, json!(1234)), json!("123"));
    }
}
