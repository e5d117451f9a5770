//! Events delivered by the host when a bound listener fires.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fired input event, as a JSON-shaped object.
///
/// Fields are read with dotted paths (`target.id`, `originalEvent.which`). Keyboard filtering
/// looks for `which`/`keyCode`, `altKey` and `shiftKey` at the top level first and in
/// `originalEvent` second, so both flat and wrapped event objects work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Value);

impl Event {
    pub fn new(value: Value) -> Event {
        Event(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Resolve a dotted property path against the event.
    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.0, path)
    }

    /// Physical key code of a keyboard event.
    pub fn key_code(&self) -> Option<u64> {
        ["which", "keyCode", "originalEvent.which", "originalEvent.keyCode"]
            .iter()
            .find_map(|path| self.get(path).and_then(Value::as_u64))
    }

    pub fn alt_key(&self) -> bool {
        self.flag("altKey")
    }

    pub fn shift_key(&self) -> bool {
        self.flag("shiftKey")
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name)
            .or_else(|| self.get(&format!("originalEvent.{name}")))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        Event(value)
    }
}

/// Walk `path` one `.`-separated segment at a time. Objects are indexed by key, arrays by
/// position. Returns `None` as soon as a segment is missing, which is distinct from a property
/// that holds an empty string.
pub fn resolve_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.split('.').try_fold(source, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
