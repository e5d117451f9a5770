//! Declarative description of what to instrument: targets to bind, information profiles to
//! collect, and where to deliver the resulting records.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Root configuration of a logger instance.
///
/// Loaded once per instance. The only part that changes afterwards is [`Target::bound`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Default endpoint records are posted to.
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub debug: DebugConfig,
    /// Targets in declaration order.
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub information: Vec<InformationProfile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Turn debug output on when the instance is initialized.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Shape of the lines written to the instance log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Prefix lines with the local date and time.
    #[serde(default)]
    pub date: bool,
    /// Prefix lines with the logger name and instance id.
    #[serde(default)]
    pub class: bool,
}

/// A UI element plus the listener kind that should be observed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Unique name. Used as listener key and as dependency reference.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TargetType,
    /// Listener kind, e.g. `click`, `mouseover`, `focus`, `blur`, `keydown`.
    pub category: String,
    pub selector: String,
    /// Key code a keyboard event must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_alt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_shift: Option<bool>,
    /// Id of the [`InformationProfile`] used when this target fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    /// Endpoint override for this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Targets gated by this one. They are not bound up front; they are bound the first time
    /// this target fires.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    /// Keep retrying the binding until the selector matches an element.
    #[serde(default)]
    pub delayed: bool,
    #[serde(default)]
    pub bound: bool,
}

impl Target {
    /// Profile id, if one is set and non-empty.
    pub fn information_id(&self) -> Option<&str> {
        self.information.as_deref().filter(|id| !id.is_empty())
    }

    /// Receiver override, if one is set and non-empty.
    pub fn receiver_override(&self) -> Option<&str> {
        self.receiver.as_deref().filter(|r| !r.is_empty())
    }
}

/// Kind of input a target listens to. Values other than `mouse` and `keyboard` are kept as-is so
/// they can be reported, but such targets are never bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetType {
    Mouse,
    Keyboard,
    Other(String),
}

impl From<String> for TargetType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mouse" => TargetType::Mouse,
            "keyboard" => TargetType::Keyboard,
            _ => TargetType::Other(value),
        }
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        match value {
            TargetType::Mouse => "mouse".to_owned(),
            TargetType::Keyboard => "keyboard".to_owned(),
            TargetType::Other(other) => other,
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Mouse => f.write_str("mouse"),
            TargetType::Keyboard => f.write_str("keyboard"),
            TargetType::Other(other) => f.write_str(other),
        }
    }
}

/// Named bundle of header and body fields for one kind of logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationProfile {
    pub id: String,
    /// Record key that receives the name of the firing target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    /// Record key that receives the local time of collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_name: Option<String>,
    /// Fields added to the outbound request headers.
    #[serde(default)]
    pub header: Vec<Field>,
    /// Fields that make up the record body.
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// One extraction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Output key.
    pub name: String,
    pub source: FieldSource,
    /// Source specific: property path, selector, cookie name, variable name or literal.
    #[serde(default)]
    pub value: String,
    /// Getter invoked on the resolved object (`date` and `query` sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Number of ancestor hops before the getter is invoked (`query` source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_parent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisor: Option<f64>,
    /// Accepted for compatibility, not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Event,
    Window,
    Date,
    Query,
    Cookie,
    Variable,
    Constant,
    #[serde(other)]
    Unknown,
}

impl Configuration {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Configuration> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check invariants that binding relies on.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateTarget`] if two targets share a name.
    /// - [`Error::DependencyCycle`] if dependency lists reference each other in a loop.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(Error::DuplicateTarget(target.name.clone()));
            }
        }

        if let Some(cycle) = self.find_dependency_cycle() {
            return Err(Error::DependencyCycle(cycle));
        }

        Ok(())
    }

    /// Names that appear in some target's dependency list. These are skipped during the initial
    /// binding pass.
    pub fn gated_names(&self) -> HashSet<&str> {
        self.targets
            .iter()
            .flat_map(|target| target.targets.iter().map(String::as_str))
            .collect()
    }

    /// `(target, dependency)` pairs where the dependency does not name any target.
    pub fn unknown_dependencies(&self) -> Vec<(&str, &str)> {
        let names: HashSet<&str> = self.targets.iter().map(|t| t.name.as_str()).collect();
        self.targets
            .iter()
            .flat_map(|target| {
                target
                    .targets
                    .iter()
                    .filter(|dependency| !names.contains(dependency.as_str()))
                    .map(move |dependency| (target.name.as_str(), dependency.as_str()))
            })
            .collect()
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|target| target.name == name)
    }

    pub fn profile(&self, id: &str) -> Option<&InformationProfile> {
        self.information.iter().find(|profile| profile.id == id)
    }

    /// Endpoint for records of `target`: its override, else the configured default.
    pub fn receiver_for<'a>(&'a self, target: &'a Target) -> Option<&'a str> {
        target
            .receiver_override()
            .or_else(|| Some(self.receiver.as_str()).filter(|r| !r.is_empty()))
    }

    fn find_dependency_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            name: &'a str,
            edges: &HashMap<&'a str, &'a [String]>,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| (*n).to_owned()).collect();
                    cycle.push(name.to_owned());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);
            path.push(name);
            for next in edges.get(name).copied().unwrap_or_default() {
                if edges.contains_key(next.as_str()) {
                    if let Some(cycle) = visit(next, edges, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            None
        }

        let edges: HashMap<&str, &[String]> = self
            .targets
            .iter()
            .map(|target| (target.name.as_str(), target.targets.as_slice()))
            .collect();
        let mut marks = HashMap::new();
        let mut path = Vec::new();

        self.targets
            .iter()
            .find_map(|target| visit(&target.name, &edges, &mut marks, &mut path))
    }
}
