//! Interfaces to the host page. The engine never touches a real DOM, cookie jar or global scope;
//! the host supplies these collaborators through [`LoggerConfig`](crate::LoggerConfig).
use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{event::Event, registry::InstanceId};

/// Opaque handle of a document element, chosen by the [`Document`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(pub u64);

/// Element selection and listener attachment.
pub trait Document: Send + Sync {
    /// Number of elements currently matching `selector`.
    fn count(&self, selector: &str) -> usize;

    /// Whether `category` names a listener kind this document can attach.
    fn supports_category(&self, category: &str) -> bool;

    /// Attach `listener` to every element matching `selector` for events of kind `category`.
    ///
    /// Implementations must not hold internal locks while calling [`Listener::fire`]: a fired
    /// listener may attach further listeners.
    fn attach_listener(&self, selector: &str, category: &str, listener: Listener);

    /// First element matching `selector`.
    fn select(&self, selector: &str) -> Option<Node>;

    /// Parent element of `node`.
    fn parent(&self, node: Node) -> Option<Node>;

    /// Invoke the getter `method` on `node`. Returns `None` if the element has no such getter.
    fn call(&self, node: Node, method: &str, parameter: Option<&str>) -> Option<Value>;
}

/// Global scope of the page (the `window` source).
pub trait Window: Send + Sync {
    /// Top-level global property `name`.
    fn global(&self, name: &str) -> Option<Value>;
}

impl Window for Value {
    fn global(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Read access to the serialized cookie string (`a=1; b=2`).
pub trait CookieSource: Send + Sync {
    fn cookie_string(&self) -> String;
}

impl CookieSource for String {
    fn cookie_string(&self) -> String {
        self.clone()
    }
}

impl CookieSource for &'static str {
    fn cookie_string(&self) -> String {
        (*self).to_owned()
    }
}

/// Lookup of named ambient values (the `variable` source). Only names the host chooses to expose
/// are resolvable.
pub trait VariableLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<T: Fn(&str) -> Option<Value> + Send + Sync> VariableLookup for T {
    fn lookup(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Whitelisted symbol table for [`VariableLookup`].
#[derive(Debug, Clone, Default)]
pub struct VariableTable(HashMap<String, Value>);

impl VariableTable {
    pub fn new() -> VariableTable {
        VariableTable::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> VariableTable {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }
}

impl VariableLookup for VariableTable {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.0.get(name).cloned()
    }
}

/// Context carried by every listener the engine attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerContext {
    pub instance: InstanceId,
    pub target: String,
}

type Handler = dyn Fn(&ListenerContext, &Event) + Send + Sync;

/// A listener handed to [`Document::attach_listener`]. The host calls [`Listener::fire`] whenever
/// a matching event happens.
#[derive(Clone)]
pub struct Listener {
    context: ListenerContext,
    handler: Arc<Handler>,
}

impl Listener {
    pub(crate) fn new(
        context: ListenerContext,
        handler: impl Fn(&ListenerContext, &Event) + Send + Sync + 'static,
    ) -> Listener {
        Listener {
            context,
            handler: Arc::new(handler),
        }
    }

    pub fn context(&self) -> &ListenerContext {
        &self.context
    }

    pub fn fire(&self, event: &Event) {
        (self.handler)(&self.context, event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Cookie string split into `name -> value` pairs. Entries without `=` are ignored.
pub(crate) fn parse_cookies(cookie: &str) -> HashMap<&str, &str> {
    cookie
        .trim()
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .collect()
}
