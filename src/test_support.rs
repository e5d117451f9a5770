//! In-memory collaborators for unit tests.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::{json, Value};

use crate::{
    forwarder::INSTANCE_HEADER,
    host::{Document, Listener, Node},
    transport::{BoxFuture, OutboundRequest, Transport, TransportResponse},
    Result,
};

/// Document with a flat list of nodes, each registered under one selector.
#[derive(Default)]
pub struct FakeDocument {
    categories: Option<HashSet<String>>,
    state: Mutex<DocumentState>,
}

#[derive(Default)]
struct DocumentState {
    nodes: Vec<FakeNode>,
    listeners: Vec<(String, String, Listener)>,
    queries: HashMap<String, usize>,
    calls: Vec<(String, String, Option<String>)>,
}

struct FakeNode {
    selector: String,
    parent: Option<Node>,
    methods: HashMap<String, Value>,
}

impl FakeDocument {
    /// Document accepting every event category.
    pub fn new() -> FakeDocument {
        FakeDocument::default()
    }

    pub fn with_categories(categories: &[&str]) -> FakeDocument {
        FakeDocument {
            categories: Some(categories.iter().map(|c| (*c).to_owned()).collect()),
            state: Mutex::default(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap()
    }

    pub fn add_node(&self, selector: &str, parent: Option<Node>) -> Node {
        let mut state = self.state();
        state.nodes.push(FakeNode {
            selector: selector.to_owned(),
            parent,
            methods: HashMap::new(),
        });
        Node(state.nodes.len() as u64 - 1)
    }

    pub fn add_elements(&self, selector: &str, count: usize) {
        for _ in 0..count {
            self.add_node(selector, None);
        }
    }

    pub fn set_method(&self, node: Node, name: &str, value: Value) {
        self.state().nodes[node.0 as usize]
            .methods
            .insert(name.to_owned(), value);
    }

    /// `(selector, category)` of every attached listener, in attachment order.
    pub fn attached(&self) -> Vec<(String, String)> {
        self.state()
            .listeners
            .iter()
            .map(|(selector, category, _)| (selector.clone(), category.clone()))
            .collect()
    }

    /// How often [`Document::count`] was asked about `selector`.
    pub fn count_queries(&self, selector: &str) -> usize {
        self.state().queries.get(selector).copied().unwrap_or(0)
    }

    /// `(selector of node, method, parameter)` of every getter call.
    pub fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.state().calls.clone()
    }

    /// Fire every listener attached for `selector` and `category`.
    pub fn fire(&self, selector: &str, category: &str, event: &crate::event::Event) {
        let listeners: Vec<Listener> = self
            .state()
            .listeners
            .iter()
            .filter(|(s, c, _)| s == selector && c == category)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener.fire(event);
        }
    }
}

impl Document for FakeDocument {
    fn count(&self, selector: &str) -> usize {
        let mut state = self.state();
        *state.queries.entry(selector.to_owned()).or_default() += 1;
        state
            .nodes
            .iter()
            .filter(|node| node.selector == selector)
            .count()
    }

    fn supports_category(&self, category: &str) -> bool {
        self.categories
            .as_ref()
            .map_or(true, |categories| categories.contains(category))
    }

    fn attach_listener(&self, selector: &str, category: &str, listener: Listener) {
        self.state()
            .listeners
            .push((selector.to_owned(), category.to_owned(), listener));
    }

    fn select(&self, selector: &str) -> Option<Node> {
        self.state()
            .nodes
            .iter()
            .position(|node| node.selector == selector)
            .map(|index| Node(index as u64))
    }

    fn parent(&self, node: Node) -> Option<Node> {
        self.state().nodes.get(node.0 as usize)?.parent
    }

    fn call(&self, node: Node, method: &str, parameter: Option<&str>) -> Option<Value> {
        let mut state = self.state();
        let selector = state.nodes.get(node.0 as usize)?.selector.clone();
        state.calls.push((
            selector,
            method.to_owned(),
            parameter.map(str::to_owned),
        ));
        state.nodes[node.0 as usize].methods.get(method).cloned()
    }
}

/// Transport that answers every request itself after an optional latency.
///
/// By default it echoes the correlation header and answers `200 {"message": "Saved to
/// database."}`.
#[derive(Clone, Default)]
pub struct FakeTransport {
    latency: Duration,
    state: Arc<Mutex<TransportState>>,
}

#[derive(Default)]
struct TransportState {
    requests: Vec<OutboundRequest>,
    /// `None` echoes the request's header, `Some(None)` echoes nothing.
    echo: Option<Option<String>>,
    failure: Option<u16>,
    in_flight: usize,
    max_in_flight: usize,
}

impl FakeTransport {
    pub fn new() -> FakeTransport {
        FakeTransport::default()
    }

    pub fn latency(mut self, latency: Duration) -> FakeTransport {
        self.latency = latency;
        self
    }

    /// Correlation header to put on responses instead of the request's own.
    pub fn echo_instance(&self, instance: Option<&str>) {
        self.state.lock().unwrap().echo = Some(instance.map(str::to_owned));
    }

    /// Answer every following request with `status` and no body.
    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().failure = Some(status);
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }
}

impl Transport for FakeTransport {
    fn post(&self, request: OutboundRequest) -> BoxFuture<'static, Result<TransportResponse>> {
        let state = Arc::clone(&self.state);
        let latency = self.latency;

        Box::pin(async move {
            let echo = {
                let mut state = state.lock().unwrap();
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
                let echo = match &state.echo {
                    None => request.header(INSTANCE_HEADER).map(str::to_owned),
                    Some(echo) => echo.clone(),
                };
                state.requests.push(request);
                echo
            };

            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut state = state.lock().unwrap();
            state.in_flight -= 1;

            let headers = echo
                .map(|id| HashMap::from([(INSTANCE_HEADER.to_owned(), id)]))
                .unwrap_or_default();
            let response = match state.failure {
                Some(status) => TransportResponse {
                    status,
                    headers,
                    body: None,
                },
                None => TransportResponse {
                    status: 200,
                    headers,
                    body: Some(json!({"message": "Saved to database."})),
                },
            };
            Ok(response)
        })
    }
}
