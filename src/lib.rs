//! A configuration-driven interaction logging engine.
//!
//! # Overview
//!
//! A [`Configuration`] describes which page elements to watch ([`Target`]s), which events on them
//! count, and what to record when they fire ([`InformationProfile`]s). A [`Logger`] binds
//! listeners to those targets through a host-supplied [`Document`], queues every captured event
//! and delivers the collected records to a remote collector, one request at a time and in the
//! order the events happened.
//!
//! Loggers are created with [`LoggerConfig`] and live in a [`Registry`]. Each gets a numeric
//! [`InstanceId`] which travels with its requests, so that responses can be routed back to the
//! instance that sent them.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Only starting a logger can fail. Once running,
//! problems with individual events or deliveries are written to the instance log
//! ([`Logger::log`]) and never reach the host.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate under the `frontlog`
//! target. Instance log lines are emitted at `info` level when the instance is in debug mode and
//! at `trace` level otherwise.

#![warn(rustdoc::missing_crate_level_docs)]

mod binder;
mod collector;
mod config;
mod configuration;
mod dispatcher;
mod error;
mod event;
mod extractor;
mod forwarder;
mod host;
mod instance;
mod loader;
mod logger;
mod queue;
mod registry;
mod transport;

#[cfg(test)]
mod test_support;

pub use collector::Record;
pub use config::LoggerConfig;
pub use configuration::{
    ConsoleConfig, Configuration, DebugConfig, Field, FieldSource, InformationProfile, Target,
    TargetType,
};
pub use error::{Error, Result};
pub use event::{resolve_path, Event};
pub use forwarder::INSTANCE_HEADER;
pub use host::{
    CookieSource, Document, Listener, ListenerContext, Node, VariableLookup, VariableTable, Window,
};
pub use loader::{resolve_location, ConfigurationFetcher, ConfigurationSource};
pub use logger::Logger;
pub use registry::{InstanceId, Registry};
pub use transport::{BoxFuture, HttpTransport, OutboundRequest, Transport, TransportResponse};
