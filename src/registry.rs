//! Process-wide list of logger instances. An instance's position in the list is its permanent
//! id; responses carry that id back so they can be routed to the instance that sent the request.
use std::sync::{Arc, RwLock};

use derive_more::{From, Into};

use crate::Logger;

/// Numeric id of a logger instance: its index in the [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
pub struct InstanceId(usize);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(InstanceId)
    }
}

/// Append-only arena of logger instances.
///
/// Owned by the application and passed to [`LoggerConfig::start`](crate::LoggerConfig::start).
/// Instances are never removed.
#[derive(Default)]
pub struct Registry {
    loggers: RwLock<Vec<Arc<Logger>>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register a new instance. `make` receives the id the instance will have and must not call
    /// back into the registry.
    pub(crate) fn register_with(&self, make: impl FnOnce(InstanceId) -> Logger) -> Arc<Logger> {
        let mut loggers = self
            .loggers
            .write()
            .expect("thread holding registry lock should not panic");

        let logger = Arc::new(make(InstanceId(loggers.len())));
        loggers.push(Arc::clone(&logger));
        logger
    }

    pub fn get(&self, id: InstanceId) -> Option<Arc<Logger>> {
        let loggers = self
            .loggers
            .read()
            .expect("thread holding registry lock should not panic");

        loggers.get(id.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.loggers
            .read()
            .expect("thread holding registry lock should not panic")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
