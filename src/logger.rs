use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use tokio::{runtime::Handle, task::AbortHandle};

use crate::{
    configuration::Configuration,
    extractor::Extractor,
    host::{CookieSource, Document, VariableLookup, Window},
    instance::Instance,
    registry::{InstanceId, Registry},
    transport::Transport,
};

/// A running logger session.
///
/// Created by [`LoggerConfig::start`](crate::LoggerConfig::start), which binds the configured
/// targets and starts the delivery loop. The logger lives in its [`Registry`] until the registry
/// is dropped.
pub struct Logger {
    pub(crate) instance: Instance,
    pub(crate) registry: Weak<Registry>,
    pub(crate) runtime: Handle,
    pub(crate) document: Arc<dyn Document>,
    pub(crate) window: Arc<dyn Window>,
    pub(crate) cookies: Arc<dyn CookieSource>,
    pub(crate) variables: Arc<dyn VariableLookup>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) settings: Settings,
    tasks: Mutex<Tasks>,
}

/// Timings and limits taken from [`LoggerConfig`](crate::LoggerConfig).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub idle_interval: Duration,
    pub binding_delay: Duration,
    pub max_binding_retries: Option<u32>,
}

/// Background work owned by a logger.
#[derive(Default)]
pub(crate) struct Tasks {
    pub dispatcher: Option<AbortHandle>,
    /// Pending retry chain per target index.
    pub bindings: HashMap<usize, AbortHandle>,
    /// Set by shutdown. No background work is started afterwards.
    pub stopped: bool,
}

/// Collaborators handed over by the builder.
pub(crate) struct Host {
    pub document: Arc<dyn Document>,
    pub window: Arc<dyn Window>,
    pub cookies: Arc<dyn CookieSource>,
    pub variables: Arc<dyn VariableLookup>,
    pub transport: Arc<dyn Transport>,
}

impl Logger {
    pub(crate) fn new(
        id: InstanceId,
        configuration: Configuration,
        registry: Weak<Registry>,
        runtime: Handle,
        host: Host,
        settings: Settings,
    ) -> Logger {
        Logger {
            instance: Instance::new(id, configuration),
            registry,
            runtime,
            document: host.document,
            window: host.window,
            cookies: host.cookies,
            variables: host.variables,
            transport: host.transport,
            settings,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    pub(crate) fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks
            .lock()
            .expect("thread holding tasks lock should not panic")
    }

    pub(crate) fn extractor(&self) -> Extractor<'_> {
        Extractor {
            document: &*self.document,
            window: &*self.window,
            cookies: &*self.cookies,
            variables: &*self.variables,
        }
    }

    /// Bring a freshly registered logger to life: apply the debug flag, bind targets and start
    /// the delivery loop.
    pub(crate) fn initialize(self: &Arc<Self>) {
        let configuration = self.instance.configuration();
        if configuration.debug.enabled {
            self.enable_debug();
        }

        for (target, dependency) in configuration.unknown_dependencies() {
            self.instance.message(format!(
                "target \"{target}\" depends on unknown target \"{dependency}\""
            ));
        }

        self.instance.message("start binding events to given targets");
        self.bind_events();
        self.spawn_dispatcher();
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    /// Lines logged by this instance so far.
    pub fn log(&self) -> Vec<String> {
        self.instance.log()
    }

    pub fn is_debug(&self) -> bool {
        self.instance.is_debug()
    }

    /// Emit instance messages at `info` level from now on. Messages logged before are replayed.
    pub fn enable_debug(&self) {
        self.instance.enable_debug();
    }

    /// Snapshot of the configuration, including current `bound` flags.
    pub fn configuration(&self) -> Configuration {
        self.instance.configuration()
    }

    /// Whether the target called `name` has a listener attached. `None` for unknown names.
    pub fn is_bound(&self, name: &str) -> Option<bool> {
        self.instance.target_by_name(name).map(|target| target.bound)
    }

    /// Number of events waiting for delivery.
    pub fn queue_len(&self) -> usize {
        self.instance.queue_len()
    }

    /// Stop admitting new events. Events already queued are still delivered.
    pub fn lock_queue(&self) {
        self.instance.lock_queue();
        log::debug!(target: "frontlog", instance = usize::from(self.id()); "event queue locked");
    }

    pub fn is_queue_locked(&self) -> bool {
        self.instance.is_queue_locked()
    }

    /// Lock the queue and stop all background work: the delivery loop and pending binding
    /// retries. Listeners stay attached, but delayed targets they would bind are no longer
    /// retried. Queued events are not delivered after this.
    pub fn shutdown(&self) {
        self.instance.lock_queue();

        let mut tasks = self.tasks();
        tasks.stopped = true;
        if let Some(dispatcher) = tasks.dispatcher.take() {
            dispatcher.abort();
        }
        for (_, retry) in tasks.bindings.drain() {
            retry.abort();
        }
        drop(tasks);

        log::debug!(target: "frontlog", instance = usize::from(self.id()); "logger shut down");
    }
}
