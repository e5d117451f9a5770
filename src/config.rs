use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::runtime::Handle;

use crate::{
    configuration::Configuration,
    host::{CookieSource, Document, VariableLookup, VariableTable, Window},
    loader::{ConfigurationFetcher, ConfigurationSource},
    logger::{Host, Settings},
    transport::{HttpTransport, Transport},
    Error, Logger, Registry, Result,
};

/// Configuration for [`Logger`].
///
/// Only the document is required. Every other collaborator has an inert default: records go out
/// over HTTP, the window and cookie jar are empty, and no variables are exposed.
pub struct LoggerConfig {
    document: Arc<dyn Document>,
    window: Arc<dyn Window>,
    cookies: Arc<dyn CookieSource>,
    variables: Arc<dyn VariableLookup>,
    transport: Arc<dyn Transport>,
    idle_interval: Duration,
    binding_delay: Duration,
    max_binding_retries: Option<u32>,
}

impl LoggerConfig {
    /// Pause of the delivery loop while the queue is empty.
    pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(1000);

    /// Pause between attempts to bind a delayed target.
    pub const DEFAULT_BINDING_DELAY: Duration = Duration::from_millis(100);

    pub fn new(document: Arc<dyn Document>) -> Self {
        LoggerConfig {
            document,
            window: Arc::new(Value::Null),
            cookies: Arc::new(String::new()),
            variables: Arc::new(VariableTable::new()),
            transport: Arc::new(HttpTransport::new()),
            idle_interval: Self::DEFAULT_IDLE_INTERVAL,
            binding_delay: Self::DEFAULT_BINDING_DELAY,
            max_binding_retries: None,
        }
    }

    /// Replace the HTTP transport, e.g. to reuse an existing `reqwest::Client` via
    /// [`HttpTransport::with_client`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn window(mut self, window: impl Window + 'static) -> Self {
        self.window = Arc::new(window);
        self
    }

    pub fn cookies(mut self, cookies: impl CookieSource + 'static) -> Self {
        self.cookies = Arc::new(cookies);
        self
    }

    /// Values resolvable by fields with the `variable` source.
    ///
    /// ```
    /// # use frontlog::{LoggerConfig, VariableTable};
    /// # fn config(config: LoggerConfig) -> LoggerConfig {
    /// config.variables(VariableTable::new().with("page_id", 42))
    /// # }
    /// ```
    pub fn variables(mut self, variables: impl VariableLookup + 'static) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn binding_delay(mut self, delay: Duration) -> Self {
        self.binding_delay = delay;
        self
    }

    /// Give up on a delayed target after this many retries. Retries are unlimited by default.
    pub fn max_binding_retries(mut self, retries: u32) -> Self {
        self.max_binding_retries = Some(retries);
        self
    }

    /// Register a new [`Logger`] in `registry` and start it.
    ///
    /// Must be called from within a tokio runtime; the logger keeps a handle to it for its
    /// background work.
    pub fn start(self, registry: &Arc<Registry>, configuration: Configuration) -> Result<Arc<Logger>> {
        configuration.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let settings = Settings {
            idle_interval: self.idle_interval,
            binding_delay: self.binding_delay,
            max_binding_retries: self.max_binding_retries,
        };
        let host = Host {
            document: self.document,
            window: self.window,
            cookies: self.cookies,
            variables: self.variables,
            transport: self.transport,
        };

        let logger = registry.register_with(|id| {
            Logger::new(
                id,
                configuration,
                Arc::downgrade(registry),
                runtime,
                host,
                settings,
            )
        });

        log::info!(target: "frontlog", instance = usize::from(logger.id()); "starting logger");
        logger.instance.message("configuration loaded");
        logger.initialize();

        Ok(logger)
    }

    /// Like [`LoggerConfig::start`], but resolves the configuration first. Relative locations
    /// are joined onto `base_uri`.
    pub async fn start_from_source(
        self,
        registry: &Arc<Registry>,
        source: ConfigurationSource,
        base_uri: Option<&str>,
    ) -> Result<Arc<Logger>> {
        let configuration = ConfigurationFetcher::new()
            .load(source, base_uri)
            .await
            .inspect_err(|err| {
                log::warn!(target: "frontlog", "failed to load logger configuration: {:?}", err);
            })?;

        self.start(registry, configuration)
    }
}
