use std::sync::Arc;

/// Result type used by fallible `frontlog` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while loading a configuration or starting a [`Logger`](crate::Logger).
///
/// A running logger never returns errors: failures that happen while binding, collecting or
/// forwarding are written to the instance log and the affected item is skipped.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The logger was started outside of a tokio runtime.
    #[error("no tokio runtime available, start the logger from within a runtime")]
    NoRuntime,

    /// Two targets share the same name.
    #[error("duplicate target name {0:?}")]
    DuplicateTarget(String),

    /// Target dependency lists form a cycle. Holds the names along the cycle.
    #[error("dependency cycle between targets: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// Configuration is not valid JSON or does not match the expected shape.
    #[error("error parsing configuration")]
    ConfigurationParse(#[source] Arc<serde_json::Error>),

    /// Configuration location cannot be parsed as URL.
    #[error("invalid configuration url")]
    InvalidConfigurationUrl(#[source] url::ParseError),

    /// A relative configuration path was given without a base URI to resolve it against.
    #[error("relative configuration path requires a base uri")]
    MissingBaseUri,

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::ConfigurationParse(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
