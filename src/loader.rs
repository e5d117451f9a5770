//! Loading the instrumentation configuration from where the host page points to.
use reqwest::Url;

use crate::{configuration::Configuration, Error, Result};

/// Where a logger's configuration comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationSource {
    /// Configuration already at hand.
    Inline(Configuration),
    /// Location of a JSON document. Locations starting with `http` are absolute; anything else is
    /// relative to the page's base URI.
    Url(String),
}

impl From<Configuration> for ConfigurationSource {
    fn from(configuration: Configuration) -> Self {
        ConfigurationSource::Inline(configuration)
    }
}

/// Resolve a configuration location against the page's base URI.
pub fn resolve_location(location: &str, base_uri: Option<&str>) -> Result<Url> {
    let url = if location.starts_with("http") {
        location.to_owned()
    } else {
        let base = base_uri.ok_or(Error::MissingBaseUri)?;
        let base = base.strip_suffix('/').unwrap_or(base);
        if location.starts_with('/') {
            format!("{base}{location}")
        } else {
            format!("{base}/{location}")
        }
    };

    Url::parse(&url).map_err(Error::InvalidConfigurationUrl)
}

/// Fetches configurations over HTTP.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationFetcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::Client,
}

impl ConfigurationFetcher {
    pub fn new() -> ConfigurationFetcher {
        ConfigurationFetcher::default()
    }

    pub fn with_client(client: reqwest::Client) -> ConfigurationFetcher {
        ConfigurationFetcher { client }
    }

    /// Produce the configuration `source` describes.
    pub async fn load(
        &self,
        source: ConfigurationSource,
        base_uri: Option<&str>,
    ) -> Result<Configuration> {
        match source {
            ConfigurationSource::Inline(configuration) => Ok(configuration),
            ConfigurationSource::Url(location) => {
                let url = resolve_location(&location, base_uri)?;
                self.fetch(url).await
            }
        }
    }

    async fn fetch(&self, url: Url) -> Result<Configuration> {
        log::debug!(target: "frontlog", url:display = url; "fetching logger configuration");
        let response = self.client.get(url).send().await?;

        let response = response.error_for_status().map_err(|err| {
            log::warn!(target: "frontlog", "received non-200 response while fetching configuration: {:?}", err);
            Error::from(err)
        })?;

        let body = response.text().await?;
        let configuration = Configuration::from_json(&body)?;

        log::debug!(target: "frontlog", targets = configuration.targets.len(); "successfully fetched logger configuration");

        Ok(configuration)
    }
}
