//! Deserializable client configuration.
//!
//! [`ClientConfig`] is the plain-data form of everything [`ClientBuilder`] accepts, so that
//! applications can keep connection settings in a JSON document or assemble them from their
//! own configuration layer. Explicit agents and connectors are objects, not data, and are only
//! available through the builder.

use crate::agent::AgentOptions;
use crate::client::ClientBuilder;
use crate::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// One endpoint or an ordered list of endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UrlSetting {
    One(String),
    Many(Vec<String>),
}

/// Client settings.
///
/// ```
/// use c8_client::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(r#"{
///     "url": ["https://eu.example.com", "https://us.example.com"],
///     "api_key": "demo.key",
///     "c8_version": 30400,
///     "headers": {"x-request-source": "billing"},
///     "agent_options": {"max_idle_per_host": 8}
/// }"#).unwrap();
///
/// let client = config.into_builder().unwrap().build().unwrap();
/// assert_eq!(client.hosts().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint(s); the loopback endpoint when absent.
    pub url: Option<UrlSetting>,
    /// API key sent as `authorization: apikey <key>`.
    pub api_key: Option<String>,
    /// Bearer token; ignored when an API key is set.
    pub token: Option<String>,
    /// Protocol version sent as `x-c8-version`.
    pub c8_version: Option<u32>,
    /// Fabric selected for fabric-scoped paths; `_system` when absent.
    pub fabric: Option<String>,
    /// Tenant prefix for fabric-scoped paths.
    pub tenant: Option<String>,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Options for the pool's agents.
    pub agent_options: AgentOptions,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Upper bound on failover hops per request.
    pub max_failovers: Option<usize>,
}

impl ClientConfig {
    /// Converts the settings into a builder.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL or header is invalid.
    pub fn into_builder(self) -> Result<ClientBuilder> {
        ClientBuilder::from_config(self)
    }
}

impl ClientBuilder {
    /// Creates a builder pre-populated from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL or header is invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new().agent_options(config.agent_options);

        builder = match config.url {
            Some(UrlSetting::One(url)) => builder.url(url)?,
            Some(UrlSetting::Many(urls)) => builder.urls(urls)?,
            None => builder,
        };
        if let Some(token) = config.token {
            builder = builder.bearer_token(token);
        }
        if let Some(key) = config.api_key {
            builder = builder.api_key(key);
        }
        if let Some(version) = config.c8_version {
            builder = builder.c8_version(version);
        }
        if let Some(fabric) = config.fabric {
            builder = builder.fabric(fabric);
        }
        if let Some(tenant) = config.tenant {
            builder = builder.tenant(tenant);
        }
        if let Some(max) = config.max_failovers {
            builder = builder.max_failovers(max);
        }
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        for (name, value) in &config.headers {
            builder = builder.default_header(name, value)?;
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_accepts_string_or_list() {
        let one: ClientConfig = serde_json::from_str(r#"{"url": "https://a.example.com"}"#).unwrap();
        assert_eq!(one.url, Some(UrlSetting::One("https://a.example.com".into())));

        let many: ClientConfig =
            serde_json::from_str(r#"{"url": ["https://a.example.com", "https://b.example.com"]}"#)
                .unwrap();
        assert!(matches!(many.url, Some(UrlSetting::Many(ref urls)) if urls.len() == 2));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());

        let client = config.into_builder().unwrap().build().unwrap();
        assert_eq!(client.hosts().active().to_string(), "http://localhost:8529");
        assert_eq!(client.fabric(), "_system");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = ClientConfig::default();
        config.headers.insert("bad header".into(), "1".into());
        assert!(config.into_builder().is_err());
    }

    #[test]
    fn test_api_key_wins_over_token() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_key": "k", "token": "t", "c8_version": 1}"#).unwrap();
        let client = config.into_builder().unwrap().build().unwrap();
        let headers = client.default_headers();
        assert_eq!(headers["authorization"], "apikey k");
        assert_eq!(headers["x-c8-version"], "1");
    }
}
