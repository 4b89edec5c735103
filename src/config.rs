//! Client configuration.

use crate::error::{Error, Result};
use crate::observability::StalePolicy;
use std::str::FromStr;
use std::time::Duration;

/// Default number of retries for reads that fail transiently.
const DEFAULT_READ_RETRIES: u32 = 3;

/// Configuration for the query client and the HTTP repository.
///
/// Override from the environment with [`ClientConfig::from_env`]:
/// `GARDEN_API_URL`, `GARDEN_API_TOKEN`, `GARDEN_API_TIMEOUT_SECS`,
/// `GARDEN_QUERY_RETRIES`, `GARDEN_QUERY_STALE_SECS`, `GARDEN_QUERY_GC_SECS`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://kb.example.com/api/`.
    pub base_url: String,
    /// Static bearer token, when no token provider is installed.
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Retries for transient read failures. Mutations are never retried.
    pub read_retries: u32,
    /// Base delay of the exponential retry backoff.
    pub retry_backoff: Duration,
    pub stale_policy: StalePolicy,
    /// Idle time after which `collect_garbage` evicts an entry.
    pub gc_time: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:3000/api/".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("garden-query/", env!("CARGO_PKG_VERSION")).to_string(),
            read_retries: DEFAULT_READ_RETRIES,
            retry_backoff: Duration::from_millis(100),
            stale_policy: StalePolicy::default(),
            gc_time: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `GARDEN_*` environment variables.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ClientConfig::default();

        if let Some(url) = lookup("GARDEN_API_URL") {
            config.base_url = url;
        }
        if let Some(token) = lookup("GARDEN_API_TOKEN").filter(|t| !t.trim().is_empty()) {
            config.api_token = Some(token.trim().to_string());
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GARDEN_API_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "GARDEN_QUERY_RETRIES")? {
            config.read_retries = retries;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GARDEN_QUERY_STALE_SECS")? {
            config.stale_policy = StalePolicy::Fixed(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GARDEN_QUERY_GC_SECS")? {
            config.gc_time = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::ConfigError(format!("{name} is not a valid number: {raw}"))),
        None => Ok(None),
    }
}
