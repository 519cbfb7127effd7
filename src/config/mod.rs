use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BEACON_RELAY_ENDPOINT is required but not set")]
    EndpointMissing,

    #[error("BEACON_RELAY_ENDPOINT is not a valid URL: {0}")]
    EndpointInvalidUrl(String),

    #[error("BEACON_RELAY_TRACKING_ID is required but not set")]
    TrackingIdMissing,

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),

    #[error("{0} must be greater than zero")]
    ZeroNotAllowed(String),

    #[error("BEACON_RELAY_ANONYMIZE_IP has invalid value: {0} (expected \"true\" or \"false\")")]
    InvalidAnonymizeIp(String),
}

/// Runtime configuration for the tracker and its dispatcher.
///
/// `flush_interval`, `drain_cap` and `page_size` are validated non-zero by
/// the parser; constructing the struct directly must uphold the same.
#[derive(Debug, Clone)]
pub struct Config {
    /// Collection endpoint hits are POSTed to.
    pub endpoint: Url,
    /// Property identifier stamped into every hit (`tid`).
    pub tracking_id: String,
    /// Time between dispatcher ticks.
    pub flush_interval: Duration,
    /// Maximum records drained from the queue in one tick.
    pub drain_cap: usize,
    /// Records delivered concurrently per sub-batch.
    pub page_size: usize,
    /// Per-request timeout on the delivery transport.
    pub send_timeout: Duration,
    /// Ask the endpoint to anonymize the sender IP (`aip=1`).
    pub anonymize_ip: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with("BEACON_RELAY_"))
            .collect();
        Self::parse(&vars)
    }

    fn parse(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint(vars)?;
        let tracking_id = parse_tracking_id(vars)?;
        let flush_interval = parse_duration_ms(vars, "BEACON_RELAY_FLUSH_INTERVAL_MS", 60_000)?;
        let drain_cap = parse_count(vars, "BEACON_RELAY_DRAIN_CAP", 20_000)?;
        let page_size = parse_count(vars, "BEACON_RELAY_PAGE_SIZE", 1_000)?;
        let send_timeout = parse_duration_ms(vars, "BEACON_RELAY_SEND_TIMEOUT_MS", 5_000)?;
        let anonymize_ip = parse_anonymize_ip(vars)?;

        Ok(Self {
            endpoint,
            tracking_id,
            flush_interval,
            drain_cap,
            page_size,
            send_timeout,
            anonymize_ip,
        })
    }
}

fn parse_endpoint(vars: &HashMap<String, String>) -> Result<Url, ConfigError> {
    let raw = vars
        .get("BEACON_RELAY_ENDPOINT")
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::EndpointMissing)?;

    Url::parse(raw).map_err(|_| ConfigError::EndpointInvalidUrl(raw.clone()))
}

fn parse_tracking_id(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    vars.get("BEACON_RELAY_TRACKING_ID")
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .ok_or(ConfigError::TrackingIdMissing)
}

fn parse_count(
    vars: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match vars.get(name) {
        Some(val) => {
            let count: usize = val
                .parse()
                .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone()))?;
            if count == 0 {
                return Err(ConfigError::ZeroNotAllowed(name.to_owned()));
            }
            Ok(count)
        }
        None => Ok(default),
    }
}

fn parse_duration_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    match vars.get(name) {
        Some(val) => {
            let ms: u64 = val
                .parse()
                .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone()))?;
            if ms == 0 {
                return Err(ConfigError::ZeroNotAllowed(name.to_owned()));
            }
            Ok(Duration::from_millis(ms))
        }
        None => Ok(Duration::from_millis(default_ms)),
    }
}

fn parse_anonymize_ip(vars: &HashMap<String, String>) -> Result<bool, ConfigError> {
    match vars
        .get("BEACON_RELAY_ANONYMIZE_IP")
        .map(|s| s.as_str())
    {
        Some("true") | Some("1") | None => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidAnonymizeIp(other.to_owned())),
    }
}
