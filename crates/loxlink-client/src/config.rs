//! Connection configuration.

use std::time::Duration;

use loxlink_protocol::WS_PATH;
use tokio::time::Instant;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Device host, optionally with a port (`192.168.1.77`, `miniserver:8080`).
    pub host: String,

    /// Interval between keepalive probes.
    pub keepalive_interval: Duration,

    /// How often staleness is checked.
    pub staleness_check_interval: Duration,

    /// Extra time allowed past the keepalive interval before the link is stale.
    pub staleness_grace: Duration,

    /// Capacity of the event channel handed to the caller.
    pub event_capacity: usize,

    /// Capacity of the outgoing message queue.
    pub send_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            keepalive_interval: Duration::from_secs(30),
            staleness_check_interval: Duration::from_secs(5),
            staleness_grace: Duration::from_secs(2),
            event_capacity: 256,
            send_capacity: 64,
        }
    }
}

impl ConnectionConfig {
    /// Creates a new configuration for the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Builder: set keepalive interval.
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Builder: set staleness check interval.
    pub fn with_staleness_check_interval(mut self, interval: Duration) -> Self {
        self.staleness_check_interval = interval;
        self
    }

    /// Builder: set staleness grace period.
    pub fn with_staleness_grace(mut self, grace: Duration) -> Self {
        self.staleness_grace = grace;
        self
    }

    /// Builder: set event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Longest silence after a keepalive acknowledgment before the link is stale.
    pub fn staleness_limit(&self) -> Duration {
        self.keepalive_interval.saturating_add(self.staleness_grace)
    }

    /// Returns the WebSocket endpoint URL for the configured host.
    pub fn ws_url(&self) -> ClientResult<Url> {
        let raw = format!("ws://{}{}", self.host.trim_end_matches('/'), WS_PATH);
        let url = Url::parse(&raw).map_err(|source| ClientError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ClientError::config(format!("missing host in {raw}")));
        }
        Ok(url)
    }

    /// Checks the configuration for values the connection cannot run with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.keepalive_interval.is_zero() {
            return Err(ClientError::config("keepalive interval must be non-zero"));
        }
        if self.staleness_check_interval.is_zero() {
            return Err(ClientError::config(
                "staleness check interval must be non-zero",
            ));
        }
        if self
            .keepalive_interval
            .checked_add(self.staleness_grace)
            .is_none()
        {
            return Err(ClientError::config(
                "keepalive interval plus staleness grace overflows",
            ));
        }
        let now = Instant::now();
        if now.checked_add(self.keepalive_interval).is_none() {
            return Err(ClientError::config("keepalive interval too large"));
        }
        if now.checked_add(self.staleness_check_interval).is_none() {
            return Err(ClientError::config("staleness check interval too large"));
        }
        if self.event_capacity == 0 || self.send_capacity == 0 {
            return Err(ClientError::config("channel capacities must be non-zero"));
        }
        self.ws_url().map(|_| ())
    }
}
