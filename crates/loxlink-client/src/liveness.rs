//! Keepalive bookkeeping and staleness detection.
//!
//! The connection sends a `keepalive` probe on a fixed interval and the
//! device answers with a header carrying identifier 6. The link counts as
//! stale once no acknowledgment has been seen for longer than the keepalive
//! interval plus a grace period. Staleness is only judged after the first
//! acknowledgment.
//!
//! Time is passed in, so the policy is tested without a clock.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks probe and acknowledgment instants for one connection.
#[derive(Debug, Clone)]
pub struct KeepaliveMonitor {
    limit: Duration,
    last_probe: Option<Instant>,
    last_ack: Option<Instant>,
}

impl KeepaliveMonitor {
    /// Creates a monitor that declares the link stale after `limit` without an ack.
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            last_probe: None,
            last_ack: None,
        }
    }

    /// Records that a probe was sent.
    pub fn record_probe(&mut self, now: Instant) {
        self.last_probe = Some(now);
    }

    /// Records an acknowledgment and returns the round-trip latency.
    ///
    /// The latency is measured from the most recent probe; it is zero when
    /// no probe has been sent yet.
    pub fn record_ack(&mut self, now: Instant) -> Duration {
        self.last_ack = Some(now);
        self.last_probe
            .map(|sent| now.saturating_duration_since(sent))
            .unwrap_or_default()
    }

    /// Time since the last acknowledgment, if any was seen.
    pub fn since_ack(&self, now: Instant) -> Option<Duration> {
        self.last_ack.map(|ack| now.saturating_duration_since(ack))
    }

    /// Returns true if an ack was seen and the silence since exceeds the limit.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.since_ack(now).is_some_and(|silence| silence > self.limit)
    }

    /// Forgets all recorded instants.
    pub fn reset(&mut self) {
        self.last_probe = None;
        self.last_ack = None;
    }

    /// Instant of the last probe.
    pub fn last_probe(&self) -> Option<Instant> {
        self.last_probe
    }

    /// Instant of the last acknowledgment.
    pub fn last_ack(&self) -> Option<Instant> {
        self.last_ack
    }
}
