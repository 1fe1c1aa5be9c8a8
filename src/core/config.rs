//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] holds every knob of the cluster supervisor. The
//! host-derived numbers (worker count, tier tables) are not configured here;
//! they come from the profile.
//!
//! ## Sentinel values
//! - `stats_interval = 0s` → periodic stats disabled
//! - `shutdown_timeout = None` → cooperative shutdown, waits forever

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::worker::DEFAULT_BASE_PORT;

/// Configuration for the cluster supervisor.
///
/// ## Field semantics
/// - `max_restarts`: restarts allowed per slot; the next crash abandons the slot
/// - `restart_backoff`: delay before a replacement is forked
/// - `restart`: which exits are restarted at all
/// - `stats_interval`: period of `StatsReported` events (`0s` = never)
/// - `shutdown_timeout`: bound on graceful shutdown (`None` = unbounded)
/// - `base_port`: port of worker 0; worker `i` gets `base_port + i`
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Restart budget per slot.
    ///
    /// Crash number `max_restarts + 1` of a slot marks it `Abandoned`.
    /// The counter is never reset, not even after long healthy uptime.
    pub max_restarts: u32,

    pub restart_backoff: BackoffPolicy,

    pub restart: RestartPolicy,

    pub stats_interval: Duration,

    /// Maximum wait for workers to exit after `shutdown` was sent.
    ///
    /// On expiry the remaining workers are killed and shutdown resolves with
    /// `RuntimeError::ShutdownTimeout`.
    pub shutdown_timeout: Option<Duration>,

    pub base_port: u16,

    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Stats period, `None` when disabled.
    #[inline]
    pub fn stats_interval(&self) -> Option<Duration> {
        if self.stats_interval == Duration::ZERO {
            None
        } else {
            Some(self.stats_interval)
        }
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `max_restarts = 5`
    /// - `restart_backoff = fixed 1000ms`
    /// - `restart = RestartPolicy::Always`
    /// - `stats_interval = 60s`
    /// - `shutdown_timeout = Some(30s)`
    /// - `base_port = 8000`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_restarts: 5,
            restart_backoff: BackoffPolicy::default(),
            restart: RestartPolicy::default(),
            stats_interval: Duration::from_secs(60),
            shutdown_timeout: Some(Duration::from_secs(30)),
            base_port: DEFAULT_BASE_PORT,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.max_restarts, 5);
        assert_eq!(cfg.restart_backoff.delay_for(1), Duration::from_millis(1000));
        assert_eq!(cfg.restart, RestartPolicy::Always);
        assert_eq!(cfg.stats_interval(), Some(Duration::from_secs(60)));
        assert_eq!(cfg.shutdown_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.base_port, 8000);
    }

    #[test]
    fn test_sentinels() {
        let cfg = SupervisorConfig {
            stats_interval: Duration::ZERO,
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.stats_interval(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
