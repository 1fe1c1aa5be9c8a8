//! # Load balancer constants.
//!
//! Advisory settings for whatever fronts the worker ports. The supervisor
//! does not balance traffic itself; these values are exported so the
//! front-end and the workers agree on health-check cadence and breaker limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request distribution strategy across worker ports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    LeastConnections,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    /// Consecutive failures before a worker is taken out of rotation.
    pub max_failures: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    /// Failures that open the breaker.
    pub threshold: u32,
    pub timeout_ms: u64,
    pub reset_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfig {
    pub strategy: Strategy,
    pub health_check: HealthCheckConfig,
    pub sticky_sessions: bool,
    pub retry_attempts: u32,
    pub circuit: CircuitBreakerConfig,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::RoundRobin,
            health_check: HealthCheckConfig {
                enabled: true,
                interval_ms: 30_000,
                timeout_ms: 5_000,
                max_failures: 3,
            },
            sticky_sessions: true,
            retry_attempts: 3,
            circuit: CircuitBreakerConfig {
                enabled: true,
                threshold: 10,
                timeout_ms: 60_000,
                reset_timeout_ms: 30_000,
            },
        }
    }
}

impl HealthCheckConfig {
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
