//! # Worker configuration slice.
//!
//! [`WorkerRuntime::start`] merges the host-wide [`DerivedConfig`] with the
//! worker's share:
//! - `max_memory_mb = floor(total_memory_mb * 0.8 / worker_count)`
//! - `port = base_port + worker_id`
//! - `cache.capacity_mb = floor(host cache capacity / worker_count)`
//!
//! The result is computed once and never mutated. A forked worker takes
//! `base_port` from `CLUSTERVISOR_BASE_PORT`, set by the primary's spawner.

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::tuning::DerivedConfig;
use crate::worker::WorkerIdentity;

/// Port of worker 0.
pub const DEFAULT_BASE_PORT: u16 = 8000;

/// Environment variable carrying the primary's base port to its workers.
pub const BASE_PORT_VAR: &str = "CLUSTERVISOR_BASE_PORT";

/// Share of host memory split across workers, as `NUM / DEN` (80%).
const MEMORY_SHARE_NUM: u64 = 4;
const MEMORY_SHARE_DEN: u64 = 5;

/// Per-worker figures added to the derived config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSlice {
    pub id: usize,
    #[serde(rename = "maxMemoryMB")]
    pub max_memory_mb: u64,
    pub port: u16,
}

/// Derived config as seen by one worker: cache capacity already divided,
/// plus the [`WorkerSlice`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedConfig {
    #[serde(flatten)]
    pub base: DerivedConfig,
    pub worker: WorkerSlice,
}

/// Bootstrap contract handed to the hosted application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    pub worker_id: usize,
    pub worker_count: usize,
    pub is_cluster_mode: bool,
    pub adjusted_config: AdjustedConfig,
}

impl WorkerConfig {
    /// Renders the slice for `identity`.
    pub fn render(derived: &DerivedConfig, identity: WorkerIdentity, base_port: u16) -> Self {
        let count = identity.worker_count() as u64;
        let id = identity.worker_id();

        let max_memory_mb =
            derived.system.total_memory_mb * MEMORY_SHARE_NUM / (MEMORY_SHARE_DEN * count);
        let port = u16::try_from(id)
            .map(|offset| base_port.saturating_add(offset))
            .unwrap_or(u16::MAX);

        let mut base = derived.clone();
        base.cache.capacity_mb = derived.cache.capacity_mb / count;

        Self {
            worker_id: id,
            worker_count: identity.worker_count(),
            is_cluster_mode: true,
            adjusted_config: AdjustedConfig {
                base,
                worker: WorkerSlice {
                    id,
                    max_memory_mb,
                    port,
                },
            },
        }
    }

    #[inline]
    pub fn max_memory_mb(&self) -> u64 {
        self.adjusted_config.worker.max_memory_mb
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.adjusted_config.worker.port
    }

    #[inline]
    pub fn cache_share_mb(&self) -> u64 {
        self.adjusted_config.base.cache.capacity_mb
    }

    /// The shared derived config, with this worker's cache share.
    #[inline]
    pub fn derived(&self) -> &DerivedConfig {
        &self.adjusted_config.base
    }
}

/// Base port inherited from the primary through `lookup`; `None` when unset.
pub(crate) fn inherited_base_port<F>(lookup: F) -> Result<Option<u16>, IdentityError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(BASE_PORT_VAR) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| IdentityError::Invalid {
            var: BASE_PORT_VAR,
            value,
        })
}

/// Per-worker bootstrap.
#[derive(Clone, Debug)]
pub struct WorkerRuntime {
    identity: WorkerIdentity,
    derived: DerivedConfig,
    base_port: u16,
}

impl WorkerRuntime {
    pub fn new(derived: DerivedConfig, identity: WorkerIdentity) -> Self {
        Self {
            identity,
            derived,
            base_port: DEFAULT_BASE_PORT,
        }
    }

    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    pub fn identity(&self) -> WorkerIdentity {
        self.identity
    }

    /// Computes this worker's configuration.
    pub fn start(&self) -> WorkerConfig {
        WorkerConfig::render(&self.derived, self.identity, self.base_port)
    }
}
