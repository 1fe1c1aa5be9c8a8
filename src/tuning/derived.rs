//! # Derived configuration types.
//!
//! Plain data, serialized in camelCase for the worker bootstrap contract.
//! Durations are stored as milliseconds; use the accessors to get a
//! [`Duration`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::SystemProfile;

/// Full tiered configuration for one host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedConfig {
    pub cache: CacheConfig,
    pub concurrency: ConcurrencyConfig,
    pub file_handling: FileHandlingConfig,
    pub network: NetworkConfig,
    /// Copy of the profile this config was derived from.
    pub system: SystemProfile,
}

/// In-memory cache sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache capacity (MB). Host-wide in [`DerivedConfig`], per worker in a
    /// [`WorkerConfig`](crate::WorkerConfig).
    #[serde(rename = "capacityMB")]
    pub capacity_mb: u64,
    pub disk_cache_enabled: bool,
    /// Load entries on first access instead of eagerly (weak tiers only).
    pub lazy_load: bool,
    pub cleanup_interval_ms: u64,
    pub max_entries: usize,
}

impl CacheConfig {
    #[inline]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

/// Request admission limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyConfig {
    /// Requests served at once; never above `cpu_count * 2`.
    pub max_concurrent: usize,
    pub queue_size: usize,
}

/// Upload and media processing limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandlingConfig {
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: u64,
    pub max_files: usize,
    /// 1 (fastest) ..= 9 (smallest). Weaker hosts compress harder.
    pub compression_level: u8,
    pub thumbnail_quality: u8,
}

/// HTTP server limits shared by every tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub keep_alive_timeout_ms: u64,
    pub headers_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Bytes.
    pub max_header_size: usize,
    pub connection_limit: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout_ms: 65_000,
            headers_timeout_ms: 66_000,
            request_timeout_ms: 30_000,
            max_header_size: 16 * 1024,
            connection_limit: 1000,
        }
    }
}

impl NetworkConfig {
    #[inline]
    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }

    #[inline]
    pub fn headers_timeout(&self) -> Duration {
        Duration::from_millis(self.headers_timeout_ms)
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
