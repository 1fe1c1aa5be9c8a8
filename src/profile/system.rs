//! # System profile snapshot.
//!
//! [`SystemProfile`] is taken once at startup and never refreshed. Memory is
//! read through `sysinfo`, the logical CPU count through
//! [`std::thread::available_parallelism`].
//!
//! ## Rules
//! - OS query failure is **fatal**: [`profile`] returns [`ProfileError`] and the
//!   caller aborts startup; there is no retry and no fallback tier.
//! - Byte counts are rounded to the nearest MB.
//! - The tier is always `Tier::classify(total_memory_mb)`.

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::error::ProfileError;
use crate::profile::Tier;

const MIB: u64 = 1024 * 1024;

/// Immutable snapshot of host resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProfile {
    /// Total physical memory (MB).
    #[serde(rename = "totalMemoryMB")]
    pub total_memory_mb: u64,
    /// Memory available for new allocations at profiling time (MB).
    #[serde(rename = "freeMemoryMB")]
    pub free_memory_mb: u64,
    /// Logical CPU count (always `>= 1`).
    pub cpu_count: usize,
    /// Resource tier derived from `total_memory_mb`.
    pub tier: Tier,
}

impl SystemProfile {
    /// Builds a profile from raw figures; the tier is computed, never supplied.
    ///
    /// A `cpu_count` of zero is raised to one.
    pub fn from_parts(total_memory_mb: u64, free_memory_mb: u64, cpu_count: usize) -> Self {
        Self {
            total_memory_mb,
            free_memory_mb,
            cpu_count: cpu_count.max(1),
            tier: Tier::classify(total_memory_mb),
        }
    }

    /// Total memory in (fractional) GB, as used by the worker-count policy.
    #[inline]
    pub fn total_memory_gb(&self) -> f64 {
        self.total_memory_mb as f64 / 1024.0
    }
}

/// Reads host memory and CPU count and classifies the tier.
pub fn profile() -> Result<SystemProfile, ProfileError> {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return Err(ProfileError::MemoryUnavailable);
    }
    let free = sys.available_memory();

    let cpus = std::thread::available_parallelism()
        .map_err(|source| ProfileError::CpuCount { source })?
        .get();

    Ok(SystemProfile::from_parts(
        bytes_to_mb(total),
        bytes_to_mb(free),
        cpus,
    ))
}

fn bytes_to_mb(bytes: u64) -> u64 {
    (bytes + MIB / 2) / MIB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_classifies() {
        let p = SystemProfile::from_parts(8192, 4000, 4);
        assert_eq!(p.tier, Tier::High);
        assert_eq!(p.cpu_count, 4);
        assert_eq!(p.total_memory_gb(), 8.0);
    }

    #[test]
    fn test_zero_cpus_clamped() {
        assert_eq!(SystemProfile::from_parts(1024, 512, 0).cpu_count, 1);
    }

    #[test]
    fn test_bytes_to_mb_rounds() {
        assert_eq!(bytes_to_mb(MIB), 1);
        assert_eq!(bytes_to_mb(MIB + MIB / 2), 2);
        assert_eq!(bytes_to_mb(MIB + MIB / 2 - 1), 1);
        assert_eq!(bytes_to_mb(0), 0);
    }

    #[test]
    fn test_profile_reads_host() {
        let p = profile().expect("host profiling should succeed");
        assert!(p.total_memory_mb > 0);
        assert!(p.cpu_count >= 1);
        assert_eq!(p.tier, Tier::classify(p.total_memory_mb));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(SystemProfile::from_parts(2048, 1024, 2)).unwrap();
        assert_eq!(json["totalMemoryMB"], 2048);
        assert_eq!(json["freeMemoryMB"], 1024);
        assert_eq!(json["cpuCount"], 2);
        assert_eq!(json["tier"], "low");
    }
}
