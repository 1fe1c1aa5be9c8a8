//! Per-tier lookup tables.

use crate::profile::Tier;
use crate::tuning::{CacheConfig, ConcurrencyConfig, FileHandlingConfig};

const MINUTE_MS: u64 = 60 * 1000;

pub(super) fn cache(tier: Tier) -> CacheConfig {
    let (capacity_mb, lazy_load, cleanup_min, max_entries) = match tier {
        Tier::Minimal => (16, true, 1, 50),
        Tier::Low => (32, true, 2, 100),
        Tier::Medium => (64, false, 5, 200),
        Tier::High => (128, false, 10, 500),
        Tier::Maximum => (256, false, 15, 1000),
    };
    CacheConfig {
        capacity_mb,
        disk_cache_enabled: true,
        lazy_load,
        cleanup_interval_ms: cleanup_min * MINUTE_MS,
        max_entries,
    }
}

/// Base values before the CPU cap is applied.
pub(super) fn concurrency(tier: Tier) -> ConcurrencyConfig {
    let (max_concurrent, queue_size) = match tier {
        Tier::Minimal => (2, 10),
        Tier::Low => (4, 20),
        Tier::Medium => (8, 50),
        Tier::High => (12, 100),
        Tier::Maximum => (16, 200),
    };
    ConcurrencyConfig {
        max_concurrent,
        queue_size,
    }
}

pub(super) fn file_handling(tier: Tier) -> FileHandlingConfig {
    let (max_file_size_mb, max_files, compression_level, thumbnail_quality) = match tier {
        Tier::Minimal => (10, 5, 9, 60),
        Tier::Low => (25, 10, 6, 70),
        Tier::Medium => (50, 20, 4, 80),
        Tier::High => (100, 50, 3, 85),
        Tier::Maximum => (200, 100, 1, 90),
    };
    FileHandlingConfig {
        max_file_size_mb,
        max_files,
        compression_level,
        thumbnail_quality,
    }
}
