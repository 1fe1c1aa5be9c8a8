//! # Worker pool sizing.
//!
//! | memory          | cpus  | workers            |
//! |-----------------|-------|--------------------|
//! | `>= 16 GB`      | `>= 8`| `min(cpus - 1, 6)` |
//! | `>= 8 GB`       | `>= 4`| `min(cpus - 1, 4)` |
//! | otherwise       |       | `min(cpus, 2)`     |
//!
//! On the two larger rows one CPU is left to the primary. The result is never
//! below one.

use crate::profile::SystemProfile;

/// Computes the fixed worker count for the supervisor's lifetime.
pub fn worker_count(profile: &SystemProfile) -> usize {
    let cpus = profile.cpu_count.max(1);
    let memory_gb = profile.total_memory_gb();

    let n = if memory_gb >= 16.0 && cpus >= 8 {
        (cpus - 1).min(6)
    } else if memory_gb >= 8.0 && cpus >= 4 {
        (cpus - 1).min(4)
    } else {
        cpus.min(2)
    };
    n.max(1)
}
