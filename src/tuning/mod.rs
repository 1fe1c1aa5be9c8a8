//! Tiered runtime configuration.
//!
//! [`derive`] maps a [`SystemProfile`](crate::SystemProfile) to a
//! [`DerivedConfig`]: four independently tiered sub-configs plus a copy of the
//! profile. The mapping is pure; identical profiles always produce identical
//! configs (and identical JSON).
//!
//! ## Contents
//! - [`CacheConfig`] in-memory cache sizing and cleanup cadence
//! - [`ConcurrencyConfig`] admission limits, capped at `cpu_count * 2`
//! - [`FileHandlingConfig`] upload limits, compression and thumbnail quality
//! - [`NetworkConfig`] tier-independent HTTP timeouts and limits
//! - [`LoadBalancerConfig`] advisory front-end balancing constants
//!
//! The values are advisory: each worker applies them to its own local limits.
//! Nothing here is shared across workers at runtime.

mod balancer;
mod derived;
mod tables;

pub use balancer::{CircuitBreakerConfig, HealthCheckConfig, LoadBalancerConfig, Strategy};
pub use derived::{
    CacheConfig, ConcurrencyConfig, DerivedConfig, FileHandlingConfig, NetworkConfig,
};

use crate::profile::SystemProfile;

/// Derives the full runtime configuration for a host.
pub fn derive(profile: &SystemProfile) -> DerivedConfig {
    let tier = profile.tier;

    let mut concurrency = tables::concurrency(tier);
    let cpu_cap = profile.cpu_count.saturating_mul(2);
    concurrency.max_concurrent = concurrency.max_concurrent.min(cpu_cap);

    DerivedConfig {
        cache: tables::cache(tier),
        concurrency,
        file_handling: tables::file_handling(tier),
        network: NetworkConfig::default(),
        system: *profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Tier;

    #[test]
    fn test_derive_is_deterministic() {
        let p = SystemProfile::from_parts(6000, 3000, 6);
        let a = derive(&p);
        let b = derive(&p);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn test_concurrency_capped_by_cpus() {
        let p = SystemProfile::from_parts(16 * 1024, 8000, 4);
        assert_eq!(p.tier, Tier::Maximum);
        let cfg = derive(&p);
        assert_eq!(cfg.concurrency.max_concurrent, 8);
        assert_eq!(cfg.concurrency.queue_size, 200);
    }

    #[test]
    fn test_concurrency_cap_holds_for_every_tier() {
        let memory = [512, 1536, 3072, 6144, 32 * 1024];
        for total in memory {
            for cpus in 1..=12 {
                let cfg = derive(&SystemProfile::from_parts(total, 0, cpus));
                assert!(
                    cfg.concurrency.max_concurrent <= cpus * 2,
                    "tier {} cpus {cpus}: {}",
                    cfg.system.tier,
                    cfg.concurrency.max_concurrent
                );
            }
        }
    }

    #[test]
    fn test_base_value_kept_when_below_cap() {
        let cfg = derive(&SystemProfile::from_parts(1024, 512, 8));
        assert_eq!(cfg.concurrency.max_concurrent, 2);
    }

    #[test]
    fn test_system_copy() {
        let p = SystemProfile::from_parts(3000, 1200, 3);
        let cfg = derive(&p);
        assert_eq!(cfg.system, p);
        assert_eq!(cfg.cache.capacity_mb, 64);
    }

    #[test]
    fn test_network_is_tier_independent() {
        let small = derive(&SystemProfile::from_parts(512, 0, 1));
        let large = derive(&SystemProfile::from_parts(64 * 1024, 0, 32));
        assert_eq!(small.network, large.network);
    }

    #[test]
    fn test_contract_field_names() {
        let cfg = derive(&SystemProfile::from_parts(2048, 1024, 2));
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["cache"]["capacityMB"], 32);
        assert_eq!(json["cache"]["lazyLoad"], true);
        assert_eq!(json["concurrency"]["maxConcurrent"], 4);
        assert_eq!(json["fileHandling"]["compressionLevel"], 6);
        assert_eq!(json["network"]["keepAliveTimeoutMs"], 65_000);
        assert_eq!(json["system"]["tier"], "low");
    }
}
