//! Host resource profiling.
//!
//! This module turns raw host numbers into a [`SystemProfile`]:
//! - [`Tier`] discrete resource class derived from total memory;
//! - [`SystemProfile`] immutable snapshot taken once at startup;
//! - [`profile`] reads memory (via `sysinfo`) and logical CPU count from the OS.
//!
//! ## Quick wiring
//! ```text
//! profile() ──► SystemProfile { total, free, cpus, tier }
//!                    ├─► tuning::derive()          (DerivedConfig)
//!                    └─► policies::worker_count()  (pool size)
//! ```

mod system;
mod tier;

pub use system::{SystemProfile, profile};
pub use tier::Tier;
