//! Pool sizing and restart policies.
//!
//! This module groups the knobs that control **how many** workers run,
//! **whether** an exited worker is replaced, and **how long** to wait first.
//!
//! ## Contents
//! - [`worker_count`] pool size from the host profile (evaluated once)
//! - [`RestartPolicy`] which exits trigger a replacement (never / on-failure / always)
//! - [`BackoffPolicy`] delay before a replacement is forked
//! - [`JitterPolicy`]  randomization so slots that crash together do not re-fork together
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart, restart_backoff, max_restarts, .. }
//!      └─► the cluster event loop uses:
//!           - restart.should_restart(reason) on every worker exit
//!           - max_restarts to abandon a slot
//!           - restart_backoff.delay_for(restart_count) to schedule the re-fork
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Always` (any exit restarts the slot).
//! - `BackoffPolicy::default()` → fixed 1000ms, no jitter.

mod backoff;
mod jitter;
mod restart;
mod sizing;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
pub use sizing::worker_count;
