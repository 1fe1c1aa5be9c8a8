//! Supervisor core: configuration, cluster state and the event loop.
//!
//! The public API from this module is [`ClusterSupervisor`] (builder and
//! start), [`ClusterHandle`] (control of a running pool) and the state types
//! returned by its queries.
//!
//! Internal modules:
//! - [`cluster`]: the event loop owning all cluster state;
//! - [`state`]: records, slots, stats and snapshots;
//! - [`handle`]: command channel front-end and OS signal wait;
//! - [`supervisor`]: builder and role branching.

mod cluster;
mod config;
mod handle;
mod state;
mod supervisor;

pub use config::SupervisorConfig;
pub use handle::ClusterHandle;
pub use state::{ClusterSnapshot, ClusterStats, SlotSnapshot, SlotState};
pub use supervisor::{ClusterSupervisor, Launch};
