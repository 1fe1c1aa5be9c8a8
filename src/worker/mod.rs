//! Worker-side runtime.
//!
//! Everything that runs *inside* a forked worker process:
//! - [`Role`] / [`WorkerIdentity`] which process am I, read from the environment;
//! - [`WorkerRuntime`] renders this worker's [`WorkerConfig`] slice;
//! - [`wait_for_shutdown`] the receiving end of the supervisor's control channel;
//! - [`AdmissionGate`] local enforcement of `concurrency.max_concurrent`;
//! - [`ProcessMetrics`] resource usage of the current process.
//!
//! The runtime performs no serving itself; the hosted application reads
//! [`WorkerConfig`] once at startup and sizes its own limits from it.

mod admission;
mod control;
mod identity;
mod metrics;
mod runtime;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use control::{ShutdownCause, wait_for_shutdown, wait_for_shutdown_stdin};
pub use identity::{Role, WORKER_COUNT_VAR, WORKER_ID_VAR, WorkerIdentity};
pub use metrics::ProcessMetrics;
pub use runtime::{
    AdjustedConfig, BASE_PORT_VAR, DEFAULT_BASE_PORT, WorkerConfig, WorkerRuntime, WorkerSlice,
};

pub(crate) use runtime::inherited_base_port;
