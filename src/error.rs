//! Error types used by the clustervisor runtime.
//!
//! - [`RuntimeError`] errors raised by the supervisor itself.
//! - [`ProfileError`] host profiling failures (fatal at startup).
//! - [`SpawnError`] a worker process could not be created.
//! - [`IdentityError`] a worker was started with a missing or bad identity.
//! - [`AdmissionError`] a worker-local request admission was refused.
//!
//! Every type provides `as_label()` returning a short stable snake_case label for
//! logs and metrics.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Host profiling failed; startup is aborted.
    #[error("host profiling failed: {0}")]
    Profile(#[from] ProfileError),

    /// A worker could not be forked during startup.
    #[error("failed to fork worker for slot {slot}: {source}")]
    Spawn {
        /// Slot index that failed.
        slot: usize,
        #[source]
        source: SpawnError,
    },

    /// Worker identity could not be resolved.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Shutdown timeout elapsed; remaining workers were force-killed.
    #[error("shutdown timeout {timeout:?} exceeded; stuck slots: {stuck:?}; forcing termination")]
    ShutdownTimeout {
        /// The configured timeout.
        timeout: Duration,
        /// Slot indices whose workers had not terminated.
        stuck: Vec<usize>,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to listen for termination signals: {source}")]
    Signal {
        #[source]
        source: std::io::Error,
    },

    /// The supervisor event loop is no longer running.
    #[error("supervisor is not running")]
    Closed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use clustervisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::ShutdownTimeout { timeout: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_shutdown_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Profile(_) => "runtime_profile_failed",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
            RuntimeError::Identity(_) => "runtime_bad_identity",
            RuntimeError::ShutdownTimeout { .. } => "runtime_shutdown_timeout",
            RuntimeError::Signal { .. } => "runtime_signal_failed",
            RuntimeError::Closed => "runtime_closed",
        }
    }
}

/// # Host profiling failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The OS reported zero total memory.
    #[error("total memory is unavailable")]
    MemoryUnavailable,

    /// The logical CPU count could not be read.
    #[error("cpu count is unavailable: {source}")]
    CpuCount {
        #[source]
        source: std::io::Error,
    },
}

impl ProfileError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ProfileError::MemoryUnavailable => "profile_memory_unavailable",
            ProfileError::CpuCount { .. } => "profile_cpu_unavailable",
        }
    }
}

/// # Worker process creation failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The OS refused to start the process.
    #[error("spawn failed: {0}")]
    Io(#[from] std::io::Error),

    /// The spawner declined the request.
    #[error("spawn rejected: {reason}")]
    Rejected { reason: String },
}

impl SpawnError {
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::Io(_) => "spawn_io",
            SpawnError::Rejected { .. } => "spawn_rejected",
        }
    }
}

/// # Worker identity errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A required environment variable is not set.
    #[error("{var} is not set")]
    Missing { var: &'static str },

    /// A variable is set but is not a non-negative integer.
    #[error("{var}={value:?} is not a valid integer")]
    Invalid { var: &'static str, value: String },

    /// `worker_count` must be positive.
    #[error("worker count must be greater than zero")]
    ZeroWorkers,

    /// `worker_id` must lie in `[0, worker_count)`.
    #[error("worker id {worker_id} out of range for {worker_count} workers")]
    OutOfRange {
        worker_id: usize,
        worker_count: usize,
    },
}

impl IdentityError {
    pub fn as_label(&self) -> &'static str {
        match self {
            IdentityError::Missing { .. } => "identity_missing",
            IdentityError::Invalid { .. } => "identity_invalid",
            IdentityError::ZeroWorkers => "identity_zero_workers",
            IdentityError::OutOfRange { .. } => "identity_out_of_range",
        }
    }
}

/// # Worker-local admission errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// All permits are in use; the caller should answer "busy".
    #[error("server busy, retry after {retry_after:?}")]
    Busy { retry_after: Duration },
}

impl AdmissionError {
    pub fn as_label(&self) -> &'static str {
        match self {
            AdmissionError::Busy { .. } => "admission_busy",
        }
    }

    /// Suggested client back-off.
    pub fn retry_after(&self) -> Duration {
        match self {
            AdmissionError::Busy { retry_after } => *retry_after,
        }
    }
}
