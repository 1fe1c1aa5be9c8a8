//! # Worker-local request admission.
//!
//! Each worker enforces its own `concurrency.max_concurrent`; there is no
//! cross-worker semaphore. A request either gets an [`AdmissionPermit`]
//! (released on drop) or is refused with [`AdmissionError::Busy`], which the
//! hosted application turns into a "server busy" answer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AdmissionError;
use crate::worker::WorkerConfig;

/// Back-off suggested to refused clients.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Non-blocking admission limiter. Cheap to clone; clones share permits.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    limit: usize,
    retry_after: Duration,
}

/// Held for the lifetime of one admitted request.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// At most `limit` requests at once (min 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    /// Gate sized from the worker's concurrency slice.
    pub fn for_worker(cfg: &WorkerConfig) -> Self {
        Self::new(cfg.derived().concurrency.max_concurrent)
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Admits a request or refuses immediately; never waits.
    pub fn try_admit(&self) -> Result<AdmissionPermit, AdmissionError> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map(|permit| AdmissionPermit { _permit: permit })
            .map_err(|_| AdmissionError::Busy {
                retry_after: self.retry_after,
            })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Requests currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }
}
