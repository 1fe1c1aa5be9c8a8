//! # Worker identity and process role.
//!
//! A worker learns who it is from two environment variables set by the
//! supervisor at fork time:
//! - `WORKER_ID`    slot index, `0 <= id < count`
//! - `WORKER_COUNT` pool size, `> 0`
//!
//! A process without `WORKER_ID` is the primary.

use crate::error::IdentityError;

pub const WORKER_ID_VAR: &str = "WORKER_ID";
pub const WORKER_COUNT_VAR: &str = "WORKER_COUNT";

/// Slot identity of one worker process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerIdentity {
    worker_id: usize,
    worker_count: usize,
}

impl WorkerIdentity {
    /// Validates and builds an identity.
    pub fn new(worker_id: usize, worker_count: usize) -> Result<Self, IdentityError> {
        if worker_count == 0 {
            return Err(IdentityError::ZeroWorkers);
        }
        if worker_id >= worker_count {
            return Err(IdentityError::OutOfRange {
                worker_id,
                worker_count,
            });
        }
        Ok(Self {
            worker_id,
            worker_count,
        })
    }

    /// Reads the identity from the process environment.
    pub fn from_env() -> Result<Self, IdentityError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the identity through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IdentityError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let worker_id = parse_var(&lookup, WORKER_ID_VAR)?;
        let worker_count = parse_var(&lookup, WORKER_COUNT_VAR)?;
        Self::new(worker_id, worker_count)
    }

    #[inline]
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Environment assignments that reproduce this identity in a child process.
    pub fn env_pairs(&self) -> [(&'static str, String); 2] {
        [
            (WORKER_ID_VAR, self.worker_id.to_string()),
            (WORKER_COUNT_VAR, self.worker_count.to_string()),
        ]
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<usize, IdentityError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).ok_or(IdentityError::Missing { var })?;
    value
        .trim()
        .parse()
        .map_err(|_| IdentityError::Invalid { var, value })
}

/// What this process is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The supervisor.
    Primary,
    /// A supervised worker.
    Worker(WorkerIdentity),
}

impl Role {
    /// Detects the role from the process environment.
    pub fn from_env() -> Result<Self, IdentityError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Detects the role through an arbitrary variable lookup.
    ///
    /// `WORKER_ID` absent → primary. Present → worker, and both variables must be valid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IdentityError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(WORKER_ID_VAR).is_none() {
            return Ok(Role::Primary);
        }
        WorkerIdentity::from_lookup(lookup).map(Role::Worker)
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Role::Primary)
    }
}
