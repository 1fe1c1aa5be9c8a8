//! # Restart policies for worker slots.
//!
//! [`RestartPolicy`] decides whether an exited worker is replaced. The restart
//! budget (`SupervisorConfig::max_restarts`) applies on top of it: a policy
//! can only ever *prevent* a restart the budget would allow.
//!
//! - [`RestartPolicy::Always`] any exit, clean or not, restarts the slot (default).
//! - [`RestartPolicy::OnFailure`] a clean `exit(0)` leaves the slot stopped.
//! - [`RestartPolicy::Never`] the first exit leaves the slot stopped.
//!
//! Exits observed during shutdown never restart, whatever the policy.

use crate::process::TerminationReason;

/// Policy controlling whether a worker slot is re-forked after its process exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the slot stays `Exited` after the first exit.
    Never,
    /// Restart only if the process did not exit cleanly.
    OnFailure,
    /// Restart after every exit (default).
    #[default]
    Always,
}

impl RestartPolicy {
    /// Returns `true` if a process that terminated for `reason` should be replaced.
    pub fn should_restart(&self, reason: &TerminationReason) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => !reason.is_success(),
            RestartPolicy::Always => true,
        }
    }
}
