//! # Control signals and termination reasons.
//!
//! [`Signal`] is the only thing the supervisor ever sends to a worker.
//! [`TerminationReason`] is the only thing it learns when the worker dies.

use std::fmt;
use std::process::ExitStatus;

/// Wire form of [`Signal::Shutdown`] on the child's control pipe (one line).
pub const SHUTDOWN_MESSAGE: &str = "shutdown";

/// One-way control message from supervisor to worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Begin graceful termination. No acknowledgment other than process death.
    Shutdown,
    /// Forced termination (shutdown timeout fallback).
    Kill,
}

/// Why a worker process terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal number.
    Signaled(i32),
    /// The exit status could not be determined.
    Unknown,
}

impl TerminationReason {
    /// `true` only for `exit(0)`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Short form for logs, e.g. `code 1` or `SIGKILL`.
    pub fn describe(&self) -> String {
        match self {
            Self::Exited(code) => format!("code {code}"),
            Self::Signaled(sig) => signal_name(*sig),
            Self::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<ExitStatus> for TerminationReason {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Self::Signaled(sig);
            }
        }
        Self::Unknown
    }
}

#[cfg(unix)]
fn signal_name(sig: i32) -> String {
    match nix::sys::signal::Signal::try_from(sig) {
        Ok(s) => s.as_str().to_string(),
        Err(_) => format!("signal {sig}"),
    }
}

#[cfg(not(unix))]
fn signal_name(sig: i32) -> String {
    format!("signal {sig}")
}
