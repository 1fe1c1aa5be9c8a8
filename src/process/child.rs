//! # Spawner seam and child handles.
//!
//! ## Rules
//! - [`Spawner::spawn`] returns as soon as the process exists; it must not wait for it.
//! - Every spawned child reports [`ChildEvent::Exited`] **exactly once**,
//!   and at most one [`ChildEvent::Online`] before it.
//! - When the supervisor's token is cancelled, the spawner kills the child.
//! - Reports after the supervisor is gone are silently dropped.

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SpawnError;
use crate::process::{Signal, TerminationReason};
use crate::worker::{BASE_PORT_VAR, WorkerIdentity};

/// Supervisor-assigned worker id. Unique for the supervisor's lifetime; a
/// restarted slot gets a new id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a spawner needs to start one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerLaunch {
    pub id: WorkerId,
    /// Slot identity handed to the worker process.
    pub identity: WorkerIdentity,
    /// Port of worker 0, so the worker derives the same port the primary reports.
    pub base_port: u16,
}

impl WorkerLaunch {
    /// Environment a worker process needs: `WORKER_ID`, `WORKER_COUNT`
    /// and `CLUSTERVISOR_BASE_PORT`.
    pub fn env_pairs(&self) -> [(&'static str, String); 3] {
        let [id, count] = self.identity.env_pairs();
        [id, count, (BASE_PORT_VAR, self.base_port.to_string())]
    }
}

/// Lifecycle report from a child's monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildEvent {
    Online { id: WorkerId, pid: Option<u32> },
    Exited { id: WorkerId, reason: TerminationReason },
}

impl ChildEvent {
    pub fn id(&self) -> WorkerId {
        match self {
            ChildEvent::Online { id, .. } | ChildEvent::Exited { id, .. } => *id,
        }
    }
}

/// Reports one child's lifecycle into the supervisor loop.
#[derive(Clone, Debug)]
pub struct ChildReporter {
    id: WorkerId,
    tx: mpsc::UnboundedSender<ChildEvent>,
}

impl ChildReporter {
    pub(crate) fn new(id: WorkerId, tx: mpsc::UnboundedSender<ChildEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The child process is running.
    pub fn online(&self, pid: Option<u32>) {
        let _ = self.tx.send(ChildEvent::Online { id: self.id, pid });
    }

    /// The child process is gone.
    pub fn exited(&self, reason: TerminationReason) {
        let _ = self.tx.send(ChildEvent::Exited {
            id: self.id,
            reason,
        });
    }
}

/// Supervisor-side handle to a running child: pid plus the control channel.
#[derive(Clone, Debug)]
pub struct ChildHandle {
    pid: Option<u32>,
    control: mpsc::UnboundedSender<Signal>,
}

impl ChildHandle {
    /// Creates a handle and the receiving end of its control channel.
    pub fn channel(pid: Option<u32>) -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (control, rx) = mpsc::unbounded_channel();
        (Self { pid, control }, rx)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Sends a control signal. Returns `false` if the child's monitor is gone.
    pub fn send(&self, signal: Signal) -> bool {
        self.control.send(signal).is_ok()
    }
}

/// Creates worker processes.
///
/// Called from inside the supervisor's tokio runtime.
pub trait Spawner: Send + Sync + 'static {
    /// Starts one worker.
    ///
    /// `token` is cancelled when the supervisor stops; the child must then be killed.
    fn spawn(
        &self,
        launch: WorkerLaunch,
        reporter: ChildReporter,
        token: CancellationToken,
    ) -> Result<ChildHandle, SpawnError>;
}
