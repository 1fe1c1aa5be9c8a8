//! Managed child processes.
//!
//! The supervisor never touches an OS process API directly. It asks a
//! [`Spawner`] for a worker and gets back a [`ChildHandle`] (the one-way
//! [`Signal`] channel into the child). The spawner reports the child's
//! lifecycle back through a [`ChildReporter`].
//!
//! ## Architecture
//! ```text
//! ClusterLoop ──► Spawner::spawn(WorkerLaunch, ChildReporter, token)
//!      │                 └─► monitor task (per child)
//!      │                        ├─ reporter.online(pid)
//!      │  ChildHandle           ├─ Signal::Shutdown ─► "shutdown\n" on stdin
//!      └──── send(Signal) ─────►├─ Signal::Kill     ─► SIGKILL
//!                               └─ reporter.exited(TerminationReason)
//! ```
//!
//! ## Implementations
//! - [`CommandSpawner`] runs a program via `tokio::process` with the worker
//!   identity in its environment.
//! - Tests plug in in-memory spawners.

mod child;
mod command;
mod signal;

pub use child::{ChildEvent, ChildHandle, ChildReporter, Spawner, WorkerId, WorkerLaunch};
pub use command::CommandSpawner;
pub use signal::{SHUTDOWN_MESSAGE, Signal, TerminationReason};
