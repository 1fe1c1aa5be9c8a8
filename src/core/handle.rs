//! # Handle to a running cluster.
//!
//! [`ClusterHandle`] talks to the supervisor loop over a command channel.
//! Clones share the same loop; dropping the last clone starts a shutdown.
//!
//! Once the loop has finished, `shutdown()` returns `Ok(())` and the queries
//! return [`RuntimeError::Closed`].

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::core::cluster::Command;
use crate::core::state::{ClusterSnapshot, ClusterStats};
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::profile::SystemProfile;
use crate::tuning::DerivedConfig;
use crate::worker::{WorkerConfig, WorkerIdentity};

#[derive(Clone, Debug)]
pub struct ClusterHandle {
    commands: mpsc::Sender<Command>,
    bus: Bus,
    derived: Arc<DerivedConfig>,
    worker_count: usize,
    base_port: u16,
}

impl ClusterHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        bus: Bus,
        derived: Arc<DerivedConfig>,
        worker_count: usize,
        base_port: u16,
    ) -> Self {
        Self {
            commands,
            bus,
            derived,
            worker_count,
            base_port,
        }
    }

    /// Pool size, fixed at start.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn profile(&self) -> &SystemProfile {
        &self.derived.system
    }

    pub fn derived(&self) -> &DerivedConfig {
        &self.derived
    }

    /// The configuration slot `slot`'s worker computes for itself.
    pub fn worker_config(&self, slot: usize) -> Option<WorkerConfig> {
        let identity = WorkerIdentity::new(slot, self.worker_count).ok()?;
        Some(WorkerConfig::render(&self.derived, identity, self.base_port))
    }

    /// Receiver for events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Asks every worker to stop and waits until all have terminated.
    ///
    /// With a `shutdown_timeout` configured, stragglers are killed on expiry
    /// and [`RuntimeError::ShutdownTimeout`] is returned.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.shutdown_with_reason("requested").await
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    ///
    /// The signal name becomes the `ShutdownRequested` reason.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let signal = termination_signal()
            .await
            .map_err(|source| RuntimeError::Signal { source })?;
        self.shutdown_with_reason(signal).await
    }

    async fn shutdown_with_reason(&self, reason: &'static str) -> Result<(), RuntimeError> {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Shutdown { reason, reply })
            .await
            .is_err()
        {
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }

    pub async fn stats(&self) -> Result<ClusterStats, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats(reply))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    pub async fn snapshot(&self) -> Result<ClusterSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }
}

/// Resolves with the name of the first termination signal delivered.
#[cfg(unix)]
async fn termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut streams = Vec::with_capacity(3);
    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::quit(), "SIGQUIT"),
    ] {
        streams.push((signal(kind)?, name));
    }

    let waits = streams.iter_mut().map(|(stream, name)| {
        Box::pin(async move {
            stream.recv().await;
            *name
        })
    });
    let (name, _, _) = futures::future::select_all(waits).await;
    Ok(name)
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use nix::sys::signal::{Signal, raise};

    use super::*;

    #[tokio::test]
    async fn test_termination_signal_names_signal() {
        let wait = tokio::spawn(termination_signal());
        // let the task install its handlers before raising
        tokio::time::sleep(Duration::from_millis(50)).await;
        raise(Signal::SIGQUIT).unwrap();

        let name = tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(name, "SIGQUIT");
    }
}
