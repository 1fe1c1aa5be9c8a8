//! # ClusterSupervisor: builder and startup.
//!
//! [`ClusterSupervisor::start`] profiles the host (unless a profile was
//! given), derives the tier config and branches on the process [`Role`]:
//!
//! ```text
//! start()
//!   ├─ profile() ─► derive() ─► DerivedConfig
//!   ├─ Role::Worker(identity) ─► WorkerRuntime::start() ─► Launch::Worker(WorkerConfig)
//!   └─ Role::Primary
//!        ├─ worker_count(profile)          fixed for the supervisor lifetime
//!        ├─ spawn subscriber listener      Bus ─► SubscriberSet
//!        ├─ fork slots 0..worker_count     in index order
//!        ├─ spawn Cluster::run             the event loop
//!        └─ Launch::Primary(ClusterHandle)
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use clustervisor::{ClusterSupervisor, Launch, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     match ClusterSupervisor::new(SupervisorConfig::default()).start()? {
//!         Launch::Primary(cluster) => cluster.run_until_signal().await?,
//!         Launch::Worker(cfg) => {
//!             println!("worker {} on port {}", cfg.worker_id, cfg.port());
//!             clustervisor::wait_for_shutdown_stdin().await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::core::SupervisorConfig;
use crate::core::cluster::Cluster;
use crate::core::handle::ClusterHandle;
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::policies;
use crate::process::{CommandSpawner, Spawner};
use crate::profile::{self, SystemProfile};
use crate::subscribers::{LogWriter, Subscribe, SubscriberSet};
use crate::tuning;
use crate::worker::{Role, WorkerConfig, WorkerIdentity, WorkerRuntime, inherited_base_port};

const COMMAND_QUEUE: usize = 32;

/// What [`ClusterSupervisor::start`] turned this process into.
#[derive(Debug)]
pub enum Launch {
    /// This process supervises the pool.
    Primary(ClusterHandle),
    /// This process is a worker; here is its configuration.
    Worker(WorkerConfig),
}

/// Builder for the cluster supervisor.
pub struct ClusterSupervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    profile: Option<SystemProfile>,
    role: Option<Role>,
    spawner: Option<Arc<dyn Spawner>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ClusterSupervisor {
    /// New builder. Subscribers default to a single [`LogWriter`].
    pub fn new(cfg: SupervisorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            profile: None,
            role: None,
            spawner: None,
            subscribers: vec![Arc::new(LogWriter::new())],
        }
    }

    /// Uses `profile` instead of reading the host.
    pub fn with_profile(mut self, profile: SystemProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Fixes the role instead of reading `WORKER_ID`/`WORKER_COUNT`.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Spawner for worker processes. Default: [`CommandSpawner::current_exe`].
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Replaces the subscriber list (the default [`LogWriter`] included).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Receiver for every event, startup forks included.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Starts the process in its role.
    ///
    /// Must be called inside a tokio runtime when the role is primary.
    ///
    /// # Errors
    /// - [`RuntimeError::Profile`] host resources could not be read
    /// - [`RuntimeError::Identity`] worker environment is invalid, base port included
    /// - [`RuntimeError::Spawn`] a startup fork failed; forked workers are killed
    pub fn start(self) -> Result<Launch, RuntimeError> {
        let profile = match self.profile {
            Some(p) => p,
            None => profile::profile()?,
        };
        let derived = tuning::derive(&profile);
        let role = match self.role {
            Some(r) => r,
            None => Role::from_env()?,
        };

        if let Role::Worker(identity) = role {
            let base_port = inherited_base_port(|k| std::env::var(k).ok())?
                .unwrap_or(self.cfg.base_port);
            let cfg = WorkerRuntime::new(derived, identity)
                .with_base_port(base_port)
                .start();
            return Ok(Launch::Worker(cfg));
        }

        let spawner: Arc<dyn Spawner> = match self.spawner {
            Some(s) => s,
            None => Arc::new(
                CommandSpawner::current_exe()
                    .map_err(|source| RuntimeError::Spawn { slot: 0, source })?,
            ),
        };

        let worker_count = policies::worker_count(&profile);
        let identities = (0..worker_count)
            .map(|slot| WorkerIdentity::new(slot, worker_count))
            .collect::<Result<Vec<_>, _>>()?;

        let token = CancellationToken::new();
        let listener = tokio::spawn(subscriber_listener(
            self.bus.subscribe(),
            SubscriberSet::new(self.subscribers, self.bus.clone()),
            token.clone(),
        ));

        let cluster = Cluster::start(
            self.cfg.clone(),
            identities,
            spawner,
            self.bus.clone(),
            token,
            listener,
        )?;

        let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
        tokio::spawn(cluster.run(rx));

        Ok(Launch::Primary(ClusterHandle::new(
            commands,
            self.bus,
            Arc::new(derived),
            worker_count,
            self.cfg.base_port,
        )))
    }
}

/// Forwards bus events to the subscriber set until the runtime is cancelled,
/// then delivers what is still buffered and waits for the subscribers to drain.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            ev = rx.recv() => match ev {
                Ok(ev) => set.emit(ev),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = token.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    set.shutdown().await;
}
