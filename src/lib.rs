//! # clustervisor
//!
//! **clustervisor** sizes and supervises a pool of worker processes from the
//! resources of the host it runs on.
//!
//! A primary process profiles memory and CPUs, classifies the host into a
//! resource [`Tier`], derives a tiered [`DerivedConfig`], forks one worker
//! per slot and keeps the pool alive with a bounded restart budget. Each
//! worker reads its identity from the environment and computes its own
//! [`WorkerConfig`] slice.
//!
//! ## Architecture
//! ```text
//!  profile() ──► SystemProfile ──► tuning::derive() ──► DerivedConfig
//!                      │                                     │
//!                      └──► worker_count() ──┐               │
//!                                            ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ClusterSupervisor (primary)                                      │
//! │  - Cluster loop (owns ClusterState, no locks)                     │
//! │  - Spawner (forks workers with WORKER_ID / WORKER_COUNT)          │
//! │  - Bus ──► SubscriberSet ──► LogWriter, alerting, ...             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │ worker 0 │       │ worker 1 │       │ worker N │   separate OS processes
//!   │ :8000    │       │ :8001    │       │ :800N    │
//!   └──────────┘       └──────────┘       └──────────┘
//!   WorkerRuntime::start() ─► WorkerConfig { maxMemoryMB, port, cache share }
//! ```
//!
//! ### Slot lifecycle
//! ```text
//! fork ──► Starting ──► Online ──► Exited
//!                                    ├─ restart_count <= max_restarts ─► RestartScheduled ─► fork
//!                                    ├─ restart_count >  max_restarts ─► Abandoned (SlotAbandoned)
//!                                    └─ shutting down / policy        ─► stays Exited
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                                   |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Profiling**     | Host memory/CPU snapshot and tier classification.        | [`SystemProfile`], [`Tier`]                 |
//! | **Tuning**        | Per-tier cache, concurrency, file and network limits.    | [`DerivedConfig`], [`LoadBalancerConfig`]   |
//! | **Supervision**   | Fork, restart with budget, stats, bounded shutdown.      | [`ClusterSupervisor`], [`ClusterHandle`]    |
//! | **Workers**       | Identity, config slice, admission, control channel.      | [`WorkerRuntime`], [`AdmissionGate`]        |
//! | **Processes**     | Spawner seam and the `tokio::process` implementation.     | [`Spawner`], [`CommandSpawner`]             |
//! | **Events**        | Every transition as an event; pluggable subscribers.     | [`Event`], [`Bus`], [`Subscribe`]           |
//! | **Policies**      | Restart and backoff behavior.                            | [`RestartPolicy`], [`BackoffPolicy`]        |
//!
//! ## Example
//! ```rust,no_run
//! use clustervisor::{ClusterSupervisor, Launch, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     clustervisor::logging::init(Default::default());
//!
//!     match ClusterSupervisor::new(SupervisorConfig::default()).start()? {
//!         Launch::Primary(cluster) => {
//!             println!("supervising {} workers", cluster.worker_count());
//!             cluster.run_until_signal().await?;
//!         }
//!         Launch::Worker(cfg) => {
//!             // bind cfg.port(), size caches from cfg.derived() ...
//!             clustervisor::wait_for_shutdown_stdin().await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod process;
mod profile;
mod subscribers;
mod tuning;
mod worker;

pub mod logging;

pub use crate::core::{
    ClusterHandle, ClusterSnapshot, ClusterStats, ClusterSupervisor, Launch, SlotSnapshot,
    SlotState, SupervisorConfig,
};
pub use error::{AdmissionError, IdentityError, ProfileError, RuntimeError, SpawnError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy, worker_count};
pub use process::{
    ChildEvent, ChildHandle, ChildReporter, CommandSpawner, SHUTDOWN_MESSAGE, Signal, Spawner,
    TerminationReason, WorkerId, WorkerLaunch,
};
pub use profile::{SystemProfile, Tier, profile};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tuning::{
    CacheConfig, CircuitBreakerConfig, ConcurrencyConfig, DerivedConfig, FileHandlingConfig,
    HealthCheckConfig, LoadBalancerConfig, NetworkConfig, Strategy, derive,
};
pub use worker::{
    AdjustedConfig, AdmissionGate, AdmissionPermit, BASE_PORT_VAR, DEFAULT_BASE_PORT,
    ProcessMetrics, Role, ShutdownCause, WORKER_COUNT_VAR, WORKER_ID_VAR, WorkerConfig,
    WorkerIdentity, WorkerRuntime, WorkerSlice, wait_for_shutdown, wait_for_shutdown_stdin,
};
