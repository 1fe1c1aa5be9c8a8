//! # Cluster state owned by the supervisor loop.
//!
//! ```text
//! ClusterState
//!   ├─ slots[0..worker_count]   fixed; one per WORKER_ID
//!   │    └─ SlotState, current WorkerId, restart_count
//!   └─ records: WorkerId → WorkerRecord
//!        one per forked process still tracked
//! ```
//!
//! ## Rules
//! - `worker_count` and the slot vector never change after start.
//! - A slot's `restart_count` only grows; replacements inherit it.
//! - During a restart the dead record stays until its replacement is
//!   inserted, so the slot is never untracked.
//! - An abandoned slot keeps its last (dead) record.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::time::Instant;

use crate::process::{ChildHandle, WorkerId};
use crate::worker::WorkerIdentity;

/// Lifecycle state of a worker slot.
///
/// ```text
/// Starting → Online → Exited → RestartScheduled → Starting
///                       └────→ Abandoned (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotState {
    /// Forked, not yet reported online.
    Starting,
    Online,
    /// Process gone; no restart pending (policy declined, or shutting down).
    Exited,
    /// Waiting for the restart delay.
    RestartScheduled,
    /// Restart budget exhausted. Never forked again.
    Abandoned,
}

impl SlotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotState::Starting => "starting",
            SlotState::Online => "online",
            SlotState::Exited => "exited",
            SlotState::RestartScheduled => "restart-scheduled",
            SlotState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One forked worker process.
#[derive(Debug)]
pub(crate) struct WorkerRecord {
    pub(crate) slot: usize,
    pub(crate) handle: ChildHandle,
    pub(crate) pid: Option<u32>,
    pub(crate) started: Instant,
    pub(crate) started_at: SystemTime,
    pub(crate) restart_count: u32,
    pub(crate) alive: bool,
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) identity: WorkerIdentity,
    pub(crate) state: SlotState,
    pub(crate) current: Option<WorkerId>,
    pub(crate) restart_count: u32,
}

#[derive(Debug)]
pub(crate) struct ClusterState {
    slots: Vec<Slot>,
    records: BTreeMap<WorkerId, WorkerRecord>,
    next_id: u64,
}

impl ClusterState {
    pub(crate) fn new(identities: Vec<WorkerIdentity>) -> Self {
        let slots = identities
            .into_iter()
            .map(|identity| Slot {
                identity,
                state: SlotState::Starting,
                current: None,
                restart_count: 0,
            })
            .collect();
        Self {
            slots,
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn allocate_id(&mut self) -> WorkerId {
        let id = WorkerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots.iter_mut()
    }

    pub(crate) fn record_mut(&mut self, id: WorkerId) -> Option<&mut WorkerRecord> {
        self.records.get_mut(&id)
    }

    /// Inserts a freshly forked record and makes it the slot's current one.
    pub(crate) fn insert(&mut self, id: WorkerId, record: WorkerRecord) {
        if let Some(slot) = self.slots.get_mut(record.slot) {
            slot.current = Some(id);
            slot.state = SlotState::Starting;
            slot.restart_count = record.restart_count;
        }
        self.records.insert(id, record);
    }

    pub(crate) fn remove(&mut self, id: WorkerId) -> Option<WorkerRecord> {
        self.records.remove(&id)
    }

    /// Records whose process has not terminated.
    pub(crate) fn live(&self) -> impl Iterator<Item = (WorkerId, &WorkerRecord)> {
        self.records
            .iter()
            .filter(|(_, r)| r.alive)
            .map(|(id, r)| (*id, r))
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live().count()
    }

    /// Sorted, deduplicated slots that still have a live process.
    pub(crate) fn live_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.live().map(|(_, r)| r.slot).collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    pub(crate) fn stats(&self, now: Instant) -> ClusterStats {
        let total_workers = self.records.len();
        let active_workers = self.live_count();
        let total_restarts = self
            .records
            .values()
            .map(|r| u64::from(r.restart_count))
            .sum();

        let avg_uptime_seconds = if total_workers == 0 {
            0
        } else {
            let total_ms: u128 = self
                .records
                .values()
                .map(|r| now.saturating_duration_since(r.started).as_millis())
                .sum();
            (total_ms as f64 / total_workers as f64 / 1000.0).round() as u64
        };

        ClusterStats {
            total_workers,
            active_workers,
            total_restarts,
            avg_uptime_seconds,
        }
    }

    pub(crate) fn snapshot(&self, now: Instant, shutting_down: bool) -> ClusterSnapshot {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let record = slot.current.and_then(|id| self.records.get(&id));
                SlotSnapshot {
                    slot: index,
                    state: slot.state,
                    worker: slot.current,
                    pid: record.and_then(|r| r.pid),
                    restart_count: slot.restart_count,
                    started_at: record.map(|r| r.started_at),
                    uptime: record
                        .filter(|r| r.alive)
                        .map(|r| now.saturating_duration_since(r.started)),
                }
            })
            .collect();

        ClusterSnapshot {
            worker_count: self.slots.len(),
            shutting_down,
            slots,
        }
    }
}

/// Pool statistics, as reported every `stats_interval`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    /// Tracked records, dead ones included.
    pub total_workers: usize,
    /// Records whose process is still running.
    pub active_workers: usize,
    /// Sum of the tracked records' restart counts.
    pub total_restarts: u64,
    /// Mean age of the tracked records, rounded to whole seconds; `0` when empty.
    pub avg_uptime_seconds: u64,
}

impl fmt::Display for ClusterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "totalWorkers={} activeWorkers={} totalRestarts={} avgUptimeSeconds={}",
            self.total_workers, self.active_workers, self.total_restarts, self.avg_uptime_seconds
        )
    }
}

/// Point-in-time view of one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub slot: usize,
    pub state: SlotState,
    /// Most recent record of the slot.
    pub worker: Option<WorkerId>,
    pub pid: Option<u32>,
    pub restart_count: u32,
    pub started_at: Option<SystemTime>,
    /// `None` once the process has exited.
    pub uptime: Option<Duration>,
}

/// Point-in-time view of the whole pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub worker_count: usize,
    pub shutting_down: bool,
    pub slots: Vec<SlotSnapshot>,
}

impl ClusterSnapshot {
    /// Slots currently in `state`.
    pub fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|s| s.state == state).count()
    }
}
