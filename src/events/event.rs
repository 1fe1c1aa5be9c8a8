//! # Supervisor events.
//!
//! [`EventKind`] classifies what happened:
//! - **Worker lifecycle**: forked, online, exited
//! - **Restart handling**: scheduled, skipped, spawn failed, slot abandoned
//! - **Reporting**: periodic stats
//! - **Shutdown**: requested, all stopped, timeout
//! - **Subscriber health**: panicked, overflow
//!
//! [`Event`] carries the metadata; which optional fields are set depends on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use clustervisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_slot(2)
//!     .with_restart_count(3)
//!     .with_delay(Duration::from_secs(1));
//!
//! assert_eq!(ev.slot, Some(2));
//! assert_eq!(ev.delay_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::ClusterStats;
use crate::process::{TerminationReason, WorkerId};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker process was created.
    ///
    /// Sets: `slot`, `worker`, `pid`, `restart_count` (carried over for replacements).
    WorkerForked,

    /// A worker reported that it is running.
    ///
    /// Sets: `slot`, `worker`, `pid`.
    WorkerOnline,

    /// A worker process terminated.
    ///
    /// Sets: `slot`, `worker`, `pid`, `reason` (exit code or signal).
    WorkerExited,

    // === Restart handling ===
    /// A replacement fork is scheduled for the slot.
    ///
    /// Sets: `slot`, `worker` (the dead one), `restart_count` (after increment), `delay_ms`.
    RestartScheduled,

    /// The slot is left stopped: restart policy declined, or shutdown began
    /// before the restart delay elapsed.
    ///
    /// Sets: `slot`, `worker`, `reason`.
    RestartSkipped,

    /// Creating a worker process failed.
    ///
    /// Sets: `slot`, `restart_count`, `reason`.
    SpawnFailed,

    /// Restart budget exhausted; the slot will never be forked again and the
    /// pool runs one worker short.
    ///
    /// Sets: `slot`, `worker`, `restart_count`, `reason`.
    SlotAbandoned,

    // === Reporting ===
    /// Periodic pool statistics.
    ///
    /// Sets: `stats`.
    StatsReported,

    // === Shutdown ===
    /// Shutdown started; `shutdown` sent to every live worker.
    ///
    /// Sets: `reason` (who asked).
    ShutdownRequested,

    /// Every tracked worker has terminated.
    AllStopped,

    /// Shutdown timeout elapsed; stragglers are being killed.
    ///
    /// Sets: `delay_ms` (the timeout), `reason` (stuck slots).
    ShutdownTimeout,

    // === Subscriber health ===
    /// Subscriber panicked while processing an event.
    ///
    /// Sets: `source` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber queue dropped an event.
    ///
    /// Sets: `source` (subscriber name), `reason` ("full" or "closed").
    SubscriberOverflow,
}

impl EventKind {
    /// Short kebab-case name for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WorkerForked => "worker-forked",
            EventKind::WorkerOnline => "worker-online",
            EventKind::WorkerExited => "worker-exited",
            EventKind::RestartScheduled => "restart-scheduled",
            EventKind::RestartSkipped => "restart-skipped",
            EventKind::SpawnFailed => "spawn-failed",
            EventKind::SlotAbandoned => "slot-abandoned",
            EventKind::StatsReported => "stats",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStopped => "all-stopped",
            EventKind::ShutdownTimeout => "shutdown-timeout",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
        }
    }
}

/// Supervisor event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,

    /// Slot index `0..worker_count`.
    pub slot: Option<usize>,
    pub worker: Option<WorkerId>,
    pub pid: Option<u32>,
    pub restart_count: Option<u32>,
    /// Delay or timeout in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (exit status, error text, etc.).
    pub reason: Option<Arc<str>>,
    /// How the worker ended, for `WorkerExited`.
    pub exit: Option<TerminationReason>,
    /// Name of the emitting subscriber, for subscriber health events.
    pub source: Option<&'static str>,
    pub stats: Option<ClusterStats>,
}

impl Event {
    /// Creates an event with the current timestamp and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            slot: None,
            worker: None,
            pid: None,
            restart_count: None,
            delay_ms: None,
            reason: None,
            exit: None,
            source: None,
            stats: None,
        }
    }

    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    #[inline]
    pub fn with_worker(mut self, id: WorkerId) -> Self {
        self.worker = Some(id);
        self
    }

    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    #[inline]
    pub fn with_restart_count(mut self, n: u32) -> Self {
        self.restart_count = Some(n);
        self
    }

    /// Attaches a duration (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the exit status and its description as the reason.
    #[inline]
    pub fn with_exit(mut self, exit: TerminationReason) -> Self {
        self.exit = Some(exit);
        self.with_reason(exit.describe())
    }

    #[inline]
    pub fn with_stats(mut self, stats: ClusterStats) -> Self {
        self.stats = Some(stats);
        self
    }

    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.source = Some(subscriber);
        ev
    }

    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.source = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::WorkerForked);
        let b = Event::new(EventKind::WorkerForked);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::ShutdownTimeout).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_exit_sets_reason() {
        let ev = Event::new(EventKind::WorkerExited).with_exit(TerminationReason::Exited(1));
        assert_eq!(ev.exit, Some(TerminationReason::Exited(1)));
        assert_eq!(
            ev.reason.as_deref(),
            Some(TerminationReason::Exited(1).describe().as_str())
        );
    }

    #[test]
    fn test_subscriber_overflow() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.source, Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
    }
}
