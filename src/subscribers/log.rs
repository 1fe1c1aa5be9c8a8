//! # LogWriter: renders supervisor events through `tracing`.
//!
//! ## Levels
//! - `error`: slot abandoned, shutdown timeout, subscriber panic
//! - `warn`: worker failure, spawn failure, subscriber overflow
//! - `info`: forks, online, restarts, stats, shutdown progress, clean exits
//!
//! Exits after `ShutdownRequested` are logged at `info` whatever their status.
//!
//! ## Example output (compact format)
//! ```text
//! INFO clustervisor: worker forked slot=0 worker=1 pid=4242 restarts=0
//! WARN clustervisor: worker exited slot=0 worker=1 pid=4242 reason="code 1"
//! INFO clustervisor: restart scheduled slot=0 worker=1 restarts=1 delay_ms=1000
//! ERROR clustervisor: slot abandoned slot=0 restarts=6 reason="restart budget of 5 exhausted"
//! INFO clustervisor: cluster stats total_workers=4 active_workers=4 total_restarts=1 avg_uptime_seconds=60
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{Level, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "clustervisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter {
    shutting_down: AtomicBool,
}

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn exit_level(&self, e: &Event) -> Level {
        let clean = e.exit.is_some_and(|r| r.is_success());
        if clean || self.shutting_down.load(Ordering::Relaxed) {
            Level::INFO
        } else {
            Level::WARN
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.0);
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::WorkerForked => info!(
                target: TARGET,
                slot = e.slot, worker, pid = e.pid, restarts = e.restart_count,
                "worker forked"
            ),
            EventKind::WorkerOnline => info!(
                target: TARGET,
                slot = e.slot, worker, pid = e.pid,
                "worker online"
            ),
            EventKind::WorkerExited => {
                if self.exit_level(e) == Level::INFO {
                    info!(
                        target: TARGET,
                        slot = e.slot, worker, pid = e.pid, reason,
                        "worker exited"
                    );
                } else {
                    warn!(
                        target: TARGET,
                        slot = e.slot, worker, pid = e.pid, reason,
                        "worker exited"
                    );
                }
            }
            EventKind::RestartScheduled => info!(
                target: TARGET,
                slot = e.slot, worker, restarts = e.restart_count, delay_ms = e.delay_ms,
                "restart scheduled"
            ),
            EventKind::RestartSkipped => info!(
                target: TARGET,
                slot = e.slot, worker, reason,
                "restart skipped"
            ),
            EventKind::SpawnFailed => warn!(
                target: TARGET,
                slot = e.slot, restarts = e.restart_count, reason,
                "spawn failed"
            ),
            EventKind::SlotAbandoned => error!(
                target: TARGET,
                slot = e.slot, worker, restarts = e.restart_count, reason,
                "slot abandoned"
            ),
            EventKind::StatsReported => {
                if let Some(s) = &e.stats {
                    info!(
                        target: TARGET,
                        total_workers = s.total_workers,
                        active_workers = s.active_workers,
                        total_restarts = s.total_restarts,
                        avg_uptime_seconds = s.avg_uptime_seconds,
                        "cluster stats"
                    );
                }
            }
            EventKind::ShutdownRequested => {
                self.shutting_down.store(true, Ordering::Relaxed);
                info!(target: TARGET, reason, "shutdown requested")
            }
            EventKind::AllStopped => info!(target: TARGET, "all workers stopped"),
            EventKind::ShutdownTimeout => error!(
                target: TARGET,
                timeout_ms = e.delay_ms, reason,
                "shutdown timeout exceeded, killing remaining workers"
            ),
            EventKind::SubscriberPanicked => error!(
                target: TARGET,
                subscriber = e.source, reason,
                "subscriber panicked"
            ),
            EventKind::SubscriberOverflow => warn!(
                target: TARGET,
                subscriber = e.source, reason,
                "subscriber dropped event"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::TerminationReason;

    fn exited(reason: TerminationReason) -> Event {
        Event::new(EventKind::WorkerExited).with_exit(reason)
    }

    #[tokio::test]
    async fn test_exit_level() {
        let w = LogWriter::new();
        assert_eq!(w.exit_level(&exited(TerminationReason::Exited(0))), Level::INFO);
        assert_eq!(w.exit_level(&exited(TerminationReason::Exited(1))), Level::WARN);
        assert_eq!(w.exit_level(&Event::new(EventKind::WorkerExited)), Level::WARN);

        w.on_event(&Event::new(EventKind::ShutdownRequested)).await;
        assert_eq!(w.exit_level(&exited(TerminationReason::Signaled(9))), Level::INFO);
    }
}
