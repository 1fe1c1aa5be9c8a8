//! # Supervisor event loop.
//!
//! A single task owns [`ClusterState`]; every transition happens in one of its
//! handlers. Child monitors and restart timers only send messages in.
//!
//! ```text
//!                 ┌──────────── ChildEvent (online / exited) ◄── child monitors
//!                 │ ┌────────── RestartDue ◄──────────────────── restart timers
//!                 │ │ ┌──────── Command ◄───────────────────────── ClusterHandle
//!                 ▼ ▼ ▼
//! loop { select! { child | timer | command | stats tick | shutdown deadline } }
//!                 │
//!                 └──► Bus.publish(Event) ──► listener ──► SubscriberSet
//! ```
//!
//! ## Exit handling
//! ```text
//! Exited(slot)
//!   ├─ shutting down            ─► slot Exited
//!   ├─ policy declines          ─► slot Exited, RestartSkipped
//!   └─ restart_count += 1
//!        ├─ > max_restarts      ─► slot Abandoned, SlotAbandoned
//!        └─ otherwise           ─► RestartScheduled, timer(delay)
//!                                    └─ RestartDue
//!                                         ├─ shutting down ─► RestartSkipped
//!                                         ├─ fork ok       ─► insert new, remove old
//!                                         └─ fork failed   ─► SpawnFailed, counts as a crash
//! ```
//!
//! ## Shutdown
//! `shutdown` is sent to every live worker. The loop finishes on the child
//! exit that empties the live set, or on the deadline: stragglers get
//! `Signal::Kill` and waiters get `RuntimeError::ShutdownTimeout`. Finishing
//! cancels the runtime token, which kills anything still running.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::SupervisorConfig;
use crate::core::state::{ClusterSnapshot, ClusterState, ClusterStats, SlotState, WorkerRecord};
use crate::error::{RuntimeError, SpawnError};
use crate::events::{Bus, Event, EventKind};
use crate::process::{
    ChildEvent, ChildReporter, Signal, Spawner, TerminationReason, WorkerId, WorkerLaunch,
};
use crate::worker::WorkerIdentity;

/// Upper bound on waiting for subscribers to drain after the loop finishes.
const SUBSCRIBER_FLUSH: Duration = Duration::from_secs(2);

/// Requests from [`ClusterHandle`](crate::ClusterHandle).
pub(crate) enum Command {
    Shutdown {
        reason: &'static str,
        reply: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Stats(oneshot::Sender<ClusterStats>),
    Snapshot(oneshot::Sender<ClusterSnapshot>),
}

/// A restart delay elapsed for the slot whose process `dead` exited.
struct RestartDue {
    slot: usize,
    dead: WorkerId,
}

struct ShutdownState {
    waiters: Vec<oneshot::Sender<Result<(), RuntimeError>>>,
    deadline: Option<Instant>,
}

pub(crate) struct Cluster {
    cfg: SupervisorConfig,
    state: ClusterState,
    spawner: Arc<dyn Spawner>,
    bus: Bus,
    token: CancellationToken,
    listener: Option<JoinHandle<()>>,

    child_tx: mpsc::UnboundedSender<ChildEvent>,
    child_rx: mpsc::UnboundedReceiver<ChildEvent>,
    timer_tx: mpsc::UnboundedSender<RestartDue>,
    timer_rx: mpsc::UnboundedReceiver<RestartDue>,

    shutdown: Option<ShutdownState>,
}

impl Cluster {
    /// Forks one worker per slot, in index order.
    ///
    /// On the first spawn failure the runtime token is cancelled (killing the
    /// workers forked so far) and the error is returned.
    pub(crate) fn start(
        cfg: SupervisorConfig,
        identities: Vec<WorkerIdentity>,
        spawner: Arc<dyn Spawner>,
        bus: Bus,
        token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Result<Self, RuntimeError> {
        let (child_tx, child_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let mut cluster = Self {
            cfg,
            state: ClusterState::new(identities),
            spawner,
            bus,
            token,
            listener: Some(listener),
            child_tx,
            child_rx,
            timer_tx,
            timer_rx,
            shutdown: None,
        };

        for slot in 0..cluster.state.worker_count() {
            if let Err(source) = cluster.fork_worker(slot, 0) {
                cluster.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_slot(slot)
                        .with_restart_count(0)
                        .with_reason(source.to_string()),
                );
                cluster.token.cancel();
                return Err(RuntimeError::Spawn { slot, source });
            }
        }
        Ok(cluster)
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut stats = self.cfg.stats_interval().map(|period| {
            let mut iv = tokio::time::interval_at(Instant::now() + period, period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            iv
        });
        let mut commands_open = true;

        loop {
            let deadline = self.shutdown.as_ref().and_then(|s| s.deadline);

            tokio::select! {
                Some(ev) = self.child_rx.recv() => self.on_child(ev),
                Some(due) = self.timer_rx.recv() => self.on_restart_due(due),
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        commands_open = false;
                        self.begin_shutdown("handle dropped", None);
                    }
                },
                _ = tick(&mut stats) => self.report_stats(),
                _ = elapsed(deadline) => {
                    self.force_stop().await;
                    return;
                }
            }

            if self.shutdown.is_some() && self.state.live_count() == 0 {
                self.bus.publish(Event::new(EventKind::AllStopped));
                self.finish(Ok(())).await;
                return;
            }
        }
    }

    fn fork_worker(&mut self, slot: usize, restart_count: u32) -> Result<WorkerId, SpawnError> {
        let identity = match self.state.slot(slot) {
            Some(s) => s.identity,
            None => {
                return Err(SpawnError::Rejected {
                    reason: format!("slot {slot} does not exist"),
                });
            }
        };

        let id = self.state.allocate_id();
        let reporter = ChildReporter::new(id, self.child_tx.clone());
        let handle = self.spawner.spawn(
            WorkerLaunch {
                id,
                identity,
                base_port: self.cfg.base_port,
            },
            reporter,
            self.token.child_token(),
        )?;
        let pid = handle.pid();

        self.state.insert(
            id,
            WorkerRecord {
                slot,
                handle,
                pid,
                started: Instant::now(),
                started_at: SystemTime::now(),
                restart_count,
                alive: true,
            },
        );
        self.bus.publish(
            Event::new(EventKind::WorkerForked)
                .with_slot(slot)
                .with_worker(id)
                .with_pid(pid)
                .with_restart_count(restart_count),
        );
        Ok(id)
    }

    fn on_child(&mut self, ev: ChildEvent) {
        match ev {
            ChildEvent::Online { id, pid } => self.on_online(id, pid),
            ChildEvent::Exited { id, reason } => self.on_exit(id, reason),
        }
    }

    fn on_online(&mut self, id: WorkerId, pid: Option<u32>) {
        let Some(record) = self.state.record_mut(id) else {
            return;
        };
        if !record.alive {
            return;
        }
        if pid.is_some() {
            record.pid = pid;
        }
        let (slot, pid) = (record.slot, record.pid);

        if let Some(s) = self.state.slot_mut(slot) {
            if s.current == Some(id) && s.state == SlotState::Starting {
                s.state = SlotState::Online;
            }
        }
        self.bus.publish(
            Event::new(EventKind::WorkerOnline)
                .with_slot(slot)
                .with_worker(id)
                .with_pid(pid),
        );
    }

    fn on_exit(&mut self, id: WorkerId, reason: TerminationReason) {
        let Some(record) = self.state.record_mut(id) else {
            return;
        };
        if !record.alive {
            return;
        }
        record.alive = false;
        let (slot, pid) = (record.slot, record.pid);

        self.bus.publish(
            Event::new(EventKind::WorkerExited)
                .with_slot(slot)
                .with_worker(id)
                .with_pid(pid)
                .with_exit(reason),
        );

        let is_current = self
            .state
            .slot(slot)
            .is_some_and(|s| s.current == Some(id));
        if !is_current {
            return;
        }

        if self.shutdown.is_some() {
            self.set_slot_state(slot, SlotState::Exited);
            return;
        }
        if !self.cfg.restart.should_restart(&reason) {
            self.set_slot_state(slot, SlotState::Exited);
            self.bus.publish(
                Event::new(EventKind::RestartSkipped)
                    .with_slot(slot)
                    .with_worker(id)
                    .with_reason("restart policy"),
            );
            return;
        }
        self.restart_worker(slot, id);
    }

    /// Counts one crash of `slot` and either schedules a replacement for
    /// `dead` or abandons the slot.
    fn restart_worker(&mut self, slot: usize, dead: WorkerId) {
        let Some(s) = self.state.slot_mut(slot) else {
            return;
        };
        s.restart_count = s.restart_count.saturating_add(1);
        let restarts = s.restart_count;

        if let Some(record) = self.state.record_mut(dead) {
            record.restart_count = restarts;
        }

        if restarts > self.cfg.max_restarts {
            self.set_slot_state(slot, SlotState::Abandoned);
            self.bus.publish(
                Event::new(EventKind::SlotAbandoned)
                    .with_slot(slot)
                    .with_worker(dead)
                    .with_restart_count(restarts)
                    .with_reason(format!(
                        "restart budget of {} exhausted",
                        self.cfg.max_restarts
                    )),
            );
            return;
        }

        self.set_slot_state(slot, SlotState::RestartScheduled);
        let delay = self.cfg.restart_backoff.delay_for(restarts);
        self.bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_slot(slot)
                .with_worker(dead)
                .with_restart_count(restarts)
                .with_delay(delay),
        );
        self.schedule_restart(RestartDue { slot, dead }, delay);
    }

    fn schedule_restart(&self, due: RestartDue, delay: Duration) {
        let tx = self.timer_tx.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(due);
                }
                _ = token.cancelled() => {}
            }
        });
    }

    fn on_restart_due(&mut self, due: RestartDue) {
        let RestartDue { slot, dead } = due;
        let (state, restarts) = match self.state.slot(slot) {
            Some(s) => (s.state, s.restart_count),
            None => return,
        };
        if state != SlotState::RestartScheduled {
            return;
        }

        match self.fork_worker(slot, restarts) {
            Ok(_) => {
                self.state.remove(dead);
            }
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_slot(slot)
                        .with_restart_count(restarts)
                        .with_reason(err.to_string()),
                );
                self.restart_worker(slot, dead);
            }
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Shutdown { reason, reply } => self.begin_shutdown(reason, Some(reply)),
            Command::Stats(reply) => {
                let _ = reply.send(self.state.stats(Instant::now()));
            }
            Command::Snapshot(reply) => {
                let snap = self
                    .state
                    .snapshot(Instant::now(), self.shutdown.is_some());
                let _ = reply.send(snap);
            }
        }
    }

    fn begin_shutdown(
        &mut self,
        reason: &'static str,
        reply: Option<oneshot::Sender<Result<(), RuntimeError>>>,
    ) {
        if let Some(sd) = self.shutdown.as_mut() {
            sd.waiters.extend(reply);
            return;
        }

        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));

        for (_, record) in self.state.live() {
            record.handle.send(Signal::Shutdown);
        }

        let mut skipped = Vec::new();
        for (index, slot) in self.state.slots_mut().enumerate() {
            if slot.state == SlotState::RestartScheduled {
                slot.state = SlotState::Exited;
                skipped.push((index, slot.current));
            }
        }
        for (index, worker) in skipped {
            let mut ev = Event::new(EventKind::RestartSkipped)
                .with_slot(index)
                .with_reason("shutdown in progress");
            ev.worker = worker;
            self.bus.publish(ev);
        }

        self.shutdown = Some(ShutdownState {
            waiters: reply.into_iter().collect(),
            deadline: self.cfg.shutdown_timeout.map(|t| Instant::now() + t),
        });
    }

    /// Shutdown deadline passed: kill stragglers and fail the waiters.
    async fn force_stop(&mut self) {
        let timeout = self.cfg.shutdown_timeout.unwrap_or_default();
        let stuck = self.state.live_slots();

        self.bus.publish(
            Event::new(EventKind::ShutdownTimeout)
                .with_delay(timeout)
                .with_reason(format!("stuck slots: {stuck:?}")),
        );
        for (_, record) in self.state.live() {
            record.handle.send(Signal::Kill);
        }

        self.finish(Err((timeout, stuck))).await;
    }

    /// Cancels the runtime, flushes subscribers, then answers every shutdown waiter.
    async fn finish(&mut self, outcome: Result<(), (Duration, Vec<usize>)>) {
        self.token.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = tokio::time::timeout(SUBSCRIBER_FLUSH, listener).await;
        }

        let waiters = self
            .shutdown
            .take()
            .map(|sd| sd.waiters)
            .unwrap_or_default();
        for waiter in waiters {
            let result = match &outcome {
                Ok(()) => Ok(()),
                Err((timeout, stuck)) => Err(RuntimeError::ShutdownTimeout {
                    timeout: *timeout,
                    stuck: stuck.clone(),
                }),
            };
            let _ = waiter.send(result);
        }
    }

    fn report_stats(&self) {
        let stats = self.state.stats(Instant::now());
        self.bus
            .publish(Event::new(EventKind::StatsReported).with_stats(stats));
    }

    fn set_slot_state(&mut self, slot: usize, state: SlotState) {
        if let Some(s) = self.state.slot_mut(slot) {
            s.state = state;
        }
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
