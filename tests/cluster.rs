use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use clustervisor::{
    Bus, ChildHandle, ChildReporter, ClusterHandle, ClusterSupervisor, Event, EventKind, Launch,
    RestartPolicy, Role, RuntimeError, Signal, SlotState, SpawnError, Spawner, Subscribe,
    SubscriberSet, SupervisorConfig, SystemProfile, TerminationReason, WorkerIdentity,
    WorkerLaunch,
};

#[derive(Clone, Copy, Debug)]
enum Behavior {
    /// Exits with `code` after `after`, whatever it is told.
    Crash { after: Duration, code: i32 },
    /// Exits cleanly `(slot + 1) * per_slot` after receiving `shutdown`.
    Cooperative { per_slot: Duration },
    /// Ignores `shutdown`; only a kill ends it.
    Stubborn,
}

struct FakeSpawner {
    behavior: Behavior,
    /// Spawn attempts from this index on are rejected.
    fail_from: Option<usize>,
    attempts: AtomicUsize,
    launches: Mutex<Vec<WorkerLaunch>>,
    terminated: Arc<AtomicUsize>,
}

impl FakeSpawner {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            fail_from: None,
            attempts: AtomicUsize::new(0),
            launches: Mutex::new(Vec::new()),
            terminated: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_from(mut self, attempt: usize) -> Self {
        self.fail_from = Some(attempt);
        self
    }

    fn spawned(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Spawner for FakeSpawner {
    fn spawn(
        &self,
        launch: WorkerLaunch,
        reporter: ChildReporter,
        token: CancellationToken,
    ) -> Result<ChildHandle, SpawnError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|from| attempt >= from) {
            return Err(SpawnError::Rejected {
                reason: "fake spawner refused".into(),
            });
        }
        self.launches.lock().unwrap().push(launch);

        let pid = 1000 + launch.id.0 as u32;
        let (handle, mut control) = ChildHandle::channel(Some(pid));
        let behavior = self.behavior;
        let terminated = Arc::clone(&self.terminated);
        let slot = launch.identity.worker_id();

        tokio::spawn(async move {
            reporter.online(Some(pid));
            let reason = match behavior {
                Behavior::Crash { after, code } => tokio::select! {
                    _ = tokio::time::sleep(after) => TerminationReason::Exited(code),
                    _ = token.cancelled() => TerminationReason::Signaled(9),
                },
                Behavior::Cooperative { per_slot } => loop {
                    tokio::select! {
                        sig = control.recv() => match sig {
                            Some(Signal::Shutdown) => {
                                tokio::time::sleep(per_slot * (slot as u32 + 1)).await;
                                break TerminationReason::Exited(0);
                            }
                            Some(Signal::Kill) => break TerminationReason::Signaled(9),
                            None => {
                                token.cancelled().await;
                                break TerminationReason::Signaled(9);
                            }
                        },
                        _ = token.cancelled() => break TerminationReason::Signaled(9),
                    }
                },
                Behavior::Stubborn => loop {
                    tokio::select! {
                        sig = control.recv() => match sig {
                            Some(Signal::Shutdown) => continue,
                            Some(Signal::Kill) => break TerminationReason::Signaled(9),
                            None => {
                                token.cancelled().await;
                                break TerminationReason::Signaled(9);
                            }
                        },
                        _ = token.cancelled() => break TerminationReason::Signaled(9),
                    }
                },
            };
            terminated.fetch_add(1, Ordering::SeqCst);
            reporter.exited(reason);
        });

        Ok(handle)
    }
}

#[derive(Default)]
struct Collect(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Collect {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }
    fn name(&self) -> &'static str {
        "collect"
    }
}

/// 1 GB, 1 cpu: a single slot.
fn one_slot() -> SystemProfile {
    SystemProfile::from_parts(1024, 512, 1)
}

/// 16 GB, 4 cpus: three slots.
fn three_slots() -> SystemProfile {
    SystemProfile::from_parts(16 * 1024, 8 * 1024, 4)
}

fn start(
    cfg: SupervisorConfig,
    profile: SystemProfile,
    spawner: &Arc<FakeSpawner>,
) -> (ClusterHandle, broadcast::Receiver<Event>) {
    let sup = ClusterSupervisor::new(cfg)
        .with_profile(profile)
        .with_role(Role::Primary)
        .with_spawner(spawner.clone())
        .with_subscribers(Vec::new());
    let events = sup.events();
    match sup.start() {
        Ok(Launch::Primary(handle)) => (handle, events),
        other => panic!("expected a primary launch, got {other:?}"),
    }
}

/// Collects events up to and including the first one of `kind`.
async fn until(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Vec<Event> {
    let wait = async {
        let mut seen = Vec::new();
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let done = ev.kind == kind;
                    seen.push(ev);
                    if done {
                        return seen;
                    }
                }
                Err(e) => panic!("bus error: {e}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(600), wait)
        .await
        .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

#[tokio::test(start_paused = true)]
async fn crash_loop_is_bounded_by_restart_budget() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Crash {
        after: Duration::from_millis(10),
        code: 1,
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), one_slot(), &spawner);
    assert_eq!(cluster.worker_count(), 1);

    let seen = until(&mut events, EventKind::SlotAbandoned).await;
    // the initial fork plus five replacements
    assert_eq!(count(&seen, EventKind::WorkerForked), 6);
    assert_eq!(count(&seen, EventKind::RestartScheduled), 5);
    assert_eq!(count(&seen, EventKind::WorkerExited), 6);
    assert_eq!(spawner.spawned(), 6);

    let abandoned = seen.last().unwrap();
    assert_eq!(abandoned.slot, Some(0));
    assert_eq!(abandoned.restart_count, Some(6));

    // replacements carried the count over
    let counts: Vec<u32> = seen
        .iter()
        .filter(|e| e.kind == EventKind::WorkerForked)
        .filter_map(|e| e.restart_count)
        .collect();
    assert_eq!(counts, vec![0, 1, 2, 3, 4, 5]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(spawner.spawned(), 6, "abandoned slot was forked again");

    let snap = cluster.snapshot().await.unwrap();
    assert_eq!(snap.slots[0].state, SlotState::Abandoned);
    assert_eq!(snap.slots[0].restart_count, 6);

    let stats = cluster.stats().await.unwrap();
    assert_eq!(stats.total_workers, 1);
    assert_eq!(stats.active_workers, 0);
    assert_eq!(stats.total_restarts, 6);

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_waits_for_backoff_delay() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Crash {
        after: Duration::from_millis(10),
        code: 1,
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), one_slot(), &spawner);

    until(&mut events, EventKind::WorkerExited).await;
    let scheduled = until(&mut events, EventKind::RestartScheduled).await;
    assert_eq!(scheduled.last().unwrap().delay_ms, Some(1000));
    let at = Instant::now();

    until(&mut events, EventKind::WorkerForked).await;
    assert!(at.elapsed() >= Duration::from_millis(1000));
    assert_eq!(spawner.spawned(), 2);

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_window_keeps_dead_record_until_refork() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Crash {
        after: Duration::from_millis(10),
        code: 1,
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), one_slot(), &spawner);

    let seen = until(&mut events, EventKind::RestartScheduled).await;
    let dead = seen.last().unwrap().worker.unwrap();

    // inside the 1s delay the crashed worker is still counted
    let stats = cluster.stats().await.unwrap();
    assert_eq!(stats.total_workers, 1);
    assert_eq!(stats.active_workers, 0);
    assert_eq!(stats.total_restarts, 1);

    let snap = cluster.snapshot().await.unwrap();
    assert_eq!(snap.slots[0].state, SlotState::RestartScheduled);
    assert_eq!(snap.slots[0].worker, Some(dead));

    let forked = until(&mut events, EventKind::WorkerForked).await;
    let fresh = forked.last().unwrap().worker.unwrap();
    assert_ne!(fresh, dead);

    // the replacement took the dead record's place
    let stats = cluster.stats().await.unwrap();
    assert_eq!(stats.total_workers, 1);
    assert_eq!(stats.total_restarts, 1);

    let snap = cluster.snapshot().await.unwrap();
    assert_eq!(snap.slots[0].worker, Some(fresh));
    assert_eq!(snap.slots[0].restart_count, 1);

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_resolves_once_all_workers_exit() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(100),
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), three_slots(), &spawner);
    assert_eq!(cluster.worker_count(), 3);

    let began = Instant::now();
    cluster.shutdown().await.unwrap();
    let took = began.elapsed();

    // slowest worker exits at 300ms
    assert!(took >= Duration::from_millis(300), "resolved early: {took:?}");
    assert!(took <= Duration::from_millis(400), "resolved late: {took:?}");
    assert_eq!(spawner.terminated(), 3);

    let seen = until(&mut events, EventKind::AllStopped).await;
    assert_eq!(count(&seen, EventKind::ShutdownRequested), 1);
    assert_eq!(count(&seen, EventKind::WorkerExited), 3);
    assert_eq!(count(&seen, EventKind::RestartScheduled), 0);
    assert_eq!(spawner.spawned(), 3);

    assert!(matches!(cluster.stats().await, Err(RuntimeError::Closed)));
    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_timeout_kills_stragglers() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Stubborn));
    let cfg = SupervisorConfig {
        shutdown_timeout: Some(Duration::from_secs(2)),
        ..SupervisorConfig::default()
    };
    let (cluster, mut events) = start(cfg, three_slots(), &spawner);

    let began = Instant::now();
    let err = cluster.shutdown().await.unwrap_err();
    let took = began.elapsed();
    assert!(took >= Duration::from_secs(2) && took < Duration::from_millis(2100));

    match err {
        RuntimeError::ShutdownTimeout { timeout, stuck } => {
            assert_eq!(timeout, Duration::from_secs(2));
            assert_eq!(stuck, vec![0, 1, 2]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let seen = until(&mut events, EventKind::ShutdownTimeout).await;
    assert_eq!(count(&seen, EventKind::AllStopped), 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(spawner.terminated(), 3);
}

#[tokio::test(start_paused = true)]
async fn cooperative_shutdown_without_timeout_waits() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Stubborn));
    let cfg = SupervisorConfig {
        shutdown_timeout: None,
        ..SupervisorConfig::default()
    };
    let (cluster, _events) = start(cfg, one_slot(), &spawner);

    let waited = tokio::time::timeout(Duration::from_secs(3600), cluster.shutdown()).await;
    assert!(waited.is_err(), "stubborn worker cannot finish a cooperative shutdown");
    assert_eq!(spawner.terminated(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_skips_pending_restart() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Crash {
        after: Duration::from_millis(10),
        code: 1,
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), one_slot(), &spawner);

    until(&mut events, EventKind::RestartScheduled).await;
    cluster.shutdown().await.unwrap();

    let seen = until(&mut events, EventKind::AllStopped).await;
    assert_eq!(count(&seen, EventKind::RestartSkipped), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(spawner.spawned(), 1);
}

#[tokio::test(start_paused = true)]
async fn on_failure_policy_leaves_clean_exit_stopped() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Crash {
        after: Duration::from_millis(10),
        code: 0,
    }));
    let cfg = SupervisorConfig {
        restart: RestartPolicy::OnFailure,
        ..SupervisorConfig::default()
    };
    let (cluster, mut events) = start(cfg, one_slot(), &spawner);

    let seen = until(&mut events, EventKind::RestartSkipped).await;
    assert_eq!(count(&seen, EventKind::RestartScheduled), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(spawner.spawned(), 1);

    let snap = cluster.snapshot().await.unwrap();
    assert_eq!(snap.slots[0].state, SlotState::Exited);
    assert_eq!(snap.slots[0].restart_count, 0);

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn periodic_stats_are_published() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(1),
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), three_slots(), &spawner);

    let seen = until(&mut events, EventKind::StatsReported).await;
    let stats = seen.last().unwrap().stats.unwrap();
    assert_eq!(stats.total_workers, 3);
    assert_eq!(stats.active_workers, 3);
    assert_eq!(stats.total_restarts, 0);
    assert_eq!(stats.avg_uptime_seconds, 60);

    let snap = cluster.snapshot().await.unwrap();
    assert_eq!(snap.count(SlotState::Online), 3);
    assert!(snap.slots.iter().all(|s| s.pid.is_some()));

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn startup_spawn_failure_is_fatal() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Stubborn).failing_from(1));
    let sup = ClusterSupervisor::new(SupervisorConfig::default())
        .with_profile(three_slots())
        .with_role(Role::Primary)
        .with_spawner(spawner.clone())
        .with_subscribers(Vec::new());

    match sup.start() {
        Err(RuntimeError::Spawn { slot, source }) => {
            assert_eq!(slot, 1);
            assert_eq!(source.as_label(), "spawn_rejected");
        }
        other => panic!("expected spawn failure, got {other:?}"),
    }

    // the worker forked before the failure is killed
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(spawner.spawned(), 1);
    assert_eq!(spawner.terminated(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_spawn_failures_count_against_budget() {
    let spawner = Arc::new(
        FakeSpawner::new(Behavior::Crash {
            after: Duration::from_millis(10),
            code: 1,
        })
        .failing_from(2),
    );
    let (cluster, mut events) = start(SupervisorConfig::default(), one_slot(), &spawner);

    let seen = until(&mut events, EventKind::SlotAbandoned).await;
    assert_eq!(spawner.spawned(), 2);
    assert_eq!(count(&seen, EventKind::SpawnFailed), 4);
    assert_eq!(seen.last().unwrap().restart_count, Some(6));

    cluster.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_shuts_down() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(5),
    }));
    let (cluster, mut events) = start(SupervisorConfig::default(), three_slots(), &spawner);
    let clone = cluster.clone();
    drop(cluster);
    drop(clone);

    let seen = until(&mut events, EventKind::AllStopped).await;
    let requested = seen
        .iter()
        .find(|e| e.kind == EventKind::ShutdownRequested)
        .unwrap();
    assert_eq!(requested.reason.as_deref(), Some("handle dropped"));
    assert_eq!(spawner.terminated(), 3);
}

#[tokio::test(start_paused = true)]
async fn subscribers_are_flushed_before_shutdown_returns() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(5),
    }));
    let collect = Arc::new(Collect::default());
    let sup = ClusterSupervisor::new(SupervisorConfig::default())
        .with_profile(one_slot())
        .with_role(Role::Primary)
        .with_spawner(spawner.clone())
        .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>]);
    let mut events = sup.events();
    let Ok(Launch::Primary(cluster)) = sup.start() else {
        panic!("expected a primary launch");
    };

    until(&mut events, EventKind::WorkerOnline).await;
    cluster.shutdown().await.unwrap();

    let kinds = collect.0.lock().unwrap().clone();
    assert_eq!(
        kinds,
        vec![
            EventKind::WorkerForked,
            EventKind::WorkerOnline,
            EventKind::ShutdownRequested,
            EventKind::WorkerExited,
            EventKind::AllStopped,
        ]
    );
}

#[tokio::test]
async fn launches_carry_configured_base_port() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(1),
    }));
    let cfg = SupervisorConfig {
        base_port: 9100,
        ..SupervisorConfig::default()
    };
    let (cluster, _events) = start(cfg, three_slots(), &spawner);

    let launches = spawner.launches.lock().unwrap().clone();
    for launch in &launches {
        let env = launch.env_pairs();
        assert_eq!(env[2], ("CLUSTERVISOR_BASE_PORT", "9100".to_string()));
    }
    assert_eq!(cluster.worker_config(1).unwrap().port(), 9101);

    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn subscriber_set_runs_on_caller_bus() {
    let bus = Bus::new(8);
    let collect = Arc::new(Collect::default());
    let set = SubscriberSet::new(vec![collect.clone() as Arc<dyn Subscribe>], bus.clone());
    assert_eq!(set.len(), 1);

    set.emit(Event::new(EventKind::WorkerForked));
    set.emit(Event::new(EventKind::AllStopped));
    set.shutdown().await;

    let kinds = collect.0.lock().unwrap().clone();
    assert_eq!(kinds, vec![EventKind::WorkerForked, EventKind::AllStopped]);
}

#[tokio::test]
async fn worker_configs_follow_slot() {
    let spawner = Arc::new(FakeSpawner::new(Behavior::Cooperative {
        per_slot: Duration::from_millis(1),
    }));
    let (cluster, _events) = start(SupervisorConfig::default(), three_slots(), &spawner);

    let launches = spawner.launches.lock().unwrap().clone();
    let slots: Vec<usize> = launches.iter().map(|l| l.identity.worker_id()).collect();
    assert_eq!(slots, vec![0, 1, 2]);
    assert!(launches.iter().all(|l| l.identity.worker_count() == 3));
    assert!(launches.iter().all(|l| l.base_port == 8000));

    let cfg = cluster.worker_config(2).unwrap();
    assert_eq!(cfg.port(), 8002);
    assert_eq!(cfg.max_memory_mb(), 16 * 1024 * 4 / (5 * 3));
    assert!(cluster.worker_config(3).is_none());

    cluster.shutdown().await.unwrap();
}

#[test]
fn worker_role_returns_its_config() {
    let identity = WorkerIdentity::new(1, 3).unwrap();
    let launch = ClusterSupervisor::new(SupervisorConfig::default())
        .with_profile(three_slots())
        .with_role(Role::Worker(identity))
        .start()
        .unwrap();

    let Launch::Worker(cfg) = launch else {
        panic!("expected a worker launch");
    };
    assert_eq!(cfg.worker_id, 1);
    assert_eq!(cfg.worker_count, 3);
    assert!(cfg.is_cluster_mode);
    assert_eq!(cfg.port(), 8001);
    // maximum tier cache 256MB split three ways
    assert_eq!(cfg.cache_share_mb(), 85);
}
