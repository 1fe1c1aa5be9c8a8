//! clustervisor - resource-tiered worker supervisor

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{Level, info};

use clustervisor::logging::{self, LOG_FILTER_VAR, LOG_FORMAT_VAR, LogConfig, LogFormat};
use clustervisor::{
    BackoffPolicy, ClusterSupervisor, CommandSpawner, LoadBalancerConfig, Launch, ProcessMetrics,
    RestartPolicy, Role, SupervisorConfig, WorkerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "clustervisor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Program run for every worker (default: this binary in worker mode)
    #[arg(long, env = "CLUSTERVISOR_WORKER_CMD")]
    worker_cmd: Option<PathBuf>,

    /// Arguments for the worker program
    #[arg(last = true)]
    worker_args: Vec<String>,

    /// Restarts allowed per slot before it is abandoned
    #[arg(long, env = "CLUSTERVISOR_MAX_RESTARTS", default_value_t = 5)]
    max_restarts: u32,

    /// Delay before a crashed worker is replaced (ms)
    #[arg(long, default_value_t = 1000)]
    restart_delay_ms: u64,

    /// Which exits are restarted
    #[arg(long, value_enum, default_value_t = RestartArg::Always)]
    restart: RestartArg,

    /// Period of the stats log line (s, 0 = off)
    #[arg(long, default_value_t = 60)]
    stats_interval: u64,

    /// Graceful shutdown bound before workers are killed (s, 0 = wait forever)
    #[arg(long, env = "CLUSTERVISOR_SHUTDOWN_TIMEOUT", default_value_t = 30)]
    shutdown_timeout: u64,

    /// Port of worker 0; worker i listens on base + i
    #[arg(long, env = "CLUSTERVISOR_BASE_PORT", default_value_t = clustervisor::DEFAULT_BASE_PORT)]
    base_port: u16,

    /// Log output format: pretty, compact, json
    #[arg(long, env = "CLUSTERVISOR_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the host profile and derived configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RestartArg {
    Always,
    OnFailure,
    Never,
}

impl From<RestartArg> for RestartPolicy {
    fn from(arg: RestartArg) -> Self {
        match arg {
            RestartArg::Always => RestartPolicy::Always,
            RestartArg::OnFailure => RestartPolicy::OnFailure,
            RestartArg::Never => RestartPolicy::Never,
        }
    }
}

impl Cli {
    fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            max_restarts: self.max_restarts,
            restart_backoff: BackoffPolicy::fixed(Duration::from_millis(self.restart_delay_ms)),
            restart: self.restart.into(),
            stats_interval: Duration::from_secs(self.stats_interval),
            shutdown_timeout: match self.shutdown_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            base_port: self.base_port,
            ..SupervisorConfig::default()
        }
    }

    fn log_config(&self) -> LogConfig {
        let level = match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let mut cfg = LogConfig::default()
            .with_level(level)
            .with_format(self.log_format);
        if self.verbose > 0 {
            cfg = cfg.with_filter(level.as_str().to_lowercase());
        }
        cfg.with_env_overrides()
    }

    /// Worker command carrying this process's log settings.
    fn worker_spawner(&self) -> Result<CommandSpawner> {
        let spawner = match &self.worker_cmd {
            Some(program) => CommandSpawner::new(program).args(&self.worker_args),
            None => CommandSpawner::current_exe().context("cannot locate own executable")?,
        };
        let log = self.log_config();
        let spawner = spawner.env(LOG_FORMAT_VAR, log.format.to_string());
        Ok(match log.filter {
            Some(filter) => spawner.env(LOG_FILTER_VAR, filter),
            None => spawner,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_config());

    if cli.print_config {
        return print_config();
    }

    let role = Role::from_env().context("invalid worker environment")?;
    let mut supervisor = ClusterSupervisor::new(cli.supervisor_config());
    if matches!(role, Role::Primary) {
        supervisor = supervisor.with_spawner(Arc::new(cli.worker_spawner()?));
    }
    let supervisor = supervisor.with_role(role);

    match supervisor.start().context("failed to start")? {
        Launch::Primary(cluster) => {
            let profile = cluster.profile();
            info!(
                workers = cluster.worker_count(),
                tier = %profile.tier,
                total_memory_mb = profile.total_memory_mb,
                cpus = profile.cpu_count,
                "cluster started"
            );
            cluster.run_until_signal().await?;
            info!("cluster stopped");
        }
        Launch::Worker(cfg) => run_worker(cfg).await?,
    }
    Ok(())
}

/// Built-in worker: publishes its configuration and idles until told to stop.
async fn run_worker(cfg: WorkerConfig) -> Result<()> {
    println!("{}", serde_json::to_string(&cfg)?);

    if let Some(m) = ProcessMetrics::sample() {
        info!(
            worker = cfg.worker_id,
            port = cfg.port(),
            max_memory_mb = cfg.max_memory_mb(),
            rss_mb = m.rss_mb,
            "worker ready"
        );
    }

    let cause = clustervisor::wait_for_shutdown_stdin()
        .await
        .context("control channel failed")?;
    info!(worker = cfg.worker_id, ?cause, "worker stopping");
    Ok(())
}

fn print_config() -> Result<()> {
    let profile = clustervisor::profile()?;
    let derived = clustervisor::derive(&profile);
    let out = serde_json::json!({
        "profile": profile,
        "workerCount": clustervisor::worker_count(&profile),
        "derived": derived,
        "loadBalancer": LoadBalancerConfig::default(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
