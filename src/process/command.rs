//! # Program-backed spawner.
//!
//! [`CommandSpawner`] starts each worker as a separate OS process through
//! `tokio::process`. The worker's identity and base port are passed in its
//! environment (`WORKER_ID`, `WORKER_COUNT`, `CLUSTERVISOR_BASE_PORT`); the
//! control channel is the child's stdin.
//! stdout and stderr are inherited.
//!
//! ## Monitor loop (one task per child)
//! ```text
//! reporter.online(pid)
//! loop {
//!   ├─ child exits          ─► reporter.exited(reason), done
//!   ├─ Signal::Shutdown     ─► write "shutdown\n" to stdin
//!   ├─ Signal::Kill         ─► start_kill()
//!   └─ supervisor cancelled ─► start_kill(), keep waiting for exit
//! }
//! ```

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SpawnError;
use crate::process::{
    ChildHandle, ChildReporter, SHUTDOWN_MESSAGE, Signal, Spawner, TerminationReason, WorkerLaunch,
};

/// Spawns workers by running a program.
#[derive(Clone, Debug)]
pub struct CommandSpawner {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl CommandSpawner {
    /// Runs `program` for every worker.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Runs the current executable for every worker.
    ///
    /// The usual setup: one binary branching on role (see [`Role::from_env`](crate::Role::from_env)).
    pub fn current_exe() -> Result<Self, SpawnError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Appends an argument passed to every worker.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Appends arguments passed to every worker.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    /// Adds an environment variable set for every worker.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, launch: &WorkerLaunch) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .envs(launch.env_pairs())
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl Spawner for CommandSpawner {
    fn spawn(
        &self,
        launch: WorkerLaunch,
        reporter: ChildReporter,
        token: CancellationToken,
    ) -> Result<ChildHandle, SpawnError> {
        let child = self.command(&launch).spawn()?;
        let (handle, control) = ChildHandle::channel(child.id());
        tokio::spawn(monitor(child, control, reporter, token));
        Ok(handle)
    }
}

enum Step {
    Exited(io::Result<ExitStatus>),
    Control(Option<Signal>),
    Cancelled,
}

async fn monitor(
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<Signal>,
    reporter: ChildReporter,
    token: CancellationToken,
) {
    reporter.online(child.id());

    let mut stdin = child.stdin.take();
    let mut control_open = true;
    let mut killing = false;

    let reason = loop {
        let step = tokio::select! {
            status = child.wait() => Step::Exited(status),
            sig = control.recv(), if control_open => Step::Control(sig),
            _ = token.cancelled(), if !killing => Step::Cancelled,
        };

        match step {
            Step::Exited(Ok(status)) => break TerminationReason::from(status),
            Step::Exited(Err(_)) => break TerminationReason::Unknown,
            Step::Control(Some(Signal::Shutdown)) => {
                if let Some(pipe) = stdin.as_mut() {
                    if send_shutdown(pipe).await.is_err() {
                        // child closed its end; nothing more to say to it
                        stdin = None;
                    }
                }
            }
            Step::Control(Some(Signal::Kill)) | Step::Cancelled => {
                killing = true;
                let _ = child.start_kill();
            }
            Step::Control(None) => control_open = false,
        }
    };

    reporter.exited(reason);
}

async fn send_shutdown(pipe: &mut ChildStdin) -> io::Result<()> {
    pipe.write_all(SHUTDOWN_MESSAGE.as_bytes()).await?;
    pipe.write_all(b"\n").await?;
    pipe.flush().await
}
