//! # Worker end of the control channel.
//!
//! The supervisor writes a single `shutdown` line to the worker's stdin. The
//! worker treats EOF the same way: the primary is gone and nobody will restart it.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::process::SHUTDOWN_MESSAGE;

/// Why [`wait_for_shutdown`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The supervisor sent `shutdown`.
    Requested,
    /// The control channel closed.
    ParentGone,
}

/// Reads control lines until `shutdown` or EOF. Other lines are ignored.
pub async fn wait_for_shutdown<R>(reader: R) -> io::Result<ShutdownCause>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == SHUTDOWN_MESSAGE {
            return Ok(ShutdownCause::Requested);
        }
    }
    Ok(ShutdownCause::ParentGone)
}

/// [`wait_for_shutdown`] on the process's stdin.
pub async fn wait_for_shutdown_stdin() -> io::Result<ShutdownCause> {
    wait_for_shutdown(BufReader::new(tokio::io::stdin())).await
}
