//! Running an external playback tool until it exits or is cancelled.

use crate::error::{Result, StationvoxError};
use crate::playback::CancelToken;
use std::process::Stdio;
use tokio::process::Command;

/// How a finished tool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Finished,
    Cancelled,
}

/// Spawn `command args...` and wait for it, killing it on cancellation.
///
/// `on_failure` builds the error for a non-zero exit or a spawn failure
/// other than a missing binary.
pub(crate) async fn run_tool(
    command: &str,
    args: &[String],
    cancel: &CancelToken,
    on_failure: fn(String) -> StationvoxError,
) -> Result<RunOutcome> {
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StationvoxError::PlaybackToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                on_failure(format!("Failed to execute {}: {}", command, e))
            }
        })?;

    let status = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    match status {
        Some(Ok(status)) if status.success() => Ok(RunOutcome::Finished),
        Some(Ok(status)) => Err(on_failure(format!(
            "{} failed with status {}",
            command, status
        ))),
        Some(Err(e)) => Err(on_failure(format!("Failed to wait for {}: {}", command, e))),
        None => {
            if let Err(e) = child.kill().await {
                tracing::debug!("{} already exited before kill: {}", command, e);
            }
            Ok(RunOutcome::Cancelled)
        }
    }
}
