//! IPC client for sending commands to the daemon.

use crate::error::{Result, StationvoxError};
use crate::ipc::protocol::{Command, Response};
use crate::sequencer::SequencerEvent;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::OwnedReadHalf;

/// Connect, send `command` and return the reader for the daemon's replies.
async fn open(socket_path: &Path, command: &Command) -> Result<Lines<BufReader<OwnedReadHalf>>> {
    let stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|e| StationvoxError::IpcConnection {
                message: format!("Failed to connect to daemon: {}", e),
            })?;

    let (reader, mut writer) = stream.into_split();

    let mut command_json = command.to_json().map_err(|e| StationvoxError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;
    command_json.push('\n');

    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(BufReader::new(reader).lines())
}

async fn next_response(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Result<Option<Response>> {
    let line = lines
        .next_line()
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    let Some(line) = line else {
        return Ok(None);
    };

    Response::from_json(line.trim())
        .map(Some)
        .map_err(|e| StationvoxError::IpcProtocol {
            message: format!("Failed to deserialize response: {}", e),
        })
}

/// Send a command to the daemon via Unix socket.
///
/// # Errors
/// Returns `StationvoxError::IpcConnection` if connection fails or the daemon
/// closes the connection without answering.
/// Returns `StationvoxError::IpcProtocol` if serialization/deserialization fails
pub async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let mut lines = open(socket_path, &command).await?;
    next_response(&mut lines)
        .await?
        .ok_or_else(|| StationvoxError::IpcConnection {
            message: "Daemon closed the connection without a response".to_string(),
        })
}

/// Stream sequencer events from the daemon.
///
/// Calls `on_event` for every event until it returns `false` or the daemon
/// closes the connection.
pub async fn follow<F>(socket_path: &Path, mut on_event: F) -> Result<()>
where
    F: FnMut(SequencerEvent) -> bool,
{
    let mut lines = open(socket_path, &Command::Follow).await?;

    match next_response(&mut lines).await? {
        Some(Response::Ok) => {}
        Some(Response::Error { message }) => {
            return Err(StationvoxError::IpcProtocol { message });
        }
        Some(other) => {
            return Err(StationvoxError::IpcProtocol {
                message: format!("Unexpected follow acknowledgement: {:?}", other),
            });
        }
        None => return Ok(()),
    }

    while let Some(response) = next_response(&mut lines).await? {
        match response {
            Response::Event { event } => {
                if !on_event(event) {
                    break;
                }
            }
            other => tracing::debug!(?other, "ignoring non-event response while following"),
        }
    }
    Ok(())
}
