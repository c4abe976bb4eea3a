//! Async Unix socket IPC server for daemon control.

use crate::error::{Result, StationvoxError};
use crate::ipc::protocol::{Command, Response};
use crate::sequencer::SequencerEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, broadcast};

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;

    /// Event feed for `follow` connections. `None` rejects `follow`.
    fn events(&self) -> Option<broadcast::Receiver<SequencerEvent>> {
        None
    }
}

/// State for managing server shutdown.
#[derive(Debug, Clone)]
struct ServerState {
    shutdown: Arc<Mutex<bool>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Mutex::new(false)),
        }
    }

    async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    async fn set_shutdown(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// IPC server for handling daemon control commands via Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    state: ServerState,
}

impl IpcServer {
    /// Create a new IPC server bound to the specified socket path.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        Ok(Self {
            socket_path,
            state: ServerState::new(),
        })
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("stationvox.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/stationvox-{}.sock", uid))
        }
    }

    /// Start the IPC server and handle incoming connections.
    pub async fn start<H>(&self, handler: Arc<H>) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        // A stale socket from a crashed daemon blocks bind.
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| StationvoxError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| StationvoxError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;
        tracing::debug!(path = %self.socket_path.display(), "IPC server bound");

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with a timeout so the shutdown flag is rechecked.
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            tracing::warn!("Error handling client: {}", e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(StationvoxError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }

    /// Stop the IPC server and clean up the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.state.set_shutdown().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| StationvoxError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler + ?Sized,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader
        .read_line(&mut line)
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    let command = match Command::from_json(line.trim()) {
        Ok(command) => command,
        Err(e) => {
            let response = Response::error(format!("Failed to parse command: {}", e));
            write_response(&mut writer, &response).await?;
            return Err(StationvoxError::IpcProtocol {
                message: format!("Failed to parse command: {}", e),
            });
        }
    };
    tracing::debug!(?command, "IPC command");

    if command == Command::Follow {
        return stream_events(&mut writer, handler.events()).await;
    }

    let response = handler.handle(command).await;
    write_response(&mut writer, &response).await
}

/// Acknowledge `follow`, then forward events until the client goes away.
async fn stream_events<W>(
    writer: &mut W,
    events: Option<broadcast::Receiver<SequencerEvent>>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(mut events) = events else {
        return write_response(writer, &Response::error("Event streaming unavailable")).await;
    };

    write_response(writer, &Response::Ok).await?;
    loop {
        match events.recv().await {
            Ok(event) => {
                if write_response(writer, &Response::Event { event }).await.is_err() {
                    // Client disconnected.
                    return Ok(());
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "follow client lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut json = response.to_json().map_err(|e| StationvoxError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;
    json.push('\n');

    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| StationvoxError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::JobId;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct MockCommandHandler {
        events: broadcast::Sender<SequencerEvent>,
    }

    impl MockCommandHandler {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self { events })
        }
    }

    #[async_trait::async_trait]
    impl CommandHandler for MockCommandHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Announce { .. } => Response::Queued { job_id: JobId(1) },
                Command::Stop => {
                    let _ = self.events.send(SequencerEvent::Idle);
                    Response::Ok
                }
                Command::Shutdown => Response::Ok,
                other => Response::error(format!("unsupported: {:?}", other)),
            }
        }

        fn events(&self) -> Option<broadcast::Receiver<SequencerEvent>> {
            Some(self.events.subscribe())
        }
    }

    struct NoEventsHandler;

    #[async_trait::async_trait]
    impl CommandHandler for NoEventsHandler {
        async fn handle(&self, _command: Command) -> Response {
            Response::Ok
        }
    }

    async fn start_server<H: CommandHandler + 'static>(
        handler: Arc<H>,
    ) -> (TempDir, PathBuf, tokio::task::JoinHandle<Result<()>>) {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");
        let server_socket_path = socket_path.clone();
        let handle = tokio::spawn(async move {
            let server = IpcServer::new(server_socket_path).unwrap();
            server.start(handler).await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        (temp_dir, socket_path, handle)
    }

    async fn roundtrip(socket_path: &Path, request: &str) -> String {
        let mut stream = UnixStream::connect(socket_path).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response_data = Vec::new();
        stream.read_to_end(&mut response_data).await.unwrap();
        String::from_utf8(response_data).unwrap()
    }

    #[test]
    fn test_default_socket_path_returns_valid_path() {
        let path = IpcServer::default_socket_path();
        let path_str = path.to_string_lossy();
        if std::env::var("XDG_RUNTIME_DIR").is_ok() {
            assert!(
                path_str.ends_with("stationvox.sock"),
                "With XDG_RUNTIME_DIR, expected path ending with stationvox.sock, got: {:?}",
                path
            );
        } else {
            let uid = unsafe { libc::getuid() };
            assert_eq!(path_str, format!("/tmp/stationvox-{}.sock", uid));
        }
    }

    #[tokio::test]
    async fn test_server_binds_to_socket() {
        let (_dir, socket_path, handle) = start_server(MockCommandHandler::new()).await;
        assert!(socket_path.exists());
        handle.abort();
    }

    #[tokio::test]
    async fn test_server_replaces_stale_socket_file() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("stale.sock");
        std::fs::write(&socket_path, b"").unwrap();

        let server_socket_path = socket_path.clone();
        let handle = tokio::spawn(async move {
            let server = IpcServer::new(server_socket_path).unwrap();
            server.start(MockCommandHandler::new()).await
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let response = roundtrip(&socket_path, "{\"type\":\"shutdown\"}\n").await;
        assert_eq!(Response::from_json(response.trim()).unwrap(), Response::Ok);
        handle.abort();
    }

    #[tokio::test]
    async fn test_client_can_send_command_and_receive_response() {
        let (_dir, socket_path, handle) = start_server(MockCommandHandler::new()).await;

        let request = format!("{}\n", Command::announce("12345").to_json().unwrap());
        let response = roundtrip(&socket_path, &request).await;

        assert_eq!(
            Response::from_json(response.trim()).unwrap(),
            Response::Queued { job_id: JobId(1) }
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_multiple_concurrent_clients() {
        let (_dir, socket_path, handle) = start_server(MockCommandHandler::new()).await;

        let mut client_handles = vec![];
        for i in 0..5 {
            let socket_path = socket_path.clone();
            client_handles.push(tokio::spawn(async move {
                let command = if i % 2 == 0 {
                    Command::announce("12345")
                } else {
                    Command::Shutdown
                };
                let request = format!("{}\n", command.to_json().unwrap());
                Response::from_json(roundtrip(&socket_path, &request).await.trim()).unwrap()
            }));
        }

        for client in client_handles {
            let response = client.await.unwrap();
            assert!(matches!(response, Response::Queued { .. } | Response::Ok));
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_server_answers_invalid_json_with_error() {
        let (_dir, socket_path, handle) = start_server(MockCommandHandler::new()).await;

        let response = roundtrip(&socket_path, "not valid json\n").await;
        match Response::from_json(response.trim()).unwrap() {
            Response::Error { message } => assert!(message.contains("Failed to parse command")),
            other => panic!("Expected Error response, got {:?}", other),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_follow_streams_events() {
        let handler = MockCommandHandler::new();
        let (_dir, socket_path, handle) = start_server(Arc::clone(&handler)).await;

        let stream = UnixStream::connect(&socket_path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"{\"type\":\"follow\"}\n").await.unwrap();
        let mut lines = BufReader::new(reader).lines();

        let ack = lines.next_line().await.unwrap().unwrap();
        assert_eq!(Response::from_json(&ack).unwrap(), Response::Ok);

        let request = format!("{}\n", Command::Stop.to_json().unwrap());
        roundtrip(&socket_path, &request).await;

        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            Response::from_json(&line).unwrap(),
            Response::Event {
                event: SequencerEvent::Idle
            }
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_follow_rejected_without_event_feed() {
        let (_dir, socket_path, handle) = start_server(Arc::new(NoEventsHandler)).await;

        let response = roundtrip(&socket_path, "{\"type\":\"follow\"}\n").await;
        assert!(matches!(
            Response::from_json(response.trim()).unwrap(),
            Response::Error { .. }
        ));
        handle.abort();
    }

    #[tokio::test]
    async fn test_stop_removes_socket_and_ends_accept_loop() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");
        let server = Arc::new(IpcServer::new(socket_path.clone()).unwrap());

        let running = Arc::clone(&server);
        let handle =
            tokio::spawn(async move { running.start(MockCommandHandler::new()).await });
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert!(socket_path.exists());

        server.stop().await.unwrap();
        assert!(!socket_path.exists());

        let result = tokio::time::timeout(tokio::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
