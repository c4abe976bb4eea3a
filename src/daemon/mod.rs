//! Daemon mode for stationvox: owns one sequencer and serves IPC commands.

pub mod handler;

use crate::announce::TemplateTable;
use crate::config::Config;
use crate::error::{Result, StationvoxError};
use crate::ipc::server::IpcServer;
use crate::playback::{
    AudioPlayer, CancelToken, CommandAudioPlayer, CommandSpeechEngine, SpeechEngine,
};
use crate::recordings::{RecordingLibrary, RecordingStudio};
use crate::sequencer::{Sequencer, SequencerOptions};
use crate::train::{Train, seed_trains};
use std::path::PathBuf;
use std::sync::Arc;

/// Daemon state: the sequencer, the recording studio and the train board.
pub struct DaemonState {
    pub sequencer: Sequencer,
    pub studio: RecordingStudio,
    pub trains: Vec<Train>,
    /// Fired by the `shutdown` command.
    pub shutdown: CancelToken,
}

impl DaemonState {
    /// Build the state and start the sequencer's driver task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: Config,
        speech: Arc<dyn SpeechEngine>,
        player: Arc<dyn AudioPlayer>,
    ) -> Result<Self> {
        let templates = match &config.templates.path {
            Some(path) => TemplateTable::load_with_overrides(path)?,
            None => TemplateTable::builtin(),
        };
        let library = RecordingLibrary::new();

        let options = SequencerOptions {
            settings: config.playback.to_settings(),
            templates,
            recordings: library.clone(),
            history_capacity: config.playback.history_capacity,
        };

        Ok(Self {
            sequencer: Sequencer::spawn(options, speech, player),
            studio: RecordingStudio::new(library),
            trains: seed_trains(),
            shutdown: CancelToken::new(),
        })
    }

    /// Train on the board with the given number.
    pub fn find_train(&self, train_no: &str) -> Option<&Train> {
        self.trains.iter().find(|t| t.train_no == train_no)
    }
}

/// Socket path from the flag, the config file or the runtime directory.
pub fn resolve_socket_path(config: &Config, socket_path: Option<PathBuf>) -> PathBuf {
    socket_path
        .or_else(|| config.daemon.socket.clone())
        .unwrap_or_else(IpcServer::default_socket_path)
}

/// Run the daemon: start the sequencer and IPC server, wait for shutdown.
///
/// Shutdown comes from SIGINT, SIGTERM or the `shutdown` command.
pub async fn run_daemon(config: Config, socket_path: Option<PathBuf>) -> Result<()> {
    let speech: Arc<dyn SpeechEngine> = Arc::new(CommandSpeechEngine::from_config(&config.speech)?);
    let player: Arc<dyn AudioPlayer> = Arc::new(CommandAudioPlayer::new(config.player.command.clone()));
    tracing::info!(
        speech = speech.name(),
        player = player.name(),
        "playback engines ready"
    );

    let socket_path = resolve_socket_path(&config, socket_path);
    let sources = handler::default_source_factory(config.recording.device.clone());
    let state = Arc::new(DaemonState::new(config, speech, player)?);

    let server = Arc::new(IpcServer::new(socket_path)?);
    tracing::info!(path = %server.socket_path().display(), "IPC server listening");

    let handler = Arc::new(handler::DaemonCommandHandler::new(Arc::clone(&state), sources));

    let server_clone = Arc::clone(&server);
    let server_handle = tokio::spawn(async move { server_clone.start(handler).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                tracing::error!("Error setting up signal handler: {}", e);
            }
            tracing::info!("received SIGTERM, shutting down");
        }
        _ = state.shutdown.cancelled() => {
            tracing::info!("shutdown requested over IPC");
        }
    }

    if state.studio.is_recording()
        && let Err(e) = state.studio.cancel()
    {
        tracing::warn!("failed to cancel recording: {}", e);
    }
    state.sequencer.shutdown().await;
    server.stop().await?;

    match server_handle.await {
        Ok(Err(e)) => tracing::error!("daemon server task failed: {}", e),
        Err(e) => tracing::error!("daemon server task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    tracing::info!("daemon stopped");
    Ok(())
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        StationvoxError::Other(format!("Failed to register SIGTERM handler: {}", e))
    })?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await
}
