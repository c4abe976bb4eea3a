//! Command handler implementation for the daemon.

use crate::audio::AudioSource;
use crate::daemon::DaemonState;
use crate::error::{Result, StationvoxError};
use crate::export::export_history;
use crate::ipc::protocol::{Command, RecordingStatus, Response};
use crate::ipc::server::CommandHandler;
use crate::recordings::RecordingKey;
use crate::sequencer::{AnnounceRequest, SequencerEvent, SequencerSettings};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Opens the microphone for a new recording.
pub type SourceFactory = Box<dyn Fn() -> Result<Box<dyn AudioSource>> + Send + Sync>;

/// Microphone source for the configured device.
#[cfg(feature = "mic")]
pub fn default_source_factory(device: Option<String>) -> SourceFactory {
    use crate::audio::capture::CpalAudioSource;
    Box::new(move || {
        let source = CpalAudioSource::new(device.as_deref())?;
        Ok(Box::new(source) as Box<dyn AudioSource>)
    })
}

/// Without the `mic` feature every recording attempt fails.
#[cfg(not(feature = "mic"))]
pub fn default_source_factory(_device: Option<String>) -> SourceFactory {
    Box::new(|| {
        Err(StationvoxError::AudioCapture {
            message: "built without microphone support (enable the `mic` feature)".to_string(),
        })
    })
}

/// Command handler for daemon IPC commands.
pub struct DaemonCommandHandler {
    state: Arc<DaemonState>,
    sources: SourceFactory,
}

impl DaemonCommandHandler {
    pub fn new(state: Arc<DaemonState>, sources: SourceFactory) -> Self {
        Self { state, sources }
    }

    fn announce(&self, command: Command) -> Response {
        let Command::Announce {
            train_no,
            train,
            kind,
            extras,
            languages,
            repeat,
        } = command
        else {
            return Response::error("not an announce command");
        };

        let train = match train.or_else(|| self.state.find_train(&train_no).cloned()) {
            Some(train) => train,
            None => return Response::error(format!("Unknown train: {}", train_no)),
        };

        let mut request = match kind {
            Some(kind) => AnnounceRequest::new(train, kind),
            None => AnnounceRequest::auto(train),
        }
        .with_extras(extras);
        if let Some(languages) = languages {
            request = request.with_languages(languages);
        }
        if let Some(repeat) = repeat {
            request = request.with_repeat_count(repeat);
        }

        match self.state.sequencer.announce(request) {
            Some(job_id) => Response::Queued { job_id },
            None => Response::NothingQueued,
        }
    }

    fn status(&self) -> Response {
        let recording = self
            .state
            .studio
            .elapsed()
            .map(|(key, elapsed)| RecordingStatus {
                key,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        Response::Status {
            snapshot: self.state.sequencer.snapshot(),
            recording,
        }
    }

    fn queue(&self) -> Response {
        let snapshot = self.state.sequencer.snapshot();
        let jobs = snapshot.current.into_iter().chain(snapshot.pending).collect();
        Response::Jobs { jobs }
    }

    fn record_start(&self, key: RecordingKey) -> Result<Response> {
        let source = (self.sources)()?;
        self.state.studio.start(key, source)?;
        Ok(Response::Ok)
    }

    fn play_recording(&self, key: RecordingKey) -> Result<Response> {
        let job_id = self.state.sequencer.play_recording(key)?;
        Ok(Response::Queued { job_id })
    }

    async fn dispatch(&self, command: Command) -> Result<Response> {
        let sequencer = &self.state.sequencer;
        let library = self.state.studio.library().clone();

        let response = match command {
            command @ Command::Announce { .. } => self.announce(command),
            Command::Stop => events(sequencer.stop()),
            Command::Skip => events(sequencer.skip()),
            Command::Clear => events(sequencer.clear()),
            Command::Resume => events(sequencer.resume()),
            Command::Status => self.status(),
            Command::Queue => self.queue(),
            Command::History => Response::Jobs {
                jobs: sequencer.snapshot().history,
            },
            Command::ExportHistory { path } => {
                let history = sequencer.snapshot().history;
                Response::Path {
                    path: run_blocking(move || export_history(&history, &path)).await?,
                }
            }
            Command::Follow => Response::error("follow is handled by the server"),
            Command::RecordStart { key } => self.record_start(key)?,
            Command::RecordStop => {
                let state = Arc::clone(&self.state);
                Response::Recording {
                    info: run_blocking(move || state.studio.stop()).await?,
                }
            }
            Command::RecordCancel => {
                self.state.studio.cancel()?;
                Response::Ok
            }
            Command::ListRecordings => Response::Recordings {
                recordings: library.list(),
            },
            Command::DeleteRecording { key } => {
                library.remove(&key)?;
                Response::Ok
            }
            Command::ExportRecording { key, dir } => Response::Path {
                path: run_blocking(move || library.export_wav(&key, &dir)).await?,
            },
            Command::ImportRecording { key, path } => Response::Recording {
                info: run_blocking(move || library.import_wav(key, &path)).await?,
            },
            Command::PlayRecording { key } => self.play_recording(key)?,
            Command::SetLanguages { languages } => settings(sequencer.set_languages(languages)),
            Command::SetVolume { volume } => settings(sequencer.set_volume(volume)?),
            Command::SetRepeat { repeat } => settings(sequencer.set_repeat_count(repeat)?),
            Command::ListTrains => Response::Trains {
                trains: self.state.trains.clone(),
            },
            Command::Shutdown => {
                self.state.shutdown.cancel();
                Response::Ok
            }
        };
        Ok(response)
    }
}

/// Run file I/O and capture-thread joins on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StationvoxError::Other(format!("blocking task failed: {}", e)))?
}

fn events(events: Vec<SequencerEvent>) -> Response {
    Response::Events { events }
}

fn settings(settings: SequencerSettings) -> Response {
    Response::Settings { settings }
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        self.dispatch(command).await.unwrap_or_else(|e| {
            tracing::warn!("command failed: {}", e);
            Response::error(e)
        })
    }

    fn events(&self) -> Option<broadcast::Receiver<SequencerEvent>> {
        Some(self.state.sequencer.subscribe())
    }
}
