//! JSON message protocol for IPC communication between CLI and daemon.
//!
//! One command per line from the client, one response per line from the
//! daemon. `follow` keeps the connection open and streams `event` responses.

use crate::announce::{AnnouncementJob, AnnouncementKind, JobId, Language, TemplateExtras};
use crate::recordings::{RecordingInfo, RecordingKey};
use crate::sequencer::{SequencerEvent, SequencerSettings, SequencerSnapshot};
use crate::train::Train;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Commands sent by CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Queue an announcement for a train
    Announce {
        /// Seed train to announce; ignored when `train` is given
        train_no: String,
        /// Ad hoc train record
        #[serde(default, skip_serializing_if = "Option::is_none")]
        train: Option<Train>,
        /// Defaults to the train's auto kind
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<AnnouncementKind>,
        #[serde(default)]
        extras: TemplateExtras,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        languages: Option<Vec<Language>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat: Option<u32>,
    },
    /// Stop the current announcement
    Stop,
    /// Skip the current cycle
    Skip,
    /// Stop and drop every queued announcement
    Clear,
    /// Restart playback of retained jobs
    Resume,
    /// Get sequencer and recorder status
    Status,
    /// List the current and pending jobs
    Queue,
    /// List finished jobs, newest first
    History,
    /// Write the history as JSON
    ExportHistory { path: PathBuf },
    /// Stream sequencer events until the client disconnects
    Follow,
    /// Start recording a clip from the microphone
    RecordStart { key: RecordingKey },
    /// Stop recording and store the clip
    RecordStop,
    /// Discard the running recording
    RecordCancel,
    /// List stored clips
    ListRecordings,
    /// Delete a stored clip
    DeleteRecording { key: RecordingKey },
    /// Write a stored clip as WAV into `dir`
    ExportRecording { key: RecordingKey, dir: PathBuf },
    /// Load a WAV file as the clip for `key`
    ImportRecording { key: RecordingKey, path: PathBuf },
    /// Queue a job that plays a stored clip
    PlayRecording { key: RecordingKey },
    /// Select the languages new jobs are rendered in
    SetLanguages { languages: Vec<Language> },
    /// Set the playback volume (0-100)
    SetVolume { volume: u8 },
    /// Set how many cycles new jobs play
    SetRepeat { repeat: u32 },
    /// List the trains on the board
    ListTrains,
    /// Shutdown the daemon
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Announce a seed train with default kind and settings.
    pub fn announce(train_no: &str) -> Self {
        Command::Announce {
            train_no: train_no.to_string(),
            train: None,
            kind: None,
            extras: TemplateExtras::default(),
            languages: None,
            repeat: None,
        }
    }
}

/// Running recording as reported by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStatus {
    pub key: RecordingKey,
    pub elapsed_ms: u64,
}

/// Responses sent by daemon to CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded
    Ok,
    /// An announcement was queued
    Queued { job_id: JobId },
    /// Nothing was queued because no text could be rendered
    NothingQueued,
    /// Current daemon status
    Status {
        snapshot: SequencerSnapshot,
        recording: Option<RecordingStatus>,
    },
    /// Jobs from `queue` or `history`
    Jobs { jobs: Vec<AnnouncementJob> },
    /// Events produced by a control command
    Events { events: Vec<SequencerEvent> },
    /// Stored clips
    Recordings { recordings: Vec<RecordingInfo> },
    /// A clip that was stored or imported
    Recording { info: RecordingInfo },
    /// Trains on the board
    Trains { trains: Vec<Train> },
    /// Settings after a change
    Settings { settings: SequencerSettings },
    /// A file that was written
    Path { path: PathBuf },
    /// One streamed sequencer event
    Event { event: SequencerEvent },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Response::Error {
            message: message.to_string(),
        }
    }
}
