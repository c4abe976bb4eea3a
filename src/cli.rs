//! Command-line interface for stationvox
//!
//! Provides argument parsing using clap derive macros.

use crate::announce::{AnnouncementKind, Language, TemplateExtras};
use crate::ipc::protocol::Command;
use crate::recordings::RecordingKey;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Multilingual railway station announcements
#[derive(Parser, Debug)]
#[command(
    name = "stationvox",
    version,
    about = "Multilingual railway station announcements"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to Unix socket (default: $XDG_RUNTIME_DIR/stationvox.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a pause length into milliseconds.
///
/// Bare numbers are milliseconds; anything else goes through `humantime`
/// (`500ms`, `1s`, `1s 500ms`).
fn parse_pause_ms(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(ms);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the announcement daemon (foreground process for systemd)
    Daemon {
        /// Pause after each language (e.g. 500ms, 1s)
        #[arg(long, value_name = "DURATION", value_parser = parse_pause_ms)]
        pause: Option<u64>,

        /// Pause after the last language of a cycle
        #[arg(long, value_name = "DURATION", value_parser = parse_pause_ms)]
        settle: Option<u64>,

        /// Languages to announce in, in order (comma-separated)
        #[arg(long, value_name = "LANGS", value_delimiter = ',')]
        languages: Option<Vec<Language>>,

        /// Playback volume (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,

        /// Cycles per announcement
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: Option<u32>,
    },

    /// Queue an announcement for a train on the board
    Announce {
        /// Train number (see `stationvox trains`)
        train_no: String,

        /// Announcement type (arrival, arrived, departure, platform-change,
        /// late, cancelled, diverted, other); defaults to the train's direction
        #[arg(long, short = 'k')]
        kind: Option<AnnouncementKind>,

        /// Languages for this announcement only (comma-separated)
        #[arg(long, value_name = "LANGS", value_delimiter = ',')]
        languages: Option<Vec<Language>>,

        /// Cycles for this announcement only
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: Option<u32>,

        /// Delay in minutes, overriding the train's own delay
        #[arg(long, value_name = "MINUTES")]
        delay: Option<u32>,

        /// Previous platform for platform changes
        #[arg(long, value_name = "PF")]
        old_platform: Option<String>,

        /// New platform for platform changes (default: the train's platform)
        #[arg(long, value_name = "PF")]
        new_platform: Option<String>,

        /// Diversion route, or the text of a special announcement
        #[arg(long)]
        route: Option<String>,
    },

    /// Stop the current announcement
    Stop,

    /// Skip the current cycle
    Skip,

    /// Stop and drop every queued announcement
    Clear,

    /// Resume playback of queued announcements after a stop
    Resume,

    /// Show sequencer status
    Status,

    /// List the current and pending announcements
    Queue,

    /// List finished announcements, newest first
    History,

    /// Export the announcement history as JSON
    Export {
        /// Output file or directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Follow sequencer events
    Follow,

    /// List the trains on the board
    Trains,

    /// Record and manage announcement clips
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Change playback settings
    Set {
        #[command(subcommand)]
        action: SetAction,
    },

    /// List available audio input devices
    #[cfg(feature = "mic")]
    Devices,

    /// Shutdown the daemon
    Shutdown,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Recording studio actions. Keys look like `arrival_hindi`.
#[derive(Subcommand, Debug)]
pub enum RecordAction {
    /// Start recording from the microphone
    Start { key: RecordingKey },
    /// Stop recording and store the clip
    Stop,
    /// Discard the running recording
    Cancel,
    /// List stored clips
    List,
    /// Delete a stored clip
    Delete { key: RecordingKey },
    /// Write a stored clip as WAV
    Export {
        key: RecordingKey,
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Use a WAV file as the clip for a key
    Import { key: RecordingKey, path: PathBuf },
    /// Queue a stored clip for playback
    Play { key: RecordingKey },
}

/// Playback settings actions
#[derive(Subcommand, Debug)]
pub enum SetAction {
    /// Languages for new announcements, in order (comma-separated; none to mute)
    Languages {
        #[arg(value_delimiter = ',')]
        languages: Vec<Language>,
    },
    /// Playback volume (0-100)
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: u8,
    },
    /// Cycles per announcement
    Repeat {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value by key (e.g., playback.volume)
    Get {
        /// Dotted key path (e.g., playback.volume, speech.command)
        key: String,
    },
    /// Print the effective configuration as TOML
    Dump,
}

impl Commands {
    /// The daemon command a client subcommand sends, if any.
    pub fn to_ipc(&self) -> Option<Command> {
        let command = match self {
            Commands::Announce {
                train_no,
                kind,
                languages,
                repeat,
                delay,
                old_platform,
                new_platform,
                route,
            } => Command::Announce {
                train_no: train_no.clone(),
                train: None,
                kind: *kind,
                extras: TemplateExtras {
                    delay: *delay,
                    old_platform: old_platform.clone(),
                    new_platform: new_platform.clone(),
                    route: route.clone(),
                },
                languages: languages.clone(),
                repeat: *repeat,
            },
            Commands::Stop => Command::Stop,
            Commands::Skip => Command::Skip,
            Commands::Clear => Command::Clear,
            Commands::Resume => Command::Resume,
            Commands::Status => Command::Status,
            Commands::Queue => Command::Queue,
            Commands::History => Command::History,
            Commands::Export { path } => Command::ExportHistory {
                path: absolute(path),
            },
            Commands::Follow => Command::Follow,
            Commands::Trains => Command::ListTrains,
            Commands::Shutdown => Command::Shutdown,
            Commands::Record { action } => match action {
                RecordAction::Start { key } => Command::RecordStart { key: *key },
                RecordAction::Stop => Command::RecordStop,
                RecordAction::Cancel => Command::RecordCancel,
                RecordAction::List => Command::ListRecordings,
                RecordAction::Delete { key } => Command::DeleteRecording { key: *key },
                RecordAction::Export { key, dir } => Command::ExportRecording {
                    key: *key,
                    dir: absolute(dir),
                },
                RecordAction::Import { key, path } => Command::ImportRecording {
                    key: *key,
                    path: absolute(path),
                },
                RecordAction::Play { key } => Command::PlayRecording { key: *key },
            },
            Commands::Set { action } => match action {
                SetAction::Languages { languages } => Command::SetLanguages {
                    languages: languages.clone(),
                },
                SetAction::Volume { volume } => Command::SetVolume { volume: *volume },
                SetAction::Repeat { repeat } => Command::SetRepeat { repeat: *repeat },
            },
            Commands::Daemon { .. } | Commands::Config { .. } | Commands::Completions { .. } => {
                return None;
            }
            #[cfg(feature = "mic")]
            Commands::Devices => return None,
        };
        Some(command)
    }
}

/// Paths are resolved by the daemon, which may run in another directory.
fn absolute(path: &std::path::Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
