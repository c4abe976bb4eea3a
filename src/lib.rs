//! stationvox - Multilingual railway station announcements
//!
//! Renders train announcements from per-language templates, queues them and
//! plays them one at a time through speech synthesis or recorded clips.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod announce;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod daemon;
pub mod defaults;
pub mod error;
pub mod export;
pub mod ipc;
pub mod logging;
#[cfg(feature = "cli")]
pub mod output;
pub mod playback;
pub mod recordings;
pub mod sequencer;
pub mod train;

// Core traits (source → sequencer → engines)
pub use audio::recorder::AudioSource;
pub use playback::{AudioPlayer, SpeechEngine};

// Sequencer
pub use sequencer::{AnnounceRequest, Sequencer, SequencerEvent, SequencerOptions};

// Error handling
pub use error::{Result, StationvoxError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
