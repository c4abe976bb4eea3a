//! Default configuration constants for stationvox.
//!
//! Shared by the config types, the sequencer and the CLI so that every entry
//! point agrees on the same timings and limits.

/// Pause after each spoken or played item within a cycle, in milliseconds.
pub const INTER_ITEM_PAUSE_MS: u64 = 500;

/// Pause after the last item of a cycle before repeating or advancing.
pub const SETTLE_PAUSE_MS: u64 = 1000;

/// Maximum number of finished jobs kept in history (newest first).
pub const HISTORY_CAPACITY: usize = 50;

/// Number of full language cycles played per announcement.
pub const REPEAT_COUNT: u32 = 1;

/// Playback volume on a 0-100 scale.
pub const VOLUME: u8 = 80;

/// Upper bound of the volume scale.
pub const MAX_VOLUME: u8 = 100;

/// Speech rate relative to the engine's normal speed.
///
/// Slightly slower than normal for clarity on station loudspeakers.
pub const SPEECH_RATE: f32 = 0.9;

/// Speech pitch relative to the engine's normal pitch.
pub const SPEECH_PITCH: f32 = 1.0;

/// Words per minute `espeak-ng` uses at a rate of 1.0.
pub const ESPEAK_BASE_WPM: f32 = 175.0;

/// Default speech synthesis command.
pub const SPEECH_COMMAND: &str = "espeak-ng";

/// Default audio playback command.
pub const PLAYER_COMMAND: &str = "paplay";

/// Sample rate used for microphone recordings in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// Interval at which the recording studio drains the audio source.
pub const CAPTURE_POLL_MS: u64 = 20;

/// Text shown for a job that plays a recorded clip directly.
pub const RECORDED_PLAYBACK_TEXT: &str = "Recorded announcement playing";

/// Capacity of the sequencer event broadcast channel.
pub const EVENT_BUFFER: usize = 256;
