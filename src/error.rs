//! Error types for stationvox.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationvoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Template errors
    #[error("Unknown announcement type: {name}")]
    UnknownAnnouncementKind { name: String },

    #[error("Unknown language: {name}")]
    UnknownLanguage { name: String },

    #[error("Failed to load templates from {path}: {message}")]
    TemplateLoad { path: String, message: String },

    // Recording errors
    #[error("Microphone access denied: {message}")]
    RecordingPermissionDenied { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Already recording {key}")]
    AlreadyRecording { key: String },

    #[error("Not recording")]
    NotRecording,

    #[error("No recording stored for {key}")]
    RecordingNotFound { key: String },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Playback errors
    #[error("Playback tool not found: {tool}")]
    PlaybackToolNotFound { tool: String },

    #[error("Speech synthesis failed: {message}")]
    SpeechFailed { message: String },

    #[error("Audio playback failed: {message}")]
    PlaybackFailed { message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StationvoxError>;
