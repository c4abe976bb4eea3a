//! Speech synthesis engines.

use crate::announce::Language;
use crate::config::SpeechConfig;
use crate::defaults;
use crate::error::{Result, StationvoxError};
use crate::playback::CancelToken;
use crate::playback::process::{RunOutcome, run_tool};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One text to be spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub language: Language,
    /// 0-100
    pub volume: u8,
}

/// Text-to-speech backend.
///
/// `speak` resolves when the utterance has been spoken in full, or as soon
/// as `cancel` fires. A cancelled utterance is not an error.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<()>;

    fn name(&self) -> &str;
}

/// Default espeak-ng voice for a language.
fn default_voice(language: Language) -> &'static str {
    match language {
        Language::English => "en",
        Language::Hindi => "hi",
        Language::Kannada => "kn",
    }
}

/// Speech engine backed by an `espeak-ng` compatible command.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    command: String,
    rate: f32,
    pitch: f32,
    voices: BTreeMap<Language, String>,
}

impl CommandSpeechEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            rate: defaults::SPEECH_RATE,
            pitch: defaults::SPEECH_PITCH,
            voices: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        Ok(Self {
            command: config.command.clone(),
            rate: config.rate,
            pitch: config.pitch,
            voices: config.voices_by_language()?,
        })
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_voice(mut self, language: Language, voice: impl Into<String>) -> Self {
        self.voices.insert(language, voice.into());
        self
    }

    pub fn voice(&self, language: Language) -> &str {
        self.voices
            .get(&language)
            .map(String::as_str)
            .unwrap_or_else(|| default_voice(language))
    }

    /// Command-line arguments for `utterance`.
    pub fn args(&self, utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (defaults::ESPEAK_BASE_WPM * self.rate).round().max(80.0) as u32;
        let pitch = (50.0 * self.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = u32::from(utterance.volume.min(defaults::MAX_VOLUME)) * 2;

        vec![
            "-v".to_string(),
            self.voice(utterance.language).to_string(),
            "-s".to_string(),
            words_per_minute.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "--".to_string(),
            utterance.text.clone(),
        ]
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<()> {
        let outcome = run_tool(&self.command, &self.args(utterance), cancel, |message| {
            StationvoxError::SpeechFailed { message }
        })
        .await?;
        if outcome == RunOutcome::Cancelled {
            tracing::debug!(language = %utterance.language, "speech cancelled");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}

/// Mock speech engine for testing.
///
/// Clones share the log of spoken utterances.
#[derive(Debug, Clone)]
pub struct MockSpeechEngine {
    spoken: Arc<Mutex<Vec<Utterance>>>,
    duration: Duration,
    never_completes: bool,
    should_fail: bool,
}

impl MockSpeechEngine {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            duration: Duration::from_millis(100),
            never_completes: false,
            should_fail: false,
        }
    }

    /// Time each utterance takes to "speak".
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Utterances only end when cancelled.
    pub fn never_completes(mut self) -> Self {
        self.never_completes = true;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Texts spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.utterances().into_iter().map(|u| u.text).collect()
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.spoken
            .lock()
            .map(|spoken| spoken.clone())
            .unwrap_or_default()
    }
}

impl Default for MockSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<()> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(utterance.clone());
        }
        if self.should_fail {
            return Err(StationvoxError::SpeechFailed {
                message: "mock speech failure".to_string(),
            });
        }
        if self.never_completes {
            cancel.cancelled().await;
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {}
            _ = cancel.cancelled() => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
