//! Playback of recorded clips.

use crate::audio::{AudioClip, wav};
use crate::error::{Result, StationvoxError};
use crate::playback::CancelToken;
use crate::playback::process::{RunOutcome, run_tool};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Audio output for recorded clips.
///
/// Same completion contract as [`crate::playback::SpeechEngine::speak`].
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: &AudioClip, volume: u8, cancel: &CancelToken) -> Result<()>;

    fn name(&self) -> &str;
}

/// Player that hands a temporary WAV file to `paplay`, `aplay` or similar.
#[derive(Debug, Clone)]
pub struct CommandAudioPlayer {
    command: String,
}

impl CommandAudioPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn supports_volume(&self) -> bool {
        Path::new(&self.command)
            .file_name()
            .is_some_and(|name| name == "paplay")
    }

    /// Command-line arguments for playing `path` at `volume` (0-100).
    pub fn args(&self, path: &Path, volume: u8) -> Vec<String> {
        let mut args = Vec::new();
        if self.supports_volume() {
            // paplay volume is linear, 65536 = 100%
            let scaled = u32::from(volume.min(100)) * 65536 / 100;
            args.push(format!("--volume={}", scaled));
        }
        args.push(path.display().to_string());
        args
    }

    /// Write `clip` to a fresh temporary WAV file, deleted when the handle drops.
    async fn write_temp(clip: &AudioClip) -> Result<NamedTempFile> {
        let clip = clip.clone();
        tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let mut temp = tempfile::Builder::new()
                .prefix("stationvox-")
                .suffix(".wav")
                .tempfile()?;
            wav::encode(&clip, temp.as_file_mut())?;
            Ok(temp)
        })
        .await
        .map_err(|e| StationvoxError::PlaybackFailed {
            message: format!("WAV writer task failed: {}", e),
        })?
    }
}

#[async_trait]
impl AudioPlayer for CommandAudioPlayer {
    async fn play(&self, clip: &AudioClip, volume: u8, cancel: &CancelToken) -> Result<()> {
        if clip.is_empty() {
            return Ok(());
        }
        let temp = Self::write_temp(clip).await?;
        let outcome = run_tool(&self.command, &self.args(temp.path(), volume), cancel, |message| {
            StationvoxError::PlaybackFailed { message }
        })
        .await?;
        if outcome == RunOutcome::Cancelled {
            tracing::debug!("clip playback cancelled");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}

/// Mock audio player for testing.
///
/// Plays each clip for its own duration unless configured otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockAudioPlayer {
    played: Arc<Mutex<Vec<AudioClip>>>,
    duration: Option<Duration>,
    never_completes: bool,
    should_fail: bool,
}

impl MockAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn never_completes(mut self) -> Self {
        self.never_completes = true;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Clips played so far, in order.
    pub fn played(&self) -> Vec<AudioClip> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AudioPlayer for MockAudioPlayer {
    async fn play(&self, clip: &AudioClip, _volume: u8, cancel: &CancelToken) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(clip.clone());
        }
        if self.should_fail {
            return Err(StationvoxError::PlaybackFailed {
                message: "mock playback failure".to_string(),
            });
        }
        if self.never_completes {
            cancel.cancelled().await;
            return Ok(());
        }
        let duration = self.duration.unwrap_or_else(|| clip.duration());
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = cancel.cancelled() => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paplay_gets_volume_argument() {
        let player = CommandAudioPlayer::new("/usr/bin/paplay");
        let args = player.args(Path::new("/tmp/a.wav"), 50);
        assert_eq!(args, vec!["--volume=32768", "/tmp/a.wav"]);
    }

    #[test]
    fn other_players_get_only_the_path() {
        let player = CommandAudioPlayer::new("aplay");
        assert_eq!(player.args(Path::new("/tmp/a.wav"), 50), vec!["/tmp/a.wav"]);
    }

    #[tokio::test]
    async fn temp_wav_is_removed_on_drop() {
        let clip = AudioClip::mono(vec![1; 16], 16000);
        let temp = CommandAudioPlayer::write_temp(&clip).await.unwrap();
        let path = temp.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("stationvox-"));
        assert!(name.ends_with(".wav"));
        assert_eq!(wav::read_file(&path).unwrap(), clip);

        drop(temp);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn temp_wavs_get_distinct_paths() {
        let clip = AudioClip::mono(vec![1; 16], 16000);
        let first = CommandAudioPlayer::write_temp(&clip).await.unwrap();
        let second = CommandAudioPlayer::write_temp(&clip).await.unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().exists());
        assert!(second.path().exists());
    }

    #[tokio::test]
    async fn missing_player_is_reported() {
        let player = CommandAudioPlayer::new("stationvox-no-such-player");
        let clip = AudioClip::mono(vec![1; 16], 16000);
        let result = player.play(&clip, 80, &CancelToken::new()).await;
        assert!(matches!(
            result,
            Err(StationvoxError::PlaybackToolNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_plays_for_clip_duration() {
        let player = MockAudioPlayer::new();
        let clip = AudioClip::mono(vec![0; 32000], 16000);
        let start = tokio::time::Instant::now();

        player.play(&clip, 80, &CancelToken::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(player.played(), vec![clip]);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_stops_on_cancel() {
        let player = MockAudioPlayer::new().never_completes();
        let token = CancelToken::new();
        token.cancel();
        player
            .play(&AudioClip::mono(vec![0; 4], 16000), 80, &token)
            .await
            .unwrap();
        assert_eq!(player.played().len(), 1);
    }
}
