use crate::audio::{AudioClip, wav};
use crate::error::{Result, StationvoxError};
use crate::recordings::RecordingKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A clip stored in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    pub clip: AudioClip,
    pub recorded_at: DateTime<Utc>,
}

/// Listing entry for a recorded clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub key: RecordingKey,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub recorded_at: DateTime<Utc>,
}

impl RecordingInfo {
    fn new(key: RecordingKey, audio: &RecordedAudio) -> Self {
        Self {
            key,
            duration_ms: audio.clip.duration().as_millis() as u64,
            sample_rate: audio.clip.sample_rate(),
            recorded_at: audio.recorded_at,
        }
    }
}

/// Shared in-memory library of recorded clips.
///
/// Cloning yields another handle to the same library; the sequencer reads
/// from it while the studio and IPC handler write to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingLibrary {
    clips: Arc<RwLock<HashMap<RecordingKey, RecordedAudio>>>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RecordingKey, RecordedAudio>> {
        self.clips.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RecordingKey, RecordedAudio>> {
        self.clips.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a clip under `key`, replacing any previous clip.
    pub fn insert(&self, key: RecordingKey, clip: AudioClip) -> RecordingInfo {
        let audio = RecordedAudio {
            clip,
            recorded_at: Utc::now(),
        };
        let info = RecordingInfo::new(key, &audio);
        if self.write().insert(key, audio).is_some() {
            tracing::debug!(%key, "replaced recorded clip");
        }
        info
    }

    pub fn get(&self, key: &RecordingKey) -> Option<RecordedAudio> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &RecordingKey) -> bool {
        self.read().contains_key(key)
    }

    /// Delete the clip under `key`, releasing its samples.
    pub fn remove(&self, key: &RecordingKey) -> Result<RecordedAudio> {
        self.write()
            .remove(key)
            .ok_or_else(|| StationvoxError::RecordingNotFound {
                key: key.to_string(),
            })
    }

    /// All recordings, ordered by key.
    pub fn list(&self) -> Vec<RecordingInfo> {
        let mut infos: Vec<RecordingInfo> = self
            .read()
            .iter()
            .map(|(key, audio)| RecordingInfo::new(*key, audio))
            .collect();
        infos.sort_by_key(|info| info.key);
        infos
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Load a WAV file and store it under `key`.
    pub fn import_wav(&self, key: RecordingKey, path: &Path) -> Result<RecordingInfo> {
        let clip = wav::read_file(path)?;
        tracing::info!(%key, path = %path.display(), "imported recording");
        Ok(self.insert(key, clip))
    }

    /// Write the clip under `key` to `dir` as `announcement_{key}_{unix_ms}.wav`.
    pub fn export_wav(&self, key: &RecordingKey, dir: &Path) -> Result<PathBuf> {
        let audio = self
            .get(key)
            .ok_or_else(|| StationvoxError::RecordingNotFound {
                key: key.to_string(),
            })?;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "announcement_{}_{}.wav",
            key,
            Utc::now().timestamp_millis()
        ));
        wav::write_file(&audio.clip, &path)?;
        tracing::info!(%key, path = %path.display(), "exported recording");
        Ok(path)
    }
}
