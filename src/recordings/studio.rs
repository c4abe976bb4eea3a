//! Capturing new announcement clips from an audio source.

use crate::audio::{AudioClip, AudioSource};
use crate::defaults;
use crate::error::{Result, StationvoxError};
use crate::recordings::{RecordingInfo, RecordingKey, RecordingLibrary};
use crossbeam_channel::{Sender, bounded};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type CaptureResult = Result<(Vec<i16>, u32)>;

struct ActiveRecording {
    key: RecordingKey,
    started: Instant,
    stop_tx: Sender<()>,
    handle: JoinHandle<CaptureResult>,
}

/// Records one clip at a time into a [`RecordingLibrary`].
pub struct RecordingStudio {
    library: RecordingLibrary,
    active: Mutex<Option<ActiveRecording>>,
}

impl RecordingStudio {
    pub fn new(library: RecordingLibrary) -> Self {
        Self {
            library,
            active: Mutex::new(None),
        }
    }

    pub fn library(&self) -> &RecordingLibrary {
        &self.library
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveRecording>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start capturing from `source` for `key`.
    ///
    /// # Errors
    /// `AlreadyRecording` while another capture runs; the source's start
    /// error otherwise (`RecordingPermissionDenied` when access is refused).
    pub fn start(&self, key: RecordingKey, mut source: Box<dyn AudioSource>) -> Result<()> {
        let mut active = self.lock();
        if let Some(current) = active.as_ref() {
            return Err(StationvoxError::AlreadyRecording {
                key: current.key.to_string(),
            });
        }

        if let Err(e) = source.start() {
            tracing::warn!(%key, "recording could not start: {}", e);
            return Err(e);
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || -> CaptureResult {
            let poll = Duration::from_millis(defaults::CAPTURE_POLL_MS);
            let mut captured = Vec::new();
            loop {
                match stop_rx.recv_timeout(poll) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        captured.extend(source.read_samples()?);
                    }
                }
            }
            captured.extend(source.read_samples()?);
            source.stop()?;
            Ok((captured, source.sample_rate()))
        });

        tracing::info!(%key, "recording started");
        *active = Some(ActiveRecording {
            key,
            started: Instant::now(),
            stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the running capture and store the clip, replacing any previous one.
    pub fn stop(&self) -> Result<RecordingInfo> {
        let recording = self.lock().take().ok_or(StationvoxError::NotRecording)?;
        recording.stop_tx.send(()).ok();

        let (samples, sample_rate) =
            recording
                .handle
                .join()
                .map_err(|_| StationvoxError::AudioCapture {
                    message: "Capture thread panicked".to_string(),
                })??;

        let info = self
            .library
            .insert(recording.key, AudioClip::mono(samples, sample_rate));
        tracing::info!(key = %recording.key, duration_ms = info.duration_ms, "recording stored");
        Ok(info)
    }

    /// Abandon the running capture without storing anything.
    pub fn cancel(&self) -> Result<()> {
        let recording = self.lock().take().ok_or(StationvoxError::NotRecording)?;
        recording.stop_tx.send(()).ok();
        recording.handle.join().ok();
        tracing::info!(key = %recording.key, "recording cancelled");
        Ok(())
    }

    /// Key and running time of the current capture, if any.
    pub fn elapsed(&self) -> Option<(RecordingKey, Duration)> {
        self.lock()
            .as_ref()
            .map(|recording| (recording.key, recording.started.elapsed()))
    }

    pub fn is_recording(&self) -> bool {
        self.lock().is_some()
    }
}
