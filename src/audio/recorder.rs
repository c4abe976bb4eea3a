use crate::defaults;
use crate::error::{Result, StationvoxError};

/// Trait for audio capture devices used by the recording studio.
///
/// This trait allows swapping implementations (real microphone vs mock).
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    ///
    /// # Errors
    /// `RecordingPermissionDenied` when the device refuses access, any other
    /// variant for capture failures.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Drain the samples captured since the previous call.
    ///
    /// # Returns
    /// 16-bit PCM mono samples at [`AudioSource::sample_rate`]
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Sample rate of the samples returned by `read_samples`.
    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }
}

/// Mock audio source for testing
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<i16>,
    sample_rate: u32,
    should_deny_permission: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 160],
            sample_rate: defaults::SAMPLE_RATE,
            should_deny_permission: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the samples returned by every read
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to refuse microphone access on start
    pub fn with_permission_denied(mut self) -> Self {
        self.should_deny_permission = true;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_deny_permission {
            return Err(StationvoxError::RecordingPermissionDenied {
                message: self.error_message.clone(),
            });
        }
        if self.should_fail_start {
            return Err(StationvoxError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            Err(StationvoxError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else if self.is_started {
            Ok(self.samples.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_audio_source_returns_configured_samples_once_started() {
        let test_samples = vec![100i16, 200, 300];
        let mut source = MockAudioSource::new().with_samples(test_samples.clone());

        assert!(source.read_samples().unwrap().is_empty());
        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap(), test_samples);
    }

    #[test]
    fn test_mock_audio_source_permission_denied() {
        let mut source = MockAudioSource::new()
            .with_permission_denied()
            .with_error_message("user dismissed prompt");

        match source.start() {
            Err(StationvoxError::RecordingPermissionDenied { message }) => {
                assert_eq!(message, "user dismissed prompt");
            }
            other => panic!("Expected RecordingPermissionDenied, got {:?}", other),
        }
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_audio_source_start_failure() {
        let mut source = MockAudioSource::new().with_start_failure();
        assert!(matches!(
            source.start(),
            Err(StationvoxError::AudioCapture { .. })
        ));
    }

    #[test]
    fn test_mock_audio_source_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        source.start().unwrap();
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_audio_source_start_stop() {
        let mut source = MockAudioSource::new();
        source.start().unwrap();
        assert!(source.is_started());
        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_default_sample_rate() {
        assert_eq!(MockAudioSource::new().sample_rate(), defaults::SAMPLE_RATE);
        assert_eq!(
            MockAudioSource::new().with_sample_rate(8000).sample_rate(),
            8000
        );
    }
}
