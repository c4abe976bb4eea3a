//! Microphone capture through CPAL for the recording studio.

use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::{Result, StationvoxError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL prints ALSA/JACK probing noise on fd 2 while enumerating backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names on desktop sound servers.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns that are never a microphone.
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Map a backend failure to the error the studio reports.
///
/// Sound servers surface a refused microphone as a backend message, so the
/// text is inspected for an access refusal.
fn classify_capture_error(context: &str, message: String) -> StationvoxError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("access denied") || lower.contains("not permitted") {
        StationvoxError::RecordingPermissionDenied {
            message: format!("{}: {}", context, message),
        }
    } else {
        StationvoxError::AudioCapture {
            message: format!("{}: {}", context, message),
        }
    }
}

/// List input devices usable for recording, preferred ones marked "\[recommended\]".
pub fn list_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| cpal::default_host().input_devices())
        .map_err(|e| classify_capture_error("Failed to enumerate input devices", e.to_string()))?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

fn find_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| classify_capture_error("Failed to enumerate devices", e.to_string()))?;

        match device_name {
            Some(name) => devices
                .into_iter()
                .find(|dev| dev.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| StationvoxError::AudioDeviceNotFound {
                    device: name.to_string(),
                }),
            None => {
                let preferred = devices
                    .into_iter()
                    .find(|dev| dev.name().map(|n| is_preferred_device(&n)).unwrap_or(false));
                preferred
                    .or_else(|| host.default_input_device())
                    .ok_or_else(|| StationvoxError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    })
            }
        }
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched through the Mutex in CpalAudioSource.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture delivering mono i16 at the configured sample rate.
///
/// Opens the device at its native config and mixes down and resamples in
/// software, which works on every sound server the studio has met.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Open `device_name`, or the best default input device when `None`.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        Ok(Self {
            device: find_device(device_name)?,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config = self
            .device
            .default_input_config()
            .map_err(|e| classify_capture_error("Failed to query input config", e.to_string()))?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        tracing::debug!(
            channels = native_channels,
            rate = native_rate,
            format = ?default_config.sample_format(),
            "opening microphone stream"
        );

        let err_callback = |err| {
            tracing::warn!("microphone stream error: {}", err);
        };
        let buffer = Arc::clone(&self.buffer);

        let stream = match default_config.sample_format() {
            SampleFormat::I16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let converted = to_mono(data, native_channels, native_rate, target_rate);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(&converted);
                    }
                },
                err_callback,
                None,
            ),
            SampleFormat::F32 => self.device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let pcm: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    let converted = to_mono(&pcm, native_channels, native_rate, target_rate);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(&converted);
                    }
                },
                err_callback,
                None,
            ),
            fmt => {
                return Err(StationvoxError::AudioCapture {
                    message: format!("Unsupported microphone sample format: {:?}", fmt),
                });
            }
        };

        stream.map_err(|e| classify_capture_error("Failed to open microphone", e.to_string()))
    }
}

/// Mix interleaved audio to mono and resample to `target_rate`.
fn to_mono(samples: &[i16], channels: usize, source_rate: u32, target_rate: u32) -> Vec<i16> {
    let mono: Vec<i16> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    crate::audio::wav::resample(&mono, source_rate, target_rate)
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| StationvoxError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        if stream_guard.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|e| classify_capture_error("Failed to start microphone", e.to_string()))?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| StationvoxError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;

        if let Some(sendable_stream) = stream_guard.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| StationvoxError::AudioCapture {
                    message: format!("Failed to stop microphone: {}", e),
                })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|e| StationvoxError::AudioCapture {
            message: format!("Failed to lock audio buffer: {}", e),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
