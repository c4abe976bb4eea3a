//! Audio clips, WAV codec and microphone capture.

pub mod clip;
#[cfg(feature = "mic")]
pub mod capture;
pub mod recorder;
pub mod wav;

pub use clip::AudioClip;
pub use recorder::{AudioSource, MockAudioSource};
