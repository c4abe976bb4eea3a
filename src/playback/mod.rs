//! Speech synthesis and clip playback behind cancellable async traits.

mod cancel;
pub mod player;
mod process;
pub mod speech;

pub use cancel::CancelToken;
pub use player::{AudioPlayer, CommandAudioPlayer, MockAudioPlayer};
pub use speech::{CommandSpeechEngine, MockSpeechEngine, SpeechEngine, Utterance};
