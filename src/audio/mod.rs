//! Audio capture, playback and per-frame conditioning.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod conditioner;
pub mod sink;
pub mod source;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalAudioSink, CpalAudioSource};
pub use conditioner::{ConditionerConfig, FrameConditioner};
pub use sink::{AudioSink, MockAudioSink};
pub use source::{AudioSource, FramePhase, MockAudioSource};
pub use wav::WavAudioSource;
