//! Default configuration constants for voxpipe.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default frame duration in milliseconds.
///
/// 30ms frames keep per-frame latency low while giving the speech classifier
/// enough signal to make a stable decision.
pub const FRAME_MS: u32 = 30;

/// Default lookback padding window in milliseconds.
///
/// Decisions (and, before trigger, the frames themselves) for this much audio
/// are retained in a ring so that the speech onset preceding trigger detection
/// is recovered into the utterance.
pub const PADDING_MS: u32 = 300;

/// Fraction of voiced decisions in the lookback ring that starts an utterance.
pub const ENTER_FRACTION: f32 = 0.5;

/// Fraction of unvoiced decisions in the lookback ring that ends an utterance.
///
/// Higher than [`ENTER_FRACTION`] so the detector does not flap at the
/// speech/silence boundary.
pub const EXIT_FRACTION: f32 = 0.9;

/// Default RMS threshold for the energy-based speech classifier (0.0 to 1.0).
///
/// Tuned for typical microphone input levels; filters steady background noise
/// while staying sensitive to quiet speech.
pub const SPEECH_THRESHOLD: f32 = 0.02;

/// Default high-pass cutoff frequency in Hz.
///
/// Suppresses low-frequency rumble (HVAC, desk thumps) below the speech band.
pub const HIGH_PASS_CUTOFF_HZ: f32 = 80.0;

/// Default pre-emphasis coefficient.
///
/// First-order difference flattening the spectral tilt of speech before
/// recognition.
pub const PRE_EMPHASIS_COEFF: f32 = 0.97;

/// Default peak normalization target as a fraction of full scale.
pub const PEAK_TARGET: f32 = 0.9;

/// Default capacity of the utterance queue between segmentation and recognition.
pub const UTTERANCE_BUFFER: usize = 8;

/// Default capacity of the response queue between intent and response stages.
pub const RESPONSE_BUFFER: usize = 8;

/// Default capacity of each event subscriber's channel.
///
/// Slow subscribers lose events beyond this depth instead of stalling the
/// pipeline workers.
pub const EVENT_BUFFER: usize = 64;

/// Timeout for blocking reads from the audio source, in milliseconds.
///
/// Every worker wait is bounded by a timeout of this order so the shared
/// cancellation flag is observed promptly.
pub const READ_TIMEOUT_MS: u64 = 100;

/// Timeout for blocking pops from inter-stage queues, in milliseconds.
pub const POP_TIMEOUT_MS: u64 = 100;

/// Deadline for joining pipeline workers on shutdown, in milliseconds.
///
/// A worker still running past this bound is a shutdown error, not something
/// to ignore.
pub const JOIN_TIMEOUT_MS: u64 = 2000;

/// Maximum number of conversation turns kept in the context window.
pub const CONTEXT_TURNS: usize = 10;

/// Returns the number of samples per frame for a sample rate and frame length.
pub const fn frame_samples(sample_rate: u32, frame_ms: u32) -> usize {
    (sample_rate as usize * frame_ms as usize) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_samples_at_defaults() {
        assert_eq!(frame_samples(SAMPLE_RATE, FRAME_MS), 480);
    }

    #[test]
    fn exit_fraction_exceeds_enter_fraction() {
        assert!(EXIT_FRACTION > ENTER_FRACTION);
    }
}
