//! Voice activity detection: per-frame speech classification and
//! utterance segmentation.

pub mod segmenter;

pub use segmenter::{SegmentEvent, SegmenterConfig, VoiceActivitySegmenter};

use crate::pipeline::types::Frame;

/// Trait for per-frame speech/silence decisions.
///
/// Implementations are stateless per call; the segmenter supplies all
/// cross-frame state.
pub trait FrameSpeechClassifier: Send + Sync {
    /// Returns true when the frame contains speech.
    fn is_speech(&self, frame: &Frame) -> bool;
}

/// Energy-based classifier: a frame is speech when its RMS exceeds a
/// threshold.
#[derive(Debug, Clone, Copy)]
pub struct EnergyClassifier {
    threshold: f32,
}

impl EnergyClassifier {
    /// Creates a classifier with the given RMS threshold.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self::new(crate::defaults::SPEECH_THRESHOLD)
    }
}

impl FrameSpeechClassifier for EnergyClassifier {
    fn is_speech(&self, frame: &Frame) -> bool {
        calculate_rms(&frame.samples) > self.threshold
    }
}

/// Scripted classifier for tests: pops one pre-seeded decision per call,
/// then reports silence.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    decisions: std::sync::Mutex<std::collections::VecDeque<bool>>,
}

impl ScriptedClassifier {
    /// Creates a classifier with the given decision script.
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            decisions: std::sync::Mutex::new(decisions.into_iter().collect()),
        }
    }

    /// Remaining scripted decisions.
    pub fn remaining(&self) -> usize {
        self.decisions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

impl FrameSpeechClassifier for ScriptedClassifier {
    fn is_speech(&self, _frame: &Frame) -> bool {
        self.decisions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or(false)
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Returns a value in [0.0, 1.0] for samples normalized to [-1.0, 1.0]:
/// 0.0 for silence, ~0.707 for a full-scale sine wave.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame(samples: Vec<f32>) -> Frame {
        Frame::new(samples, Instant::now(), 0)
    }

    #[test]
    fn test_rms_silence_is_zero() {
        assert_eq!(calculate_rms(&vec![0.0; 480]), 0.0);
    }

    #[test]
    fn test_rms_full_scale() {
        let rms = calculate_rms(&vec![1.0; 480]);
        assert!((rms - 1.0).abs() < 1e-4, "RMS should be ~1.0, got {}", rms);
    }

    #[test]
    fn test_rms_negative_samples() {
        let rms = calculate_rms(&vec![-1.0; 480]);
        assert!(rms > 0.99, "RMS should be ~1.0 for -1.0, got {}", rms);
    }

    #[test]
    fn test_rms_empty_samples() {
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn test_energy_classifier_thresholding() {
        let classifier = EnergyClassifier::new(0.02);

        assert!(!classifier.is_speech(&frame(vec![0.0; 480])));
        assert!(classifier.is_speech(&frame(vec![0.1; 480])));
    }

    #[test]
    fn test_energy_classifier_default_threshold() {
        let classifier = EnergyClassifier::default();
        assert_eq!(classifier.threshold(), 0.02);
    }

    #[test]
    fn test_scripted_classifier_plays_decisions_then_silence() {
        let classifier = ScriptedClassifier::new([true, false, true]);
        let f = frame(vec![0.0; 4]);

        assert!(classifier.is_speech(&f));
        assert!(!classifier.is_speech(&f));
        assert!(classifier.is_speech(&f));
        // Script exhausted — silence from here on.
        assert!(!classifier.is_speech(&f));
        assert_eq!(classifier.remaining(), 0);
    }

    #[test]
    fn test_classifier_trait_is_object_safe() {
        let classifier: Box<dyn FrameSpeechClassifier> = Box::new(EnergyClassifier::default());
        assert!(classifier.is_speech(&frame(vec![0.5; 480])));
    }
}
