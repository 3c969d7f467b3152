//! Data types that flow between pipeline stages.

use std::time::Instant;

/// A fixed-length block of mono audio samples with capture metadata.
///
/// Samples are f32 in [-1.0, 1.0]. Ownership transfers from producer to
/// consumer on enqueue; frames are never shared between stages.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Mono samples, normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Timestamp when this frame was captured.
    pub captured_at: Instant,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl Frame {
    /// Creates a new frame.
    pub fn new(samples: Vec<f32>, captured_at: Instant, sequence: u64) -> Self {
        Self {
            samples,
            captured_at,
            sequence,
        }
    }

    /// Duration of this frame in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        if sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000 / sample_rate as u64) as u32
    }
}

/// One bounded span of speech between detected speech-start and speech-end.
///
/// Created by the segmenter, consumed exactly once by the recognition stage.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Concatenated samples of every frame in the utterance.
    pub samples: Vec<f32>,
    /// Capture timestamp of the earliest frame (including recovered onset).
    pub started_at: Instant,
    /// Number of frames folded into this utterance.
    pub frames: usize,
}

impl Utterance {
    /// Duration of the utterance in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        if sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000 / sample_rate as u64) as u32
    }
}

/// Envelope carrying a stage payload plus the utterance's original arrival
/// timestamp, used to compute end-to-end latency.
#[derive(Debug, Clone)]
pub struct StageItem<T> {
    /// The stage payload (utterance, intent, audio, ...).
    pub payload: T,
    /// Capture timestamp of the utterance this item descends from.
    pub accepted_at: Instant,
}

impl<T> StageItem<T> {
    /// Creates a new stage item.
    pub fn new(payload: T, accepted_at: Instant) -> Self {
        Self {
            payload,
            accepted_at,
        }
    }

    /// Maps the payload while preserving the arrival timestamp.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageItem<U> {
        StageItem {
            payload: f(self.payload),
            accepted_at: self.accepted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let samples = vec![0.1, 0.2, 0.3];
        let captured_at = Instant::now();

        let frame = Frame::new(samples.clone(), captured_at, 42);

        assert_eq!(frame.samples, samples);
        assert_eq!(frame.captured_at, captured_at);
        assert_eq!(frame.sequence, 42);
    }

    #[test]
    fn test_frame_duration() {
        let frame = Frame::new(vec![0.0; 480], Instant::now(), 0);
        assert_eq!(frame.duration_ms(16000), 30);
        assert_eq!(frame.duration_ms(0), 0);
    }

    #[test]
    fn test_utterance_duration() {
        let utterance = Utterance {
            samples: vec![0.0; 16000],
            started_at: Instant::now(),
            frames: 33,
        };
        assert_eq!(utterance.duration_ms(16000), 1000);
    }

    #[test]
    fn test_stage_item_preserves_timestamp_through_map() {
        let accepted_at = Instant::now();
        let item = StageItem::new("hello".to_string(), accepted_at);

        let mapped = item.map(|text| text.len());

        assert_eq!(mapped.payload, 5);
        assert_eq!(mapped.accepted_at, accepted_at);
    }
}
