//! Speech synthesis interface.

use crate::error::{Result, VoxpipeError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Trait for text-to-speech synthesis.
///
/// `cancel` must be safe to call at any time, including when no synthesis is
/// in flight — barge-in handling calls it without knowing synthesizer state.
pub trait Synthesizer: Send + Sync {
    /// Synthesize text into mono f32 samples at the pipeline rate.
    ///
    /// An empty sample buffer is a valid result (nothing to say).
    fn synthesize(&self, text: &str) -> Result<Vec<f32>>;

    /// Best-effort cancellation of in-flight synthesis.
    fn cancel(&self);
}

/// Mock synthesizer for testing.
///
/// Produces a deterministic buffer whose length is proportional to the text
/// length, and counts `cancel` calls. After `cancel`, the next `synthesize`
/// returns an empty buffer once (the cancelled utterance).
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    cancel_count: AtomicUsize,
    cancelled: AtomicBool,
    should_fail: bool,
    samples_per_char: usize,
}

impl MockSynthesizer {
    /// Creates a mock producing 160 samples per character.
    pub fn new() -> Self {
        Self {
            cancel_count: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            should_fail: false,
            samples_per_char: 160,
        }
    }

    /// Configure the mock to fail on synthesize.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// How many times `cancel` was called.
    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }
}

impl Synthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        if self.should_fail {
            return Err(VoxpipeError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        if self.cancelled.swap(false, Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        let len = text.chars().count() * self.samples_per_char;
        // Quiet constant tone — enough for tests to measure lengths.
        Ok(vec![0.1; len])
    }

    fn cancel(&self) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
