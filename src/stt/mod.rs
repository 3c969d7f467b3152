//! Speech recognition interface.

use crate::error::{Result, VoxpipeError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Result of recognizing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Recognized text; may be empty when the model heard nothing usable.
    pub text: String,
    /// Model confidence in [0.0, 1.0].
    pub confidence: f32,
}

impl Transcription {
    /// A transcription carrying no text.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// Trait for speech-to-text recognition.
///
/// May be slow (model-dependent); the pipeline calls it from a dedicated
/// worker. Failures are caught by the caller and treated as an empty result,
/// never propagated into the pipeline.
pub trait Recognizer: Send + Sync {
    /// Transcribe one utterance of mono f32 samples at the pipeline rate.
    fn transcribe(&self, samples: &[f32]) -> Result<Transcription>;
}

/// Mock recognizer for testing.
///
/// Plays back scripted transcriptions in order, then repeats the last one
/// (or returns empty text if none were scripted).
#[derive(Debug, Default)]
pub struct MockRecognizer {
    responses: Mutex<VecDeque<Transcription>>,
    fallback: Mutex<Option<Transcription>>,
    should_fail: bool,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockRecognizer {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted response.
    pub fn with_response(self, text: &str) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(Transcription {
                text: text.to_string(),
                confidence: 0.9,
            });
        self
    }

    /// Configure the mock to fail on every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcribe calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Recognizer for MockRecognizer {
    fn transcribe(&self, _samples: &[f32]) -> Result<Transcription> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.should_fail {
            return Err(VoxpipeError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }

        let mut responses = self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match responses.pop_front() {
            Some(transcription) => {
                *self.fallback.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    Some(transcription.clone());
                Ok(transcription)
            }
            None => Ok(self
                .fallback
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
                .unwrap_or_else(Transcription::empty)),
        }
    }
}
