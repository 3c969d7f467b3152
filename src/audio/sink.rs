//! Audio playback sinks.

use crate::error::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Trait for audio playback devices.
///
/// The sink is shared between the playback worker (writes) and the
/// interruption path (clear), so all methods take `&self`; implementations
/// synchronize internally. A sink with no queued data outputs silence — there
/// is no underrun error.
pub trait AudioSink: Send + Sync {
    /// Start the output stream.
    fn start(&self) -> Result<()>;

    /// Stop the output stream.
    fn stop(&self) -> Result<()>;

    /// Queue samples for playback.
    ///
    /// With `blocking` set, the call returns only once the queued audio has
    /// drained (or the queue was cleared from another thread).
    fn write(&self, samples: &[f32], blocking: bool) -> Result<()>;

    /// Drop all queued audio immediately.
    fn clear(&self);

    /// Number of samples currently queued.
    fn pending(&self) -> usize;
}

/// Mock audio sink recording writes and clears, for tests.
#[derive(Debug, Default)]
pub struct MockAudioSink {
    queued: Mutex<Vec<f32>>,
    written: Mutex<Vec<f32>>,
    is_started: AtomicBool,
    clear_count: AtomicUsize,
}

impl MockAudioSink {
    /// Create a new mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sample ever written, across clears.
    pub fn written(&self) -> Vec<f32> {
        self.written.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// How many times `clear` was called.
    pub fn clears(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }

    /// Whether the sink is started.
    pub fn is_started(&self) -> bool {
        self.is_started.load(Ordering::SeqCst)
    }
}

impl AudioSink for MockAudioSink {
    fn start(&self) -> Result<()> {
        self.is_started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.is_started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn write(&self, samples: &[f32], _blocking: bool) -> Result<()> {
        self.queued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(samples);
        self.written
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(samples);
        Ok(())
    }

    fn clear(&self) {
        self.queued.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clear();
        self.clear_count.fetch_add(1, Ordering::SeqCst);
    }

    fn pending(&self) -> usize {
        self.queued.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_records_writes() {
        let sink = MockAudioSink::new();
        sink.write(&[0.1, 0.2], false).unwrap();
        sink.write(&[0.3], false).unwrap();

        assert_eq!(sink.pending(), 3);
        assert_eq!(sink.written(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_mock_sink_clear_empties_queue_but_keeps_history() {
        let sink = MockAudioSink::new();
        sink.write(&[0.1, 0.2], false).unwrap();
        sink.clear();

        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.clears(), 1);
        assert_eq!(sink.written(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_mock_sink_start_stop() {
        let sink = MockAudioSink::new();
        assert!(!sink.is_started());
        sink.start().unwrap();
        assert!(sink.is_started());
        sink.stop().unwrap();
        assert!(!sink.is_started());
    }

    #[test]
    fn test_sink_trait_is_object_safe() {
        let sink: Box<dyn AudioSink> = Box::new(MockAudioSink::new());
        sink.start().unwrap();
        sink.write(&[0.5], true).unwrap();
        assert_eq!(sink.pending(), 1);
        sink.clear();
        assert_eq!(sink.pending(), 0);
    }
}
