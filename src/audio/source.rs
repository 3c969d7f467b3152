//! Audio capture sources.

use crate::error::{Result, VoxpipeError};
use crate::pipeline::types::Frame;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real audio device, WAV file,
/// mock). The pipeline owns the source exclusively; only one thread reads it.
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read the next frame, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when no frame arrived within the timeout — for a
    /// live microphone that is normal at startup; for a finite source it
    /// means exhaustion.
    fn read(&mut self, timeout: Duration) -> Result<Option<Frame>>;

    /// Whether this source ends on its own (file/pipe) rather than running
    /// until stopped (microphone).
    fn is_finite(&self) -> bool {
        false
    }
}

/// One scripted stretch of identical frames for [`MockAudioSource`].
#[derive(Debug, Clone)]
pub struct FramePhase {
    /// Samples each frame of this phase carries.
    pub samples: Vec<f32>,
    /// How many frames the phase produces.
    pub count: usize,
}

/// Mock audio source producing scripted frame phases, for tests.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    phases: VecDeque<FramePhase>,
    is_started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
    finite: bool,
    frame_delay: Option<Duration>,
    sequence: u64,
}

impl MockAudioSource {
    /// Create a new mock audio source with no frames.
    pub fn new() -> Self {
        Self {
            phases: VecDeque::new(),
            is_started: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
            finite: true,
            frame_delay: None,
            sequence: 0,
        }
    }

    /// Append a phase of `count` frames carrying `samples`.
    pub fn with_phase(mut self, samples: Vec<f32>, count: usize) -> Self {
        self.phases.push_back(FramePhase { samples, count });
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Pace reads like a real capture device: each frame takes `delay` to
    /// arrive.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    /// Treat the source as live: exhausted phases read as `None` without the
    /// pipeline interpreting that as end-of-input.
    pub fn as_live_source(mut self) -> Self {
        self.finite = false;
        self
    }

    /// Check if the audio source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(VoxpipeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        if self.should_fail_read {
            return Err(VoxpipeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }

        let Some(phase) = self.phases.front_mut() else {
            if !self.finite {
                // A live microphone with nothing buffered blocks for the
                // full timeout; pace the caller the same way.
                std::thread::sleep(timeout);
            }
            return Ok(None);
        };

        if let Some(delay) = self.frame_delay {
            std::thread::sleep(delay);
        }

        let samples = phase.samples.clone();
        phase.count -= 1;
        if phase.count == 0 {
            self.phases.pop_front();
        }

        let sequence = self.sequence;
        self.sequence += 1;
        Ok(Some(Frame::new(samples, Instant::now(), sequence)))
    }

    fn is_finite(&self) -> bool {
        self.finite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_mock_source_plays_phases_in_order() {
        let mut source = MockAudioSource::new()
            .with_phase(vec![0.5; 4], 2)
            .with_phase(vec![0.0; 4], 1);

        let first = source.read(TIMEOUT).unwrap().unwrap();
        let second = source.read(TIMEOUT).unwrap().unwrap();
        let third = source.read(TIMEOUT).unwrap().unwrap();

        assert_eq!(first.samples, vec![0.5; 4]);
        assert_eq!(second.samples, vec![0.5; 4]);
        assert_eq!(third.samples, vec![0.0; 4]);
        assert!(source.read(TIMEOUT).unwrap().is_none());
    }

    #[test]
    fn test_mock_source_sequences_increase() {
        let mut source = MockAudioSource::new().with_phase(vec![0.1; 4], 3);

        let mut last = None;
        while let Some(frame) = source.read(TIMEOUT).unwrap() {
            if let Some(prev) = last {
                assert!(frame.sequence > prev);
            }
            last = Some(frame.sequence);
        }
        assert_eq!(last, Some(2));
    }

    #[test]
    fn test_mock_source_start_failure() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device not found");

        let result = source.start();
        assert!(result.is_err());
        assert!(!source.is_started());
        match result {
            Err(VoxpipeError::AudioCapture { message }) => {
                assert_eq!(message, "device not found");
            }
            _ => panic!("Expected AudioCapture error"),
        }
    }

    #[test]
    fn test_mock_source_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        assert!(source.read(TIMEOUT).is_err());
    }

    #[test]
    fn test_mock_source_start_stop_state() {
        let mut source = MockAudioSource::new();
        assert!(!source.is_started());
        source.start().unwrap();
        assert!(source.is_started());
        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_source_finite_by_default_live_when_asked() {
        assert!(MockAudioSource::new().is_finite());
        assert!(!MockAudioSource::new().as_live_source().is_finite());
    }

    #[test]
    fn test_audio_source_trait_is_object_safe() {
        let mut source: Box<dyn AudioSource> =
            Box::new(MockAudioSource::new().with_phase(vec![0.2; 4], 1));

        source.start().unwrap();
        let frame = source.read(TIMEOUT).unwrap();
        assert!(frame.is_some());
        source.stop().unwrap();
    }
}
