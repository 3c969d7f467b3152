//! Utterance segmentation with hysteresis over a lookback ring.
//!
//! Turns a stream of per-frame speech/silence decisions into discrete
//! utterances. A fixed-capacity ring of recent decisions carries a running
//! voiced count, so the enter/exit fraction checks are O(1) per frame.
//! While idle the ring also retains the frames themselves; on trigger they
//! are flushed into the new utterance, recovering the speech onset that
//! preceded detection.

use crate::defaults;
use crate::pipeline::types::{Frame, Utterance};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Configuration for utterance segmentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Length of the lookback window in milliseconds.
    pub padding_ms: u32,
    /// Fraction of voiced decisions in the ring that starts an utterance
    /// (strict comparison).
    pub enter_fraction: f32,
    /// Fraction of unvoiced decisions in the ring that ends an utterance.
    pub exit_fraction: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            padding_ms: defaults::PADDING_MS,
            enter_fraction: defaults::ENTER_FRACTION,
            exit_fraction: defaults::EXIT_FRACTION,
        }
    }
}

impl SegmenterConfig {
    /// Ring capacity in frames for the given frame length.
    pub fn ring_capacity(&self, frame_ms: u32) -> usize {
        if frame_ms == 0 {
            return 1;
        }
        ((self.padding_ms / frame_ms) as usize).max(1)
    }
}

/// Events emitted by the segmenter.
#[derive(Debug)]
pub enum SegmentEvent {
    /// The enter threshold was crossed; an utterance is now open.
    SpeechStart,
    /// The exit threshold was crossed; the completed utterance is delivered.
    SpeechEnd(Utterance),
}

/// Current segmenter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    /// Buffering; no utterance open.
    Idle,
    /// Accumulating a candidate utterance.
    Triggered,
}

/// Fixed-capacity ring of speech decisions with a running voiced count.
#[derive(Debug)]
struct DecisionRing {
    decisions: VecDeque<bool>,
    capacity: usize,
    voiced: usize,
}

impl DecisionRing {
    fn new(capacity: usize) -> Self {
        Self {
            decisions: VecDeque::with_capacity(capacity),
            capacity,
            voiced: 0,
        }
    }

    fn push(&mut self, voiced: bool) {
        if self.decisions.len() == self.capacity && self.decisions.pop_front() == Some(true) {
            self.voiced -= 1;
        }
        self.decisions.push_back(voiced);
        if voiced {
            self.voiced += 1;
        }
    }

    fn voiced(&self) -> usize {
        self.voiced
    }

    fn unvoiced(&self) -> usize {
        self.decisions.len() - self.voiced
    }

    fn clear(&mut self) {
        self.decisions.clear();
        self.voiced = 0;
    }
}

/// Open utterance being accumulated while triggered.
#[derive(Debug)]
struct OpenUtterance {
    samples: Vec<f32>,
    started_at: Instant,
    frames: usize,
}

/// Stateful detector that turns per-frame decisions into utterance
/// boundaries.
pub struct VoiceActivitySegmenter {
    config: SegmenterConfig,
    state: SegmenterState,
    ring: DecisionRing,
    /// Frames retained for onset recovery; only filled while idle.
    pending: VecDeque<Frame>,
    current: Option<OpenUtterance>,
}

impl VoiceActivitySegmenter {
    /// Creates a segmenter for the given frame length.
    pub fn new(config: SegmenterConfig, frame_ms: u32) -> Self {
        let capacity = config.ring_capacity(frame_ms);
        Self {
            config,
            state: SegmenterState::Idle,
            ring: DecisionRing::new(capacity),
            pending: VecDeque::with_capacity(capacity),
            current: None,
        }
    }

    /// Ring capacity in frames.
    pub fn ring_capacity(&self) -> usize {
        self.ring.capacity
    }

    /// Whether an utterance is currently open.
    pub fn is_triggered(&self) -> bool {
        self.state == SegmenterState::Triggered
    }

    /// Feeds one frame and its speech decision.
    ///
    /// Returns at most one boundary event per frame.
    pub fn push(&mut self, frame: Frame, voiced: bool) -> Option<SegmentEvent> {
        match self.state {
            SegmenterState::Idle => {
                self.ring.push(voiced);
                if self.pending.len() == self.ring.capacity {
                    self.pending.pop_front();
                }
                self.pending.push_back(frame);

                let enter = self.config.enter_fraction * self.ring.capacity as f32;
                if self.ring.voiced() as f32 > enter {
                    self.trigger();
                    Some(SegmentEvent::SpeechStart)
                } else {
                    None
                }
            }
            SegmenterState::Triggered => {
                self.ring.push(voiced);
                if let Some(open) = self.current.as_mut() {
                    open.samples.extend_from_slice(&frame.samples);
                    open.frames += 1;
                }

                let exit =
                    (self.config.exit_fraction * self.ring.capacity as f32).ceil() as usize;
                if self.ring.unvoiced() >= exit {
                    let utterance = self.release();
                    Some(SegmentEvent::SpeechEnd(utterance))
                } else {
                    None
                }
            }
        }
    }

    /// Clears all state without emitting events.
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.ring.clear();
        self.pending.clear();
        self.current = None;
    }

    /// Idle → Triggered: flush the retained frames into a new utterance.
    fn trigger(&mut self) {
        let started_at = self
            .pending
            .front()
            .map(|f| f.captured_at)
            .unwrap_or_else(Instant::now);

        let mut samples = Vec::new();
        let mut frames = 0;
        for frame in self.pending.drain(..) {
            samples.extend_from_slice(&frame.samples);
            frames += 1;
        }

        self.current = Some(OpenUtterance {
            samples,
            started_at,
            frames,
        });
        self.ring.clear();
        self.state = SegmenterState::Triggered;
    }

    /// Triggered → Idle: close and return the open utterance.
    fn release(&mut self) -> Utterance {
        self.ring.clear();
        self.pending.clear();
        self.state = SegmenterState::Idle;

        let open = self.current.take().unwrap_or(OpenUtterance {
            samples: Vec::new(),
            started_at: Instant::now(),
            frames: 0,
        });
        Utterance {
            samples: open.samples,
            started_at: open.started_at,
            frames: open.frames,
        }
    }
}
