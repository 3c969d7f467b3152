//! Running per-stage latency statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline stages with recorded latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Speech-to-text.
    Recognition,
    /// Intent classification.
    Intent,
    /// Response generation.
    Response,
    /// Speech synthesis.
    Synthesis,
    /// End-to-end: utterance capture to playback handoff.
    Total,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Recognition,
        Stage::Intent,
        Stage::Response,
        Stage::Synthesis,
        Stage::Total,
    ];

    /// Stable display name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Recognition => "recognition",
            Stage::Intent => "intent",
            Stage::Response => "response",
            Stage::Synthesis => "synthesis",
            Stage::Total => "total",
        }
    }

    fn index(&self) -> usize {
        match self {
            Stage::Recognition => 0,
            Stage::Intent => 1,
            Stage::Response => 2,
            Stage::Synthesis => 3,
            Stage::Total => 4,
        }
    }
}

/// Running sum/count for one stage.
#[derive(Debug, Clone, Copy, Default)]
struct StageAccum {
    total: Duration,
    count: u64,
}

/// Immutable copy of accumulated statistics.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    means_ms: [f64; Stage::ALL.len()],
    counts: [u64; Stage::ALL.len()],
    /// Monotonically increasing count of utterances played to completion.
    pub utterances: u64,
    /// Items dropped across all stage queues.
    pub queue_overflows: u64,
}

impl MetricsSnapshot {
    /// Arithmetic mean latency for a stage in milliseconds (0 with no samples).
    pub fn mean_ms(&self, stage: Stage) -> f64 {
        self.means_ms[stage.index()]
    }

    /// Number of samples recorded for a stage.
    pub fn count(&self, stage: Stage) -> u64 {
        self.counts[stage.index()]
    }
}

/// Collects per-stage latencies and pipeline counters.
///
/// `record` holds a mutex only long enough to bump a sum and a count, and
/// `snapshot` is safe to call concurrently with recording.
pub struct MetricsRecorder {
    stages: Mutex<[StageAccum; Stage::ALL.len()]>,
    utterances: AtomicU64,
    overflows: Arc<AtomicU64>,
}

impl MetricsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            stages: Mutex::new([StageAccum::default(); Stage::ALL.len()]),
            utterances: AtomicU64::new(0),
            overflows: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one latency sample for a stage.
    pub fn record(&self, stage: Stage, latency: Duration) {
        let mut stages = self.stages.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let accum = &mut stages[stage.index()];
        accum.total += latency;
        accum.count += 1;
    }

    /// Increments the processed-utterance counter.
    pub fn bump_utterances(&self) {
        self.utterances.fetch_add(1, Ordering::Relaxed);
    }

    /// Shared counter handed to stage queues for overflow accounting.
    pub fn overflow_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.overflows)
    }

    /// Takes an immutable snapshot of everything recorded so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let stages = self.stages.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut means_ms = [0.0; Stage::ALL.len()];
        let mut counts = [0; Stage::ALL.len()];
        for (i, accum) in stages.iter().enumerate() {
            counts[i] = accum.count;
            if accum.count > 0 {
                means_ms[i] = accum.total.as_secs_f64() * 1000.0 / accum.count as f64;
            }
        }
        MetricsSnapshot {
            means_ms,
            counts,
            utterances: self.utterances.load(Ordering::Relaxed),
            queue_overflows: self.overflows.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
