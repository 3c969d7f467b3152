//! Real-time conversation pipeline.
//!
//! Three workers — capture+segmentation, recognition+intent,
//! response+synthesis+playback — connected by bounded stage queues. FIFO
//! order is preserved end-to-end because every queue has exactly one
//! consuming worker.

pub mod events;
pub mod interrupt;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod types;

pub use events::{EventBus, PipelineEvent};
pub use interrupt::InterruptionController;
pub use metrics::{MetricsRecorder, MetricsSnapshot, Stage};
pub use orchestrator::{Engines, PipelineConfig, PipelineState, VoicePipeline};
pub use queue::StageQueue;
pub use types::{Frame, StageItem, Utterance};
