//! voxpipe - Real-time voice conversation pipeline
//!
//! Turns a continuous microphone signal into segmented utterances, routes
//! them through recognition, intent classification, response generation and
//! synthesis, and plays the result — including barge-in: user speech detected
//! while output is playing cancels that output immediately.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod nlp;
pub mod pipeline;
pub mod response;
pub mod stt;
pub mod tts;
pub mod vad;

// Core traits (source → stages → sink)
pub use audio::sink::AudioSink;
pub use audio::source::AudioSource;
pub use nlp::IntentClassifier;
pub use response::ResponseGenerator;
pub use stt::Recognizer;
pub use tts::Synthesizer;
pub use vad::FrameSpeechClassifier;

// Pipeline
pub use pipeline::events::PipelineEvent;
pub use pipeline::metrics::{MetricsSnapshot, Stage};
pub use pipeline::orchestrator::{Engines, PipelineConfig, PipelineState, VoicePipeline};

// Error handling
pub use error::{Result, VoxpipeError};

// Config
pub use config::Config;
