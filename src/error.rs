//! Error types for voxpipe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxpipeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio device errors — fatal, surface from start()
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // WAV file source errors
    #[error("WAV read failed: {message}")]
    Wav { message: String },

    // Transient stage errors — caught in workers, never stop the pipeline
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // Shutdown errors
    #[error("Shutdown timed out: {stalled} worker(s) still running")]
    ShutdownTimeout { stalled: usize },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxpipeError>;
