//! TOML-backed configuration.

use crate::audio::conditioner::ConditionerConfig;
use crate::defaults;
use crate::pipeline::orchestrator::PipelineConfig;
use crate::vad::segmenter::SegmenterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub conditioner: ConditionerConfig,
    pub segmenter: SegmenterConfig,
    pub pipeline: PipelineTuning,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name (None for the system default).
    pub device: Option<String>,
    /// Output device name (None for the system default).
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub frame_ms: u32,
    /// RMS threshold for the energy-based speech classifier.
    pub speech_threshold: f32,
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineTuning {
    pub enable_interruption: bool,
    pub utterance_buffer: usize,
    pub response_buffer: usize,
    pub read_timeout_ms: u64,
    pub pop_timeout_ms: u64,
    pub join_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            output_device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_ms: defaults::FRAME_MS,
            speech_threshold: defaults::SPEECH_THRESHOLD,
        }
    }
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            enable_interruption: true,
            utterance_buffer: defaults::UTTERANCE_BUFFER,
            response_buffer: defaults::RESPONSE_BUFFER,
            read_timeout_ms: defaults::READ_TIMEOUT_MS,
            pop_timeout_ms: defaults::POP_TIMEOUT_MS,
            join_timeout_ms: defaults::JOIN_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file is
    /// missing or unparseable (the parse failure is logged).
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    warn!("ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            }
        }
    }

    /// Builds the runtime pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sample_rate: self.audio.sample_rate,
            frame_ms: self.audio.frame_ms,
            conditioner: self.conditioner,
            segmenter: self.segmenter,
            enable_interruption: self.pipeline.enable_interruption,
            utterance_buffer: self.pipeline.utterance_buffer,
            response_buffer: self.pipeline.response_buffer,
            read_timeout_ms: self.pipeline.read_timeout_ms,
            pop_timeout_ms: self.pipeline.pop_timeout_ms,
            join_timeout_ms: self.pipeline.join_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.frame_ms, 30);
        assert!(config.audio.device.is_none());
        assert!(config.pipeline.enable_interruption);
        assert_eq!(config.segmenter.padding_ms, 300);
    }

    #[test]
    fn test_load_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[audio]\nsample_rate = 48000\n\n[segmenter]\nenter_fraction = 0.6"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.segmenter.enter_fraction, 0.6);
        // Untouched fields keep their defaults.
        assert_eq!(config.audio.frame_ms, 30);
        assert_eq!(config.segmenter.exit_fraction, 0.9);
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audio = {{ nope").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/voxpipe.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not toml at all [[[").unwrap();
        let config = Config::load_or_default(file.path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_round_trip_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_pipeline_config_mapping() {
        let mut config = Config::default();
        config.pipeline.enable_interruption = false;
        config.pipeline.utterance_buffer = 4;
        config.audio.sample_rate = 8000;

        let pipeline = config.pipeline_config();
        assert!(!pipeline.enable_interruption);
        assert_eq!(pipeline.utterance_buffer, 4);
        assert_eq!(pipeline.sample_rate, 8000);
    }
}
