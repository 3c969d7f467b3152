//! WAV file audio source for offline runs and tests.

use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, VoxpipeError};
use crate::pipeline::types::Frame;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};

/// Audio source that reads from WAV file data.
///
/// Supports arbitrary sample rates and channels, resampling to the pipeline
/// rate and mixing to mono. Frames come out at the pipeline frame length;
/// exhaustion reads as `None`.
pub struct WavAudioSource {
    samples: Vec<f32>,
    position: usize,
    frame_len: usize,
    sequence: u64,
}

impl WavAudioSource {
    /// Create from a WAV file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| VoxpipeError::Wav {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(std::io::Cursor::new(data)))
    }

    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoxpipeError::Wav {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let source_channels = spec.channels as usize;

        let raw_samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .map_err(|e| VoxpipeError::Wav {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        // Mix to mono by averaging channels
        let mono_samples: Vec<f32> = if source_channels <= 1 {
            raw_samples
        } else {
            raw_samples
                .chunks_exact(source_channels)
                .map(|chunk| chunk.iter().sum::<f32>() / source_channels as f32)
                .collect()
        };

        let samples = if source_rate != defaults::SAMPLE_RATE {
            resample(&mono_samples, source_rate, defaults::SAMPLE_RATE)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            position: 0,
            frame_len: defaults::frame_samples(defaults::SAMPLE_RATE, defaults::FRAME_MS),
            sequence: 0,
        })
    }

    /// Override the frame length (in samples).
    pub fn with_frame_len(mut self, frame_len: usize) -> Self {
        self.frame_len = frame_len.max(1);
        self
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self, _timeout: Duration) -> Result<Option<Frame>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }

        let end = std::cmp::min(self.position + self.frame_len, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        let sequence = self.sequence;
        self.sequence += 1;
        Ok(Some(Frame::new(chunk, Instant::now(), sequence)))
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_wav_source_reads_frames_until_exhausted() {
        let bytes = wav_bytes(16000, 1, &vec![1000i16; 960]);
        let mut source = WavAudioSource::from_reader(Box::new(Cursor::new(bytes))).unwrap();

        let first = source.read(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(first.samples.len(), 480);
        let second = source.read(Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(second.samples.len(), 480);
        assert!(source.read(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn test_wav_source_is_finite() {
        let bytes = wav_bytes(16000, 1, &[0i16; 16]);
        let source = WavAudioSource::from_reader(Box::new(Cursor::new(bytes))).unwrap();
        assert!(source.is_finite());
    }

    #[test]
    fn test_wav_source_mixes_stereo_to_mono() {
        // Left 2000, right 0 → mono 1000.
        let mut interleaved = Vec::new();
        for _ in 0..480 {
            interleaved.push(2000i16);
            interleaved.push(0i16);
        }
        let bytes = wav_bytes(16000, 2, &interleaved);
        let source = WavAudioSource::from_reader(Box::new(Cursor::new(bytes))).unwrap();

        let samples = source.into_samples();
        assert_eq!(samples.len(), 480);
        let expected = 1000.0 / i16::MAX as f32;
        assert!((samples[0] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_wav_source_resamples_to_pipeline_rate() {
        let bytes = wav_bytes(8000, 1, &vec![500i16; 800]);
        let source = WavAudioSource::from_reader(Box::new(Cursor::new(bytes))).unwrap();

        // 100ms at 8kHz becomes ~100ms at 16kHz.
        let samples = source.into_samples();
        assert!((samples.len() as i64 - 1600).abs() <= 2, "{}", samples.len());
    }

    #[test]
    fn test_invalid_wav_data_errors() {
        let result = WavAudioSource::from_reader(Box::new(Cursor::new(vec![0u8; 16])));
        assert!(matches!(result, Err(VoxpipeError::Wav { .. })));
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }
}
