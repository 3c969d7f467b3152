//! Real audio capture and playback via CPAL.

use crate::audio::sink::AudioSink;
use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, VoxpipeError};
use crate::pipeline::types::Frame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only accessed from one thread at a time through the
/// Mutex wrapper in the owning source/sink; stream methods are called
/// synchronously and never cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

fn find_input_device(device_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => {
            let devices = host
                .input_devices()
                .map_err(|e| VoxpipeError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
            for dev in devices {
                if let Ok(dev_name) = dev.name()
                    && dev_name == name
                {
                    return Ok(dev);
                }
            }
            Err(VoxpipeError::AudioDeviceNotFound {
                device: name.to_string(),
            })
        }
        None => host
            .default_input_device()
            .ok_or_else(|| VoxpipeError::AudioDeviceNotFound {
                device: "default".to_string(),
            }),
    }
}

fn find_output_device(device_name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => {
            let devices = host
                .output_devices()
                .map_err(|e| VoxpipeError::AudioPlayback {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
            for dev in devices {
                if let Ok(dev_name) = dev.name()
                    && dev_name == name
                {
                    return Ok(dev);
                }
            }
            Err(VoxpipeError::AudioDeviceNotFound {
                device: name.to_string(),
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| VoxpipeError::AudioDeviceNotFound {
                device: "default".to_string(),
            }),
    }
}

/// Real microphone capture via CPAL.
///
/// Captures f32 mono at the pipeline sample rate. The input callback appends
/// into a shared buffer; `read` slices fixed-length frames off the front.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Mutex<Option<SendableStream>>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
    frame_len: usize,
    sequence: AtomicU64,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default input device.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_input_device(device_name)?;
        if let Ok(name) = device.name() {
            info!(device = %name, "using input device");
        }

        Ok(Self {
            device,
            stream: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
            frame_len: defaults::frame_samples(defaults::SAMPLE_RATE, defaults::FRAME_MS),
            sequence: AtomicU64::new(0),
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            warn!("audio input stream error: {}", err);
        };

        // f32 mono at the pipeline rate — PipeWire/PulseAudio convert
        // transparently; fall back to i16 for devices that only expose it.
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| VoxpipeError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| VoxpipeError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        if stream_guard.is_some() {
            return Ok(()); // Already started
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| VoxpipeError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut stream_guard = self.stream.lock().map_err(|e| VoxpipeError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        if let Some(stream) = stream_guard.take() {
            stream.0.pause().map_err(|e| VoxpipeError::AudioCapture {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<Frame>> {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(2);

        loop {
            {
                let mut buf = self.buffer.lock().map_err(|e| VoxpipeError::AudioCapture {
                    message: format!("Failed to lock capture buffer: {}", e),
                })?;
                if buf.len() >= self.frame_len {
                    let samples: Vec<f32> = buf.drain(..self.frame_len).collect();
                    let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(Frame::new(samples, Instant::now(), sequence)));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(poll);
        }
    }
}

/// Real speaker playback via CPAL.
///
/// Queued samples are drained by the output callback; the callback fills with
/// silence when the queue is empty, so an idle sink simply plays nothing.
pub struct CpalAudioSink {
    device: cpal::Device,
    stream: Mutex<Option<SendableStream>>,
    queue: Arc<Mutex<VecDeque<f32>>>,
    sample_rate: u32,
}

impl CpalAudioSink {
    /// Create a new CPAL audio sink.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default output device.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_output_device(device_name)?;
        if let Ok(name) = device.name() {
            info!(device = %name, "using output device");
        }

        Ok(Self {
            device,
            stream: Mutex::new(None),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue = Arc::clone(&self.queue);
        self.device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = match queue.lock() {
                        Ok(q) => q,
                        Err(_) => return,
                    };
                    for sample in data.iter_mut() {
                        *sample = queue.pop_front().unwrap_or(0.0);
                    }
                },
                |err| {
                    warn!("audio output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| VoxpipeError::AudioPlayback {
                message: format!("Failed to build output stream: {}", e),
            })
    }
}

impl AudioSink for CpalAudioSink {
    fn start(&self) -> Result<()> {
        let mut stream_guard = self
            .stream
            .lock()
            .map_err(|e| VoxpipeError::AudioPlayback {
                message: format!("Failed to lock stream: {}", e),
            })?;
        if stream_guard.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| VoxpipeError::AudioPlayback {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut stream_guard = self
            .stream
            .lock()
            .map_err(|e| VoxpipeError::AudioPlayback {
                message: format!("Failed to lock stream: {}", e),
            })?;
        if let Some(stream) = stream_guard.take() {
            stream.0.pause().map_err(|e| VoxpipeError::AudioPlayback {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        self.clear();
        Ok(())
    }

    fn write(&self, samples: &[f32], blocking: bool) -> Result<()> {
        {
            let mut queue = self.queue.lock().map_err(|e| VoxpipeError::AudioPlayback {
                message: format!("Failed to lock playback queue: {}", e),
            })?;
            queue.extend(samples.iter().copied());
        }

        if blocking {
            // Drains naturally at the sample rate; a clear() from the
            // interruption path empties the queue and releases the wait early.
            let poll = Duration::from_millis(10);
            loop {
                if self.pending() == 0 {
                    break;
                }
                std::thread::sleep(poll);
            }
        }
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
    }

    fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}
