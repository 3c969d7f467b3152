//! Pipeline orchestrator: wires capture → segmentation → recognition →
//! intent → response → synthesis → playback and owns the worker threads.

use crate::audio::conditioner::{ConditionerConfig, FrameConditioner};
use crate::audio::sink::AudioSink;
use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, VoxpipeError};
use crate::nlp::{ContextWindow, Intent, IntentClassifier, Speaker, Turn};
use crate::pipeline::events::{EventBus, PipelineEvent};
use crate::pipeline::interrupt::InterruptionController;
use crate::pipeline::metrics::{MetricsRecorder, MetricsSnapshot, Stage};
use crate::pipeline::queue::StageQueue;
use crate::pipeline::types::{StageItem, Utterance};
use crate::response::ResponseGenerator;
use crate::stt::{Recognizer, Transcription};
use crate::tts::Synthesizer;
use crate::vad::FrameSpeechClassifier;
use crate::vad::segmenter::{SegmentEvent, SegmenterConfig, VoiceActivitySegmenter};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Consecutive capture failures tolerated before the capture worker gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sample rate the whole pipeline runs at.
    pub sample_rate: u32,
    /// Frame duration in milliseconds.
    pub frame_ms: u32,
    /// Frame conditioning configuration.
    pub conditioner: ConditionerConfig,
    /// Utterance segmentation configuration.
    pub segmenter: SegmenterConfig,
    /// Whether user speech cancels in-flight output (barge-in).
    pub enable_interruption: bool,
    /// Bound of the segmentation → recognition queue.
    pub utterance_buffer: usize,
    /// Bound of the intent → response queue.
    pub response_buffer: usize,
    /// Audio source read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Stage queue pop timeout in milliseconds.
    pub pop_timeout_ms: u64,
    /// Worker join deadline on stop, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_ms: defaults::FRAME_MS,
            conditioner: ConditionerConfig::default(),
            segmenter: SegmenterConfig::default(),
            enable_interruption: true,
            utterance_buffer: defaults::UTTERANCE_BUFFER,
            response_buffer: defaults::RESPONSE_BUFFER,
            read_timeout_ms: defaults::READ_TIMEOUT_MS,
            pop_timeout_ms: defaults::POP_TIMEOUT_MS,
            join_timeout_ms: defaults::JOIN_TIMEOUT_MS,
        }
    }
}

impl PipelineConfig {
    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// The swappable engines the pipeline drives.
pub struct Engines {
    /// Audio capture device.
    pub source: Box<dyn AudioSource>,
    /// Audio playback device.
    pub sink: Arc<dyn AudioSink>,
    /// Per-frame speech/silence decision.
    pub classifier: Arc<dyn FrameSpeechClassifier>,
    /// Speech-to-text.
    pub recognizer: Arc<dyn Recognizer>,
    /// Intent classification.
    pub intents: Arc<dyn IntentClassifier>,
    /// Response generation.
    pub responder: Arc<dyn ResponseGenerator>,
    /// Text-to-speech.
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Lifecycle state of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Real-time voice conversation pipeline.
///
/// One session is active per instance: `start` acquires the audio devices
/// and spawns one worker per stage group, `stop` cancels cooperatively and
/// joins the workers against a bounded deadline. The only state shared
/// between workers is the running flag and the speaking flag, both atomic;
/// everything else moves through bounded stage queues.
pub struct VoicePipeline {
    config: PipelineConfig,
    source: Arc<Mutex<Box<dyn AudioSource>>>,
    sink: Arc<dyn AudioSink>,
    classifier: Arc<dyn FrameSpeechClassifier>,
    recognizer: Arc<dyn Recognizer>,
    intents: Arc<dyn IntentClassifier>,
    responder: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsRecorder>,
    context: Arc<Mutex<ContextWindow>>,
    running: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
    state: PipelineState,
    workers: Vec<JoinHandle<()>>,
    /// Set when a shutdown deadline expired with workers still running; the
    /// pipeline must be reconstructed before it can start again.
    poisoned: bool,
}

impl VoicePipeline {
    /// Creates a pipeline over the given engines.
    pub fn new(config: PipelineConfig, engines: Engines) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(engines.source)),
            sink: engines.sink,
            classifier: engines.classifier,
            recognizer: engines.recognizer,
            intents: engines.intents,
            responder: engines.responder,
            synthesizer: engines.synthesizer,
            events: Arc::new(EventBus::new()),
            metrics: Arc::new(MetricsRecorder::new()),
            context: Arc::new(Mutex::new(ContextWindow::new())),
            running: Arc::new(AtomicBool::new(false)),
            speaking: Arc::new(AtomicBool::new(false)),
            state: PipelineState::Stopped,
            workers: Vec::new(),
            poisoned: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether synthesized output is currently playing.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Registers an event subscriber.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Snapshot of accumulated latency statistics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Copy of the retained conversation turns, oldest first.
    pub fn conversation(&self) -> Vec<Turn> {
        self.context
            .lock()
            .map(|c| c.turns().cloned().collect())
            .unwrap_or_default()
    }

    /// Starts the pipeline.
    ///
    /// Idempotent: a no-op when already running. Device acquisition failures
    /// are fatal and leave the pipeline stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.state == PipelineState::Running {
            debug!("pipeline already running");
            return Ok(());
        }
        if self.poisoned {
            return Err(VoxpipeError::Other(
                "pipeline unusable after shutdown timeout; reconstruct it".to_string(),
            ));
        }

        self.state = PipelineState::Starting;
        info!("starting voice pipeline");

        // Acquire the audio devices before any worker exists.
        {
            let mut source = self
                .source
                .lock()
                .map_err(|e| VoxpipeError::AudioCapture {
                    message: format!("Failed to lock audio source: {}", e),
                })?;
            if let Err(e) = source.start() {
                self.state = PipelineState::Stopped;
                return Err(e);
            }
        }
        if let Err(e) = self.sink.start() {
            if let Ok(mut source) = self.source.lock()
                && let Err(stop_err) = source.stop()
            {
                warn!("failed to release audio source: {}", stop_err);
            }
            self.state = PipelineState::Stopped;
            return Err(e);
        }

        self.running.store(true, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);

        let utterance_queue = Arc::new(StageQueue::with_overflow_counter(
            self.config.utterance_buffer,
            self.metrics.overflow_counter(),
        ));
        let response_queue = Arc::new(StageQueue::with_overflow_counter(
            self.config.response_buffer,
            self.metrics.overflow_counter(),
        ));

        let capture = {
            let running = Arc::clone(&self.running);
            let source = Arc::clone(&self.source);
            let classifier = Arc::clone(&self.classifier);
            let conditioner =
                FrameConditioner::new(self.config.conditioner, self.config.sample_rate);
            let segmenter =
                VoiceActivitySegmenter::new(self.config.segmenter, self.config.frame_ms);
            let interrupter = InterruptionController::new(
                Arc::clone(&self.synthesizer),
                Arc::clone(&self.sink),
                Arc::clone(&self.speaking),
            );
            let enable_interruption = self.config.enable_interruption;
            let queue = Arc::clone(&utterance_queue);
            let events = Arc::clone(&self.events);
            let read_timeout = self.config.read_timeout();
            thread::spawn(move || {
                capture_worker(
                    running,
                    source,
                    classifier,
                    conditioner,
                    segmenter,
                    interrupter,
                    enable_interruption,
                    queue,
                    events,
                    read_timeout,
                );
            })
        };

        let recognition = {
            let running = Arc::clone(&self.running);
            let utterance_queue = Arc::clone(&utterance_queue);
            let response_queue = Arc::clone(&response_queue);
            let recognizer = Arc::clone(&self.recognizer);
            let intents = Arc::clone(&self.intents);
            let context = Arc::clone(&self.context);
            let metrics = Arc::clone(&self.metrics);
            let events = Arc::clone(&self.events);
            let pop_timeout = self.config.pop_timeout();
            thread::spawn(move || {
                recognition_worker(
                    running,
                    utterance_queue,
                    response_queue,
                    recognizer,
                    intents,
                    context,
                    metrics,
                    events,
                    pop_timeout,
                );
            })
        };

        let playback = {
            let running = Arc::clone(&self.running);
            let response_queue = Arc::clone(&response_queue);
            let responder = Arc::clone(&self.responder);
            let synthesizer = Arc::clone(&self.synthesizer);
            let sink = Arc::clone(&self.sink);
            let context = Arc::clone(&self.context);
            let speaking = Arc::clone(&self.speaking);
            let metrics = Arc::clone(&self.metrics);
            let events = Arc::clone(&self.events);
            let pop_timeout = self.config.pop_timeout();
            thread::spawn(move || {
                playback_worker(
                    running,
                    response_queue,
                    responder,
                    synthesizer,
                    sink,
                    context,
                    speaking,
                    metrics,
                    events,
                    pop_timeout,
                );
            })
        };

        self.workers = vec![capture, recognition, playback];
        self.state = PipelineState::Running;
        info!("voice pipeline running");
        Ok(())
    }

    /// Stops the pipeline.
    ///
    /// Signals cancellation, releases the audio devices and joins every
    /// worker. A worker that fails to exit within the configured deadline is
    /// a [`VoxpipeError::ShutdownTimeout`]; the pipeline is then unusable
    /// until reconstructed.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == PipelineState::Stopped && self.workers.is_empty() {
            return Ok(());
        }

        self.state = PipelineState::Stopping;
        info!("stopping voice pipeline");
        self.running.store(false, Ordering::SeqCst);

        // Release the devices. The capture worker also stops the source on
        // exit; stopping twice is harmless.
        if let Ok(mut source) = self.source.lock()
            && let Err(e) = source.stop()
        {
            warn!("failed to stop audio source: {}", e);
        }
        if let Err(e) = self.sink.stop() {
            warn!("failed to stop audio sink: {}", e);
        }

        let deadline = Instant::now() + self.config.join_timeout();
        let poll = Duration::from_millis(20);

        loop {
            let mut remaining = Vec::new();
            for handle in self.workers.drain(..) {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        error!("pipeline worker panicked");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.workers = remaining;

            if self.workers.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                let stalled = self.workers.len();
                error!(stalled, "workers failed to exit before shutdown deadline");
                // Dropping the handles detaches the threads; the pipeline is
                // no longer trustworthy.
                self.workers.clear();
                self.poisoned = true;
                self.state = PipelineState::Stopped;
                return Err(VoxpipeError::ShutdownTimeout { stalled });
            }
            thread::sleep(poll);
        }

        self.state = PipelineState::Stopped;
        info!("voice pipeline stopped");
        Ok(())
    }
}

/// Capture + segmentation worker: audio source → conditioner → classifier →
/// segmenter → utterance queue.
#[allow(clippy::too_many_arguments)]
fn capture_worker(
    running: Arc<AtomicBool>,
    source: Arc<Mutex<Box<dyn AudioSource>>>,
    classifier: Arc<dyn FrameSpeechClassifier>,
    conditioner: FrameConditioner,
    mut segmenter: VoiceActivitySegmenter,
    interrupter: InterruptionController,
    enable_interruption: bool,
    utterance_queue: Arc<StageQueue<Utterance>>,
    events: Arc<EventBus>,
    read_timeout: Duration,
) {
    debug!("capture worker started");
    let mut consecutive_errors: u32 = 0;

    while running.load(Ordering::SeqCst) {
        let read = {
            let mut source = match source.lock() {
                Ok(source) => source,
                Err(_) => {
                    error!("audio source lock poisoned; capture worker exiting");
                    break;
                }
            };
            source.read(read_timeout)
        };

        let mut frame = match read {
            Ok(Some(frame)) => {
                consecutive_errors = 0;
                frame
            }
            Ok(None) => {
                let finite = source.lock().map(|s| s.is_finite()).unwrap_or(true);
                if finite {
                    debug!("audio source exhausted, capture worker exiting");
                    break;
                }
                // Live source: empty reads are normal while the device warms
                // up or between callbacks.
                continue;
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!("audio read failed: {}", e);
                if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    error!(
                        "giving up after {} consecutive capture errors",
                        consecutive_errors
                    );
                    break;
                }
                continue;
            }
        };

        conditioner.condition(&mut frame.samples);
        let voiced = classifier.is_speech(&frame);

        match segmenter.push(frame, voiced) {
            Some(SegmentEvent::SpeechStart) => {
                debug!("speech started");
                events.publish(&PipelineEvent::SpeechStarted);
                // Barge-in: cancel output before this utterance's frames
                // continue, so the cleared queues cannot pick up stale audio.
                if enable_interruption && interrupter.is_speaking() {
                    interrupter.interrupt();
                }
            }
            Some(SegmentEvent::SpeechEnd(utterance)) => {
                debug!(frames = utterance.frames, "speech ended");
                events.publish(&PipelineEvent::SpeechEnded);
                let accepted_at = utterance.started_at;
                if !utterance_queue.push(StageItem::new(utterance, accepted_at)) {
                    warn!("utterance queue full, dropping utterance");
                }
            }
            None => {}
        }
    }

    if let Ok(mut source) = source.lock()
        && let Err(e) = source.stop()
    {
        warn!("failed to stop audio source: {}", e);
    }
    debug!("capture worker stopped");
}

/// Recognition + intent worker: utterance queue → recognizer → intent
/// classifier → response queue.
#[allow(clippy::too_many_arguments)]
fn recognition_worker(
    running: Arc<AtomicBool>,
    utterance_queue: Arc<StageQueue<Utterance>>,
    response_queue: Arc<StageQueue<Intent>>,
    recognizer: Arc<dyn Recognizer>,
    intents: Arc<dyn IntentClassifier>,
    context: Arc<Mutex<ContextWindow>>,
    metrics: Arc<MetricsRecorder>,
    events: Arc<EventBus>,
    pop_timeout: Duration,
) {
    debug!("recognition worker started");

    while running.load(Ordering::SeqCst) {
        let Some(item) = utterance_queue.pop(pop_timeout) else {
            continue;
        };
        let utterance = item.payload;
        let accepted_at = item.accepted_at;

        let started = Instant::now();
        let transcription = match recognizer.transcribe(&utterance.samples) {
            Ok(transcription) => transcription,
            Err(e) => {
                warn!("transcription failed, dropping utterance: {}", e);
                Transcription::empty()
            }
        };
        metrics.record(Stage::Recognition, started.elapsed());

        let text = transcription.text.trim();
        if text.is_empty() {
            // Nothing usable was heard; not an error.
            debug!("empty transcription, skipping");
            continue;
        }
        let text = text.to_string();

        events.publish(&PipelineEvent::TranscriptionAvailable {
            text: text.clone(),
            confidence: transcription.confidence,
        });

        let started = Instant::now();
        let intent = intents.classify(&text);
        metrics.record(Stage::Intent, started.elapsed());

        if let Ok(mut context) = context.lock() {
            context.add_turn(Speaker::User, &text);
        }
        events.publish(&PipelineEvent::IntentClassified {
            intent: intent.clone(),
        });

        if !response_queue.push(StageItem::new(intent, accepted_at)) {
            warn!("response queue full, dropping intent");
        }
    }
    debug!("recognition worker stopped");
}

/// Response + synthesis + playback worker: response queue → responder →
/// synthesizer → audio sink.
#[allow(clippy::too_many_arguments)]
fn playback_worker(
    running: Arc<AtomicBool>,
    response_queue: Arc<StageQueue<Intent>>,
    responder: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
    context: Arc<Mutex<ContextWindow>>,
    speaking: Arc<AtomicBool>,
    metrics: Arc<MetricsRecorder>,
    events: Arc<EventBus>,
    pop_timeout: Duration,
) {
    debug!("playback worker started");

    while running.load(Ordering::SeqCst) {
        let Some(item) = response_queue.pop(pop_timeout) else {
            continue;
        };
        let intent = item.payload;

        let started = Instant::now();
        let reply = responder.generate(&intent);
        metrics.record(Stage::Response, started.elapsed());

        if let Ok(mut context) = context.lock() {
            context.add_turn(Speaker::Assistant, &reply.text);
        }
        events.publish(&PipelineEvent::ResponseReady {
            text: reply.text.clone(),
        });

        let started = Instant::now();
        let audio = match synthesizer.synthesize(&reply.text) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("synthesis failed, dropping response: {}", e);
                continue;
            }
        };
        metrics.record(Stage::Synthesis, started.elapsed());

        if !audio.is_empty() {
            speaking.store(true, Ordering::SeqCst);
            events.publish(&PipelineEvent::SpeakingStarted);
            if let Err(e) = sink.write(&audio, true) {
                warn!("playback failed: {}", e);
            }
            speaking.store(false, Ordering::SeqCst);
            events.publish(&PipelineEvent::SpeakingEnded);
        }

        metrics.record(Stage::Total, item.accepted_at.elapsed());
        metrics.bump_utterances();
    }
    debug!("playback worker stopped");
}
