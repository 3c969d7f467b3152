//! End-to-end pipeline tests over mock engines.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use voxpipe::audio::sink::{AudioSink, MockAudioSink};
use voxpipe::audio::source::MockAudioSource;
use voxpipe::error::Result;
use voxpipe::nlp::{Intent, IntentClassifier};
use voxpipe::pipeline::events::PipelineEvent;
use voxpipe::pipeline::queue::StageQueue;
use voxpipe::pipeline::types::StageItem;
use voxpipe::response::MockResponder;
use voxpipe::stt::MockRecognizer;
use voxpipe::tts::MockSynthesizer;
use voxpipe::vad::EnergyClassifier;
use voxpipe::{Engines, PipelineConfig, VoicePipeline};

/// Classifier that names the intent after the transcription, so responses
/// stay distinguishable per utterance.
struct TextIntent;

impl IntentClassifier for TextIntent {
    fn classify(&self, text: &str) -> Intent {
        Intent {
            name: text.to_string(),
            confidence: 1.0,
            entities: HashMap::new(),
        }
    }
}

/// Sink whose blocking writes only return once the queue drains — either the
/// simulated playback duration elapses or a barge-in clears it.
struct SlowSink {
    queued: Mutex<Vec<f32>>,
    clear_count: AtomicUsize,
    max_block: Duration,
}

impl SlowSink {
    fn new(max_block: Duration) -> Self {
        Self {
            queued: Mutex::new(Vec::new()),
            clear_count: AtomicUsize::new(0),
            max_block,
        }
    }

    fn clears(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

impl AudioSink for SlowSink {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn write(&self, samples: &[f32], blocking: bool) -> Result<()> {
        self.queued.lock().unwrap().extend_from_slice(samples);
        if blocking {
            let deadline = Instant::now() + self.max_block;
            loop {
                if self.pending() == 0 {
                    break; // cleared from the interruption path
                }
                if Instant::now() >= deadline {
                    self.queued.lock().unwrap().clear(); // playback finished
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(())
    }

    fn clear(&self) {
        self.queued.lock().unwrap().clear();
        self.clear_count.fetch_add(1, Ordering::SeqCst);
    }

    fn pending(&self) -> usize {
        self.queued.lock().unwrap().len()
    }
}

/// Zero-mean square wave so the frames survive DC removal in conditioning.
fn loud_samples() -> Vec<f32> {
    (0..480)
        .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect()
}

fn silence() -> Vec<f32> {
    vec![0.0; 480]
}

/// Appends one spoken utterance (trigger burst + releasing silence).
fn with_utterance(source: MockAudioSource) -> MockAudioSource {
    source
        .with_phase(loud_samples(), 12)
        .with_phase(silence(), 12)
}

fn collect_events_until(
    events: &crossbeam_channel::Receiver<PipelineEvent>,
    mut done: impl FnMut(&[PipelineEvent]) -> bool,
    timeout: Duration,
) -> Vec<PipelineEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while Instant::now() < deadline && !done(&seen) {
        if let Ok(event) = events.recv_timeout(Duration::from_millis(50)) {
            seen.push(event);
        }
    }
    seen
}

#[test]
fn responses_preserve_utterance_order() {
    // Three utterances in, three responses out, same order.
    let mut source = MockAudioSource::new().with_phase(silence(), 5);
    for _ in 0..3 {
        source = with_utterance(source);
    }

    let recognizer = MockRecognizer::new()
        .with_response("one")
        .with_response("two")
        .with_response("three");

    let engines = Engines {
        source: Box::new(source),
        sink: Arc::new(MockAudioSink::new()),
        classifier: Arc::new(EnergyClassifier::new(0.02)),
        recognizer: Arc::new(recognizer),
        intents: Arc::new(TextIntent),
        responder: Arc::new(MockResponder::new()),
        synthesizer: Arc::new(MockSynthesizer::new()),
    };

    let mut pipeline = VoicePipeline::new(PipelineConfig::default(), engines);
    let events = pipeline.subscribe();
    pipeline.start().unwrap();

    let seen = collect_events_until(
        &events,
        |seen| {
            seen.iter()
                .filter(|e| matches!(e, PipelineEvent::SpeakingEnded))
                .count()
                >= 3
        },
        Duration::from_secs(5),
    );
    pipeline.stop().unwrap();

    let responses: Vec<String> = seen
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::ResponseReady { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        responses,
        vec![
            "response to one".to_string(),
            "response to two".to_string(),
            "response to three".to_string(),
        ]
    );

    let starts = seen
        .iter()
        .filter(|e| matches!(e, PipelineEvent::SpeechStarted))
        .count();
    assert_eq!(starts, 3, "each utterance triggers exactly one speech-start");

    assert_eq!(pipeline.metrics_snapshot().utterances, 3);
}

#[test]
fn barge_in_cancels_playback() {
    // The second utterance arrives while the first response is still
    // playing; the synthesizer must be cancelled and the sink drained
    // before the new utterance proceeds.
    let source = with_utterance(with_utterance(
        MockAudioSource::new().with_phase(silence(), 5),
    ))
    .with_frame_delay(Duration::from_millis(10));

    let sink = Arc::new(SlowSink::new(Duration::from_secs(2)));
    let synthesizer = Arc::new(MockSynthesizer::new());

    let engines = Engines {
        source: Box::new(source),
        sink: sink.clone() as Arc<dyn AudioSink>,
        classifier: Arc::new(EnergyClassifier::new(0.02)),
        recognizer: Arc::new(
            MockRecognizer::new()
                .with_response("first thing")
                .with_response("second thing"),
        ),
        intents: Arc::new(TextIntent),
        responder: Arc::new(MockResponder::new()),
        synthesizer: synthesizer.clone(),
    };

    let mut pipeline = VoicePipeline::new(PipelineConfig::default(), engines);
    let events = pipeline.subscribe();
    pipeline.start().unwrap();

    let seen = collect_events_until(
        &events,
        |seen| {
            seen.iter()
                .filter(|e| matches!(e, PipelineEvent::ResponseReady { .. }))
                .count()
                >= 2
        },
        Duration::from_secs(5),
    );

    assert!(pipeline.is_running(), "barge-in must not stop the pipeline");
    pipeline.stop().unwrap();

    assert!(
        synthesizer.cancel_count() >= 1,
        "barge-in must cancel the synthesizer"
    );
    assert!(sink.clears() >= 1, "barge-in must clear the sink queue");
    assert_eq!(sink.pending(), 0);

    let responses: Vec<String> = seen
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::ResponseReady { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        responses,
        vec![
            "response to first thing".to_string(),
            "response to second thing".to_string(),
        ]
    );
}

#[test]
fn interruption_disabled_lets_playback_finish() {
    let source = with_utterance(with_utterance(
        MockAudioSource::new().with_phase(silence(), 5),
    ))
    .with_frame_delay(Duration::from_millis(5));

    let sink = Arc::new(SlowSink::new(Duration::from_millis(100)));
    let synthesizer = Arc::new(MockSynthesizer::new());

    let engines = Engines {
        source: Box::new(source),
        sink: sink.clone() as Arc<dyn AudioSink>,
        classifier: Arc::new(EnergyClassifier::new(0.02)),
        recognizer: Arc::new(
            MockRecognizer::new()
                .with_response("first")
                .with_response("second"),
        ),
        intents: Arc::new(TextIntent),
        responder: Arc::new(MockResponder::new()),
        synthesizer: synthesizer.clone(),
    };

    let config = PipelineConfig {
        enable_interruption: false,
        ..Default::default()
    };
    let mut pipeline = VoicePipeline::new(config, engines);
    let events = pipeline.subscribe();
    pipeline.start().unwrap();

    collect_events_until(
        &events,
        |seen| {
            seen.iter()
                .filter(|e| matches!(e, PipelineEvent::SpeakingEnded))
                .count()
                >= 2
        },
        Duration::from_secs(5),
    );
    pipeline.stop().unwrap();

    assert_eq!(synthesizer.cancel_count(), 0);
    assert_eq!(sink.clears(), 0);
}

#[test]
fn queue_overflow_counter_matches_dropped_items() {
    // Bound of 4, 10 pushes in rapid succession: 6 dropped, bound never
    // exceeded.
    let queue: StageQueue<u32> = StageQueue::new(4);
    for i in 0..10 {
        queue.push(StageItem::new(i, Instant::now()));
        assert!(queue.len() <= 4);
    }
    assert_eq!(queue.overflow_count(), 6);
}
