//! Typed pipeline events and the multi-subscriber bus that carries them.

use crate::defaults;
use crate::nlp::Intent;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Mutex;

/// Events the pipeline publishes to the host application.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The segmenter opened an utterance.
    SpeechStarted,
    /// The segmenter closed an utterance.
    SpeechEnded,
    /// Recognition produced non-empty text.
    TranscriptionAvailable { text: String, confidence: f32 },
    /// The intent stage classified a transcription.
    IntentClassified { intent: Intent },
    /// A response was generated for an utterance.
    ResponseReady { text: String },
    /// Synthesized audio started playing.
    SpeakingStarted,
    /// Playback of a response finished (or was cancelled).
    SpeakingEnded,
}

/// Multi-subscriber event bus.
///
/// Publishing never blocks a pipeline worker: each subscriber gets a bounded
/// channel, a full channel loses that event for that subscriber, and
/// disconnected subscribers are pruned on the next publish.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<PipelineEvent>>>,
    buffer: usize,
}

impl EventBus {
    /// Creates a bus with the default per-subscriber buffer.
    pub fn new() -> Self {
        Self::with_buffer(defaults::EVENT_BUFFER)
    }

    /// Creates a bus with a custom per-subscriber buffer.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            buffer,
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        let (tx, rx) = bounded(self.buffer);
        self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(tx);
        rx
    }

    /// Publishes an event to every live subscriber.
    pub fn publish(&self, event: &PipelineEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_subscriber_receives_events() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        bus.publish(&PipelineEvent::SpeechStarted);
        bus.publish(&PipelineEvent::SpeechEnded);

        assert!(matches!(rx.recv().unwrap(), PipelineEvent::SpeechStarted));
        assert!(matches!(rx.recv().unwrap(), PipelineEvent::SpeechEnded));
    }

    #[test]
    fn test_multiple_subscribers_each_receive_every_event() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(&PipelineEvent::SpeakingStarted);

        assert!(matches!(rx1.recv().unwrap(), PipelineEvent::SpeakingStarted));
        assert!(matches!(rx2.recv().unwrap(), PipelineEvent::SpeakingStarted));
    }

    #[test]
    fn test_slow_subscriber_loses_events_but_never_blocks() {
        let bus = EventBus::with_buffer(2);
        let rx = bus.subscribe();

        for _ in 0..5 {
            bus.publish(&PipelineEvent::SpeechStarted);
        }

        // Only the buffered two arrive; the publish calls all returned.
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_disconnected_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let _rx_live = bus.subscribe();
        drop(rx);

        bus.publish(&PipelineEvent::SpeechEnded);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish(&PipelineEvent::SpeakingEnded);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_payloads_round_trip() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        bus.publish(&PipelineEvent::TranscriptionAvailable {
            text: "hello there".to_string(),
            confidence: 0.87,
        });

        match rx.recv().unwrap() {
            PipelineEvent::TranscriptionAvailable { text, confidence } => {
                assert_eq!(text, "hello there");
                assert!((confidence - 0.87).abs() < f32::EPSILON);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
