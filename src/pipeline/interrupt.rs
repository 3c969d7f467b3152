//! Barge-in handling: cancel output the moment the user starts talking over it.

use crate::audio::sink::AudioSink;
use crate::tts::Synthesizer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Cancels in-flight synthesis and playback when new speech is detected
/// while output is playing.
///
/// Invoked synchronously from the capture worker, so cancellation completes
/// before the new utterance's frames continue downstream. Ordering matters:
/// the synthesizer is cancelled first so it stops producing, then the sink's
/// queue is cleared so nothing stale plays, then the speaking flag drops.
pub struct InterruptionController {
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
    speaking: Arc<AtomicBool>,
}

impl InterruptionController {
    /// Creates a controller over the playback path.
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        sink: Arc<dyn AudioSink>,
        speaking: Arc<AtomicBool>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            speaking,
        }
    }

    /// Whether output is currently playing.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Cancels synthesis and playback and clears the speaking flag.
    pub fn interrupt(&self) {
        info!("barge-in: cancelling active speech output");
        self.synthesizer.cancel();
        self.sink.clear();
        self.speaking.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::MockAudioSink;
    use crate::tts::MockSynthesizer;

    fn controller() -> (
        InterruptionController,
        Arc<MockSynthesizer>,
        Arc<MockAudioSink>,
        Arc<AtomicBool>,
    ) {
        let synthesizer = Arc::new(MockSynthesizer::new());
        let sink = Arc::new(MockAudioSink::new());
        let speaking = Arc::new(AtomicBool::new(false));
        let controller = InterruptionController::new(
            synthesizer.clone() as Arc<dyn Synthesizer>,
            sink.clone() as Arc<dyn AudioSink>,
            speaking.clone(),
        );
        (controller, synthesizer, sink, speaking)
    }

    #[test]
    fn test_interrupt_cancels_synthesis_and_clears_sink() {
        let (controller, synthesizer, sink, speaking) = controller();
        sink.write(&[0.1, 0.2, 0.3], false).unwrap();
        speaking.store(true, Ordering::SeqCst);

        controller.interrupt();

        assert_eq!(synthesizer.cancel_count(), 1);
        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.clears(), 1);
        assert!(!speaking.load(Ordering::SeqCst));
    }

    #[test]
    fn test_interrupt_when_idle_is_safe() {
        let (controller, synthesizer, sink, _speaking) = controller();

        // Nothing queued, nothing playing — still fine.
        controller.interrupt();

        assert_eq!(synthesizer.cancel_count(), 1);
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_is_speaking_tracks_shared_flag() {
        let (controller, _synthesizer, _sink, speaking) = controller();

        assert!(!controller.is_speaking());
        speaking.store(true, Ordering::SeqCst);
        assert!(controller.is_speaking());
    }
}
