//! voxpipe demo binary.
//!
//! Wires the pipeline with an audio device (or a WAV file) and scripted
//! transcriptions, prints pipeline events as they happen, and optionally
//! dumps a metrics snapshot on exit.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use voxpipe::audio::sink::{AudioSink, MockAudioSink};
use voxpipe::audio::source::AudioSource;
use voxpipe::audio::wav::WavAudioSource;
use voxpipe::nlp::KeywordIntentClassifier;
use voxpipe::pipeline::events::PipelineEvent;
use voxpipe::pipeline::metrics::Stage;
use voxpipe::response::TemplateResponder;
use voxpipe::stt::MockRecognizer;
use voxpipe::tts::MockSynthesizer;
use voxpipe::vad::EnergyClassifier;
use voxpipe::{Config, Engines, VoicePipeline};

#[derive(Parser)]
#[command(
    name = "voxpipe",
    version,
    about = "Real-time voice conversation pipeline demo"
)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drive the pipeline from a WAV file instead of the microphone
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Input device name (default: system default device)
    #[arg(long)]
    device: Option<String>,

    /// Play responses through the speakers instead of discarding them
    #[arg(long)]
    play: bool,

    /// Scripted transcription for each detected utterance (repeatable).
    /// Stands in for a real recognition model.
    #[arg(long = "transcript")]
    transcripts: Vec<String>,

    /// Seconds to run before stopping (default: run until Enter is pressed)
    #[arg(long)]
    duration: Option<u64>,

    /// Print a metrics snapshot on exit
    #[arg(long)]
    metrics: bool,
}

fn build_source(args: &Args, config: &Config) -> anyhow::Result<Box<dyn AudioSource>> {
    if let Some(path) = &args.wav {
        let source = WavAudioSource::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        return Ok(Box::new(source));
    }

    #[cfg(feature = "cpal-audio")]
    {
        let device = args.device.as_deref().or(config.audio.device.as_deref());
        let source = voxpipe::audio::capture::CpalAudioSource::new(device)
            .context("opening audio input device")?;
        Ok(Box::new(source))
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        anyhow::bail!("built without cpal-audio; pass --wav to use a file source")
    }
}

fn build_sink(args: &Args, config: &Config) -> anyhow::Result<Arc<dyn AudioSink>> {
    if args.play {
        #[cfg(feature = "cpal-audio")]
        {
            let device = config.audio.output_device.as_deref();
            let sink = voxpipe::audio::capture::CpalAudioSink::new(device)
                .context("opening audio output device")?;
            return Ok(Arc::new(sink));
        }
        #[cfg(not(feature = "cpal-audio"))]
        anyhow::bail!("built without cpal-audio; --play is unavailable");
    }
    let _ = config;
    Ok(Arc::new(MockAudioSink::new()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let source = build_source(&args, &config)?;
    let sink = build_sink(&args, &config)?;

    // No recognition model ships with the demo; scripted transcriptions
    // stand in, one per detected utterance.
    let mut recognizer = MockRecognizer::new();
    let transcripts = if args.transcripts.is_empty() {
        vec![
            "hello".to_string(),
            "how are you".to_string(),
            "goodbye".to_string(),
        ]
    } else {
        args.transcripts.clone()
    };
    for transcript in &transcripts {
        recognizer = recognizer.with_response(transcript);
    }

    let engines = Engines {
        source,
        sink,
        classifier: Arc::new(EnergyClassifier::new(config.audio.speech_threshold)),
        recognizer: Arc::new(recognizer),
        intents: Arc::new(KeywordIntentClassifier::new()),
        responder: Arc::new(TemplateResponder::new()),
        synthesizer: Arc::new(MockSynthesizer::new()),
    };

    let mut pipeline = VoicePipeline::new(config.pipeline_config(), engines);
    let events = pipeline.subscribe();

    let printer = std::thread::spawn(move || {
        while let Ok(event) = events.recv() {
            match event {
                PipelineEvent::SpeechStarted => println!("· listening..."),
                PipelineEvent::SpeechEnded => {}
                PipelineEvent::TranscriptionAvailable { text, confidence } => {
                    println!("you:      {text}  ({confidence:.2})");
                }
                PipelineEvent::IntentClassified { intent } => {
                    println!("intent:   {} ({:.2})", intent.name, intent.confidence);
                }
                PipelineEvent::ResponseReady { text } => println!("voxpipe:  {text}"),
                PipelineEvent::SpeakingStarted => {}
                PipelineEvent::SpeakingEnded => {}
            }
        }
    });

    pipeline.start().context("starting pipeline")?;

    match args.duration {
        Some(secs) => std::thread::sleep(std::time::Duration::from_secs(secs)),
        None => {
            println!("voxpipe running — press Enter to stop");
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
        }
    }

    pipeline.stop().context("stopping pipeline")?;

    if args.metrics {
        let snapshot = pipeline.metrics_snapshot();
        println!("utterances: {}", snapshot.utterances);
        println!("queue overflows: {}", snapshot.queue_overflows);
        for stage in Stage::ALL {
            println!(
                "{:<12} mean {:>7.1} ms  ({} samples)",
                stage.name(),
                snapshot.mean_ms(stage),
                snapshot.count(stage)
            );
        }
    }

    drop(pipeline);
    let _ = printer.join();
    Ok(())
}
