use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::{
    AudioBuffer, AudioSink, ChatClient, Config, Pipeline, PipelineEvent, SpeechClient,
    WhisperClient, wav,
};

/// Talkback - voice-interaction pipeline
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TALKBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one utterance through the pipeline
    ///
    /// Reads the utterance from a WAV file in place of a live microphone.
    Ask {
        /// WAV file containing the utterance
        input: PathBuf,

        /// Write the synthesized reply here (requires a [synthesis] config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip synthesis even when the config enables it
        #[arg(long)]
        no_speech: bool,
    },
    /// Print format information for a WAV file
    WavInfo {
        /// WAV file to inspect
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config {
            api_key: std::env::var(talkback::config::API_KEY_ENV).ok(),
            ..Config::default()
        },
    };

    match cli.command {
        Command::Ask {
            input,
            output,
            no_speech,
        } => ask(&config, &input, output, no_speech).await,
        Command::WavInfo { file } => wav_info(&file),
    }
}

/// Run one utterance end to end
async fn ask(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    no_speech: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(input)?;
    let (format, utterance) = wav::decode(&bytes)?;
    tracing::info!(
        channels = format.channels,
        sample_rate = format.sample_rate,
        secs = utterance.duration_secs(),
        "loaded utterance"
    );

    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let transcriber = WhisperClient::new(&config.transcription, &api_key, timeout)?;
    let chat = ChatClient::new(&config.chat, config.api_key.as_deref(), timeout)?;

    let (mut pipeline, events) = Pipeline::new(
        Arc::new(transcriber),
        Arc::new(chat),
        config.transcription.language.clone(),
    );

    if let Some(synthesis) = config.synthesis.as_ref().filter(|_| !no_speech) {
        let synthesizer = SpeechClient::new(synthesis, &api_key, timeout)?;
        let sink = WavFileSink { path: output };
        pipeline = pipeline.with_synthesis(Arc::new(synthesizer), Arc::new(sink));
    }

    let printer = tokio::spawn(print_events(events));

    pipeline.start_recording()?;
    pipeline.finish_recording(utterance).await?;

    drop(pipeline);
    printer.await?;
    Ok(())
}

/// Relay pipeline events to the console
async fn print_events(mut events: tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::StateChanged(state) => tracing::debug!(?state, "state"),
            PipelineEvent::TranscriptReady(text) => println!("you said: {text}"),
            PipelineEvent::ReplyReady(text) => println!("reply: {text}"),
            PipelineEvent::StageFailed { state, message } => {
                tracing::error!(?state, "{message}");
            }
        }
    }
}

fn wav_info(file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)?;
    let (format, buffer) = wav::decode(&bytes)?;
    println!("channels:        {}", format.channels);
    println!("sample rate:     {} Hz", format.sample_rate);
    println!("bits per sample: {}", format.bits_per_sample);
    println!("frames:          {}", buffer.frame_count());
    println!("duration:        {:.2} s", buffer.duration_secs());
    Ok(())
}

/// Sink that re-encodes the decoded reply and writes it to a file
///
/// Stands in for a playback device; "playback" completes as soon as the
/// file is written.
struct WavFileSink {
    path: Option<PathBuf>,
}

#[async_trait]
impl AudioSink for WavFileSink {
    async fn play(&self, audio: AudioBuffer) -> talkback::Result<()> {
        tracing::info!(secs = audio.duration_secs(), "reply audio ready");
        if let Some(path) = &self.path {
            let bytes = wav::encode(&audio, 16)?;
            std::fs::write(path, bytes)?;
            tracing::info!(path = %path.display(), "reply written");
        }
        Ok(())
    }
}
