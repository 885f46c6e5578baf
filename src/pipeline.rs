//! Pipeline controller
//!
//! Owns the session state machine and sequences the stages: encode the
//! captured utterance, transcribe it, obtain a chat reply, and (when a
//! synthesis stage is attached) synthesize, decode, and play the reply.
//! Every transition is emitted over an event channel so a presentation
//! layer can drive indicators; the controller performs no presentation
//! itself.
//!
//! One run is in flight at a time. Re-entry while a run is active is
//! rejected with [`Error::Busy`], any stage failure resets the session to
//! `Idle`, and [`Pipeline::abort`] cancels an in-flight run, discarding its
//! buffers.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use crate::audio::{AudioBuffer, AudioSink, wav};
use crate::voice::{ChatCompleter, SpeechSynthesizer, Transcriber};
use crate::{Error, Result};

/// Session state, one live value per pipeline instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Ready for a new capture
    Idle,
    /// The host is capturing audio
    Recording,
    /// Transcription request in flight
    AwaitingTranscription,
    /// Chat-completion request in flight
    AwaitingReply,
    /// Speech-synthesis request in flight
    AwaitingSpeech,
    /// Reply audio is playing on the host sink
    Playing,
}

/// Notification delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The session entered a new state
    StateChanged(PipelineState),
    /// Transcription succeeded
    TranscriptReady(String),
    /// The chat stage produced a reply
    ReplyReady(String),
    /// A stage failed; the session has been reset to `Idle`
    StageFailed {
        /// State the session was in when the stage failed
        state: PipelineState,
        /// Failure detail
        message: String,
    },
}

/// Optional synthesis/playback tail of the pipeline
struct SynthesisStage {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
}

/// Voice-interaction pipeline state machine
pub struct Pipeline {
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatCompleter>,
    synthesis: Option<SynthesisStage>,
    language: String,
    state: Mutex<PipelineState>,
    events: mpsc::UnboundedSender<PipelineEvent>,
    abort: watch::Sender<u64>,
}

impl Pipeline {
    /// Create a chat-only pipeline along with its event receiver
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatCompleter>,
        language: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (abort, _) = watch::channel(0);

        let pipeline = Self {
            transcriber,
            chat,
            synthesis: None,
            language: language.into(),
            state: Mutex::new(PipelineState::Idle),
            events,
            abort,
        };
        (pipeline, receiver)
    }

    /// Attach the speech-synthesis and playback stages
    #[must_use]
    pub fn with_synthesis(
        mut self,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        self.synthesis = Some(SynthesisStage { synthesizer, sink });
        self
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state.lock().map_or(PipelineState::Idle, |s| *s)
    }

    /// Mark the start of a capture: `Idle` → `Recording`
    ///
    /// The host performs the raw capture itself and hands the samples to
    /// [`Pipeline::finish_recording`] when it stops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if the session is not idle
    pub fn start_recording(&self) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| Error::Busy(PipelineState::Idle))?;
            if *state != PipelineState::Idle {
                return Err(Error::Busy(*state));
            }
            *state = PipelineState::Recording;
        }
        tracing::debug!("recording started");
        let _ = self
            .events
            .send(PipelineEvent::StateChanged(PipelineState::Recording));
        Ok(())
    }

    /// Run the pipeline on a finished capture
    ///
    /// Resolves when the session is back at `Idle`: after the reply event
    /// for a chat-only pipeline, or after playback completes when synthesis
    /// is attached. All buffers of the run are discarded on failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if the session is not in `Recording`,
    /// [`Error::Aborted`] if [`Pipeline::abort`] cancelled the run, or the
    /// failing stage's error otherwise
    pub async fn finish_recording(&self, audio: AudioBuffer) -> Result<()> {
        // Subscribe before the state check so an abort arriving at any
        // point after the check is observed.
        let mut abort_rx = self.abort.subscribe();

        // Check-and-swap under one lock so two racing calls cannot both
        // observe Recording and issue overlapping requests.
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| Error::Busy(PipelineState::Idle))?;
            if *state != PipelineState::Recording {
                return Err(Error::Busy(*state));
            }
            *state = PipelineState::AwaitingTranscription;
        }
        tracing::debug!(state = ?PipelineState::AwaitingTranscription, "state changed");
        let _ = self.events.send(PipelineEvent::StateChanged(
            PipelineState::AwaitingTranscription,
        ));

        let result = self.run(audio, &mut abort_rx).await;
        match &result {
            Ok(()) => {}
            Err(Error::Aborted) => {
                // A stage that resolved Ok in the same instant as the abort
                // may have re-entered a non-idle state after abort() reset
                // the session; force the reset so the session can re-arm.
                self.reset_to_idle();
            }
            Err(e) => {
                let failed_in = self.state();
                tracing::error!(state = ?failed_in, error = %e, "pipeline stage failed");
                let _ = self.events.send(PipelineEvent::StageFailed {
                    state: failed_in,
                    message: e.to_string(),
                });
                self.transition(PipelineState::Idle);
            }
        }
        result
    }

    /// Force the session back to `Idle`, discarding in-flight results
    ///
    /// A pending [`Pipeline::finish_recording`] resolves with
    /// [`Error::Aborted`].
    pub fn abort(&self) {
        self.abort.send_modify(|generation| *generation += 1);
        let was = self.reset_to_idle();
        if was != PipelineState::Idle {
            tracing::info!(state = ?was, "pipeline aborted");
        }
    }

    /// Swap the session back to `Idle`, emitting the transition only if it
    /// was not already idle; returns the previous state
    fn reset_to_idle(&self) -> PipelineState {
        let was = self
            .state
            .lock()
            .map_or(PipelineState::Idle, |mut state| {
                std::mem::replace(&mut *state, PipelineState::Idle)
            });
        if was != PipelineState::Idle {
            let _ = self
                .events
                .send(PipelineEvent::StateChanged(PipelineState::Idle));
        }
        was
    }

    async fn run(&self, audio: AudioBuffer, abort: &mut watch::Receiver<u64>) -> Result<()> {
        tracing::debug!(
            frames = audio.frame_count(),
            sample_rate = audio.sample_rate,
            "encoding capture"
        );
        let wav_bytes = wav::encode(&audio, 16)?;
        drop(audio);

        let transcript = Self::guarded(abort, self.transcriber.transcribe(&wav_bytes, &self.language))
            .await?;
        drop(wav_bytes);
        let _ = self
            .events
            .send(PipelineEvent::TranscriptReady(transcript.clone()));

        self.transition(PipelineState::AwaitingReply);
        let reply = Self::guarded(abort, self.chat.complete(&transcript)).await?;
        let _ = self.events.send(PipelineEvent::ReplyReady(reply.clone()));

        let Some(stage) = &self.synthesis else {
            self.transition(PipelineState::Idle);
            return Ok(());
        };

        self.transition(PipelineState::AwaitingSpeech);
        let reply_wav = Self::guarded(abort, stage.synthesizer.synthesize(&reply)).await?;
        let (format, decoded) = wav::decode(&reply_wav)?;
        drop(reply_wav);
        tracing::debug!(
            channels = format.channels,
            sample_rate = format.sample_rate,
            frames = decoded.frame_count(),
            "reply audio decoded"
        );

        self.transition(PipelineState::Playing);
        Self::guarded(abort, stage.sink.play(decoded)).await?;

        self.transition(PipelineState::Idle);
        Ok(())
    }

    /// Await a stage future, cancelled by [`Pipeline::abort`]
    async fn guarded<T>(
        abort: &mut watch::Receiver<u64>,
        stage: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            result = stage => result,
            _ = abort.changed() => Err(Error::Aborted),
        }
    }

    fn transition(&self, next: PipelineState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
        tracing::debug!(state = ?next, "state changed");
        let _ = self.events.send(PipelineEvent::StateChanged(next));
    }
}
