//! Pipeline orchestrator for quizgen.
//!
//! Sequences validate → fetch → transcribe → generate → persist for one
//! request. Each stage's own error is wrapped into a [`PipelineError`] naming
//! the stage; anything that escapes a stage (a panic, a storage failure)
//! becomes [`PipelineError::UnexpectedFailure`]. The downloaded audio is owned
//! by a [`TempAudio`](crate::audio::TempAudio) and is removed on every exit path.

use crate::audio::{AudioFetcher, YtDlpFetcher};
use crate::audio_source::{extract_video_id, validate_youtube_url};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::generation::{ChatQuizGenerator, QuizGenerator};
use crate::openai::ensure_api_key;
use crate::store::{Quiz, QuizStore};
use crate::transcription::{Transcriber, WhisperTranscriber};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Uniform error surface of the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid YouTube URL. {0}")]
    InvalidUrl(String),

    #[error("YouTube download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Quiz generation failed: {0}")]
    GenerationFailed(String),

    #[error("An unexpected error occurred: {0}")]
    UnexpectedFailure(String),
}

impl PipelineError {
    /// Whether the failure is attributable to the request or an external stage
    /// (as opposed to a defect in this service).
    pub fn is_stage_failure(&self) -> bool {
        !matches!(self, PipelineError::UnexpectedFailure(_))
    }
}

/// Progress of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    UrlValidated,
    Downloaded,
    Transcribed,
    Generated,
    Persisted,
    Failed,
}

/// Outcome of a run, with the state the run reached.
#[derive(Debug)]
pub struct PipelineReport {
    pub state: PipelineState,
    /// Last successful state before a failure.
    pub failed_from: Option<PipelineState>,
    pub result: std::result::Result<Quiz, PipelineError>,
}

/// Tracks forward-only transitions for a single run.
#[derive(Debug)]
struct StateTracker {
    current: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            current: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug!("Pipeline {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}

/// The quiz-creation pipeline.
pub struct Orchestrator {
    fetcher: Arc<dyn AudioFetcher>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn QuizGenerator>,
    store: Arc<dyn QuizStore>,
}

impl Orchestrator {
    /// Build the production pipeline from settings.
    pub fn new(settings: &Settings, store: Arc<dyn QuizStore>) -> Result<Self> {
        let api_key = settings.api_key()?;
        ensure_api_key(&api_key)?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        std::fs::create_dir_all(settings.scratch_dir())?;

        let fetcher = Arc::new(YtDlpFetcher::from_settings(settings));
        let transcriber = Arc::new(WhisperTranscriber::from_settings(settings, &api_key));
        let generator = Arc::new(
            ChatQuizGenerator::from_settings(settings, &api_key, prompts)
                .map_err(|e| crate::error::QuizgenError::Config(e.to_string()))?,
        );

        info!(
            "Pipeline ready (transcription: {}, generation: {})",
            settings.transcription.model, settings.generation.model
        );

        Ok(Self::with_components(fetcher, transcriber, generator, store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        fetcher: Arc<dyn AudioFetcher>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn QuizGenerator>,
        store: Arc<dyn QuizStore>,
    ) -> Self {
        Self {
            fetcher,
            transcriber,
            generator,
            store,
        }
    }

    /// Run the pipeline and return the persisted quiz.
    pub async fn create_quiz(
        &self,
        owner_id: i64,
        url: &str,
    ) -> std::result::Result<Quiz, PipelineError> {
        self.execute(owner_id, url).await.result
    }

    /// Run the pipeline and report how far it got.
    #[instrument(skip(self), fields(video_id = extract_video_id(url).unwrap_or("-")))]
    pub async fn execute(&self, owner_id: i64, url: &str) -> PipelineReport {
        let mut tracker = StateTracker::new();

        let outcome = AssertUnwindSafe(self.run_stages(&mut tracker, owner_id, url))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Pipeline stage panicked: {}", message);
                Err(PipelineError::UnexpectedFailure(message))
            }
        };

        match result {
            Ok(quiz) => {
                info!("Created quiz {} '{}'", quiz.id, quiz.title);
                PipelineReport {
                    state: tracker.current,
                    failed_from: None,
                    result: Ok(quiz),
                }
            }
            Err(e) => {
                warn!("Pipeline failed after {:?}: {}", tracker.current, e);
                PipelineReport {
                    state: PipelineState::Failed,
                    failed_from: Some(tracker.current),
                    result: Err(e),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        tracker: &mut StateTracker,
        owner_id: i64,
        url: &str,
    ) -> std::result::Result<Quiz, PipelineError> {
        if !validate_youtube_url(url) {
            return Err(PipelineError::InvalidUrl(
                "Please provide a valid YouTube video URL.".to_string(),
            ));
        }
        tracker.advance(PipelineState::UrlValidated);

        info!("Downloading audio");
        let audio = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| PipelineError::DownloadFailed(e.to_string()))?;
        tracker.advance(PipelineState::Downloaded);

        // From here on `audio` is dropped on every early return, removing the file.
        info!("Transcribing {:?}", audio.path());
        let transcript = self
            .transcriber
            .transcribe(&audio)
            .await
            .map_err(|e| PipelineError::TranscriptionFailed(e.to_string()))?;
        tracker.advance(PipelineState::Transcribed);

        info!("Generating quiz from {} characters of transcript", transcript.len());
        let draft = self
            .generator
            .generate(&transcript)
            .await
            .and_then(|draft| draft.validate().map(|_| draft))
            .map_err(|e| PipelineError::GenerationFailed(e.to_string()))?;
        tracker.advance(PipelineState::Generated);

        let quiz = self
            .store
            .create_quiz(owner_id, url, &draft)
            .await
            .map_err(|e| PipelineError::UnexpectedFailure(e.to_string()))?;
        tracker.advance(PipelineState::Persisted);

        audio.release();
        Ok(quiz)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "stage panicked".to_string())
}
