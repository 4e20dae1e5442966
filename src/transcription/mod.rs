//! Speech-to-text for quizgen.
//!
//! Turns a downloaded audio file into a plain-text transcript. The default
//! implementation calls the OpenAI Whisper API.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::audio::TempAudio;
use async_trait::async_trait;
use thiserror::Error;

/// Failure while transcribing audio.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Cannot read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to prepare audio: {0}")]
    Preprocess(String),

    #[error("Failed to initialize transcription client: {0}")]
    Init(String),

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Whisper API error: {0}")]
    Api(String),

    #[error("No speech was recognized in the audio")]
    Empty,
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Produce the full transcript text. Does not modify or delete the audio.
    async fn transcribe(&self, audio: &TempAudio) -> Result<String, TranscriptionError>;
}
