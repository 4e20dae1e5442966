//! OpenAI Whisper transcription implementation.

use super::{Transcriber, TranscriptionError};
use crate::audio::{split_audio, TempAudio};
use crate::config::{OpenAISettings, Settings};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
///
/// The API client is built on first use and shared by every later call,
/// including concurrent first calls.
pub struct WhisperTranscriber {
    client: OnceCell<Client<OpenAIConfig>>,
    api_key: String,
    openai: OpenAISettings,
    model: String,
    language: Option<String>,
    max_upload_bytes: u64,
    segment_seconds: u32,
    ffmpeg: String,
}

impl WhisperTranscriber {
    pub fn from_settings(settings: &Settings, api_key: &str) -> Self {
        Self {
            client: OnceCell::new(),
            api_key: api_key.to_string(),
            openai: settings.openai.clone(),
            model: settings.transcription.model.clone(),
            language: settings.transcription.language.clone(),
            max_upload_bytes: settings.transcription.max_upload_bytes,
            segment_seconds: settings.transcription.segment_seconds,
            ffmpeg: settings.tools.ffmpeg_binary(),
        }
    }

    async fn client(&self) -> Result<&Client<OpenAIConfig>, TranscriptionError> {
        self.client
            .get_or_try_init(|| async {
                debug!("Initializing Whisper client for model {}", self.model);
                create_client(&self.api_key, &self.openai)
                    .map_err(|e| TranscriptionError::Init(e.to_string()))
            })
            .await
    }

    /// Transcribe a single file in one request.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let response = self
            .client()
            .await?
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| TranscriptionError::Api(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }

    /// Split an oversize file and transcribe the pieces in order.
    async fn transcribe_segmented(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let work_dir = tempfile::tempdir()?;
        let segments = split_audio(&self.ffmpeg, audio_path, work_dir.path(), self.segment_seconds)
            .await
            .map_err(|e| TranscriptionError::Preprocess(e.to_string()))?;

        let mut parts = Vec::with_capacity(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            debug!("Transcribing segment {}/{}", idx + 1, segments.len());
            let text = self.transcribe_file(segment).await?;
            if !text.is_empty() {
                parts.push(text);
            }
        }

        Ok(parts.join(" "))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &TempAudio) -> Result<String, TranscriptionError> {
        let size = tokio::fs::metadata(audio.path()).await?.len();

        let text = if size > self.max_upload_bytes {
            info!(
                "Audio is {} bytes (limit {}), transcribing in segments",
                size, self.max_upload_bytes
            );
            self.transcribe_segmented(audio.path()).await?
        } else {
            self.transcribe_file(audio.path()).await?
        };

        if text.trim().is_empty() {
            return Err(TranscriptionError::Empty);
        }

        info!("Transcribed {} characters with {}", text.len(), self.model);
        Ok(text)
    }
}
