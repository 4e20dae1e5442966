//! Configuration settings for quizgen.

use crate::error::{QuizgenError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variables consulted for the API key, in order, when the
/// config file does not carry one.
const API_KEY_ENV_VARS: [&str; 2] = ["QUIZGEN_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub tools: ToolSettings,
    pub openai: OpenAISettings,
    pub transcription: TranscriptionSettings,
    pub generation: GenerationSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Scratch directory for downloaded audio. Nothing here outlives a request.
    pub scratch_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.quizgen".to_string(),
            scratch_dir: "/tmp/quizgen".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// External media tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// yt-dlp executable name or path.
    pub ytdlp: String,
    /// ffmpeg executable name or path.
    pub ffmpeg: String,
    /// Directory (or binary) handed to yt-dlp as `--ffmpeg-location`.
    pub ffmpeg_location: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffmpeg_location: None,
        }
    }
}

impl ToolSettings {
    /// The ffmpeg executable to run, resolved against `ffmpeg_location` when set.
    pub fn ffmpeg_binary(&self) -> String {
        match &self.ffmpeg_location {
            Some(location) => {
                let location = Settings::expand_path(location);
                if location.is_file() {
                    location.to_string_lossy().to_string()
                } else {
                    location.join(&self.ffmpeg).to_string_lossy().to_string()
                }
            }
            None => self.ffmpeg.clone(),
        }
    }
}

/// Credentials and transport settings for the OpenAI API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to `QUIZGEN_OPENAI_API_KEY`, then `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Alternative API base URL (proxies, compatible gateways).
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            timeout_seconds: 300,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional ISO-639-1 language hint.
    pub language: Option<String>,
    /// Largest file uploaded in one request; bigger files are segmented first.
    pub max_upload_bytes: u64,
    /// Segment length in seconds used when splitting oversize audio.
    pub segment_seconds: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            max_upload_bytes: 24 * 1024 * 1024,
            segment_seconds: 600,
        }
    }
}

/// Quiz generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model used to write the quiz.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        }
    }
}

/// Relational storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.quizgen/quizgen.db".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Session token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Access token lifetime in seconds.
    pub access_token_ttl_seconds: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl_seconds: i64,
    /// Mark auth cookies `Secure`.
    pub secure_cookies: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_ttl_seconds: 5 * 60,
            refresh_token_ttl_seconds: 24 * 60 * 60,
            secure_cookies: true,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Render settings as pretty TOML with the API key masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.openai.api_key.is_some() {
            shown.openai.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| QuizgenError::Config(e.to_string()))
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizgen")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded scratch directory path.
    pub fn scratch_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.scratch_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }

    /// Resolve the generative-model API key once, at startup.
    pub fn api_key(&self) -> Result<String> {
        let from_env = || {
            API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        };

        self.openai
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(from_env)
            .ok_or_else(|| {
                QuizgenError::Config(
                    "No OpenAI API key configured. Set openai.api_key or export OPENAI_API_KEY."
                        .to_string(),
                )
            })
    }
}
