//! quizgen - YouTube videos to multiple-choice quizzes
//!
//! Downloads the audio of a YouTube video, transcribes it with Whisper, asks a
//! chat model for a ten-question quiz and stores the result for the user who
//! asked for it.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `audio_source` - YouTube URL validation
//! - `audio` - Audio download into a self-cleaning temporary file
//! - `transcription` - Speech-to-text
//! - `generation` - Quiz generation and structural validation
//! - `store` - SQLite persistence for users, sessions and quizzes
//! - `auth` - Passwords and session tokens
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use quizgen::config::Settings;
//! use quizgen::orchestrator::Orchestrator;
//! use quizgen::store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = Arc::new(SqliteStore::new(&settings.database_path())?);
//!     let orchestrator = Orchestrator::new(&settings, store)?;
//!
//!     let quiz = orchestrator
//!         .create_quiz(1, "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .await?;
//!     println!("Created '{}' with {} questions", quiz.title, quiz.questions.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audio_source;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod server;
pub mod store;
pub mod transcription;

pub use error::{QuizgenError, Result};
