//! Configuration module for quizgen.
//!
//! Handles loading application settings and prompt templates. Settings are
//! read once at startup and handed to each component explicitly.

mod prompts;
mod settings;

pub use prompts::{Prompts, QuizPrompts};
pub use settings::{
    AuthSettings, DatabaseSettings, GenerationSettings, GeneralSettings, OpenAISettings,
    PromptSettings, ServerSettings, Settings, ToolSettings, TranscriptionSettings,
};
