//! OpenAI client construction from explicit credentials.

use crate::config::OpenAISettings;
use crate::error::{QuizgenError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client for the given API key and transport settings.
pub fn create_client(api_key: &str, settings: &OpenAISettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Reject obviously unusable keys before any network traffic.
pub fn ensure_api_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(QuizgenError::Config("OpenAI API key is empty".to_string()));
    }
    Ok(())
}
