//! OpenAI chat-completion quiz generator.

use super::{
    parse_quiz, GenerationError, QuizDraft, QuizGenerator, DESCRIPTION_LIMIT, OPTION_COUNT,
    QUESTION_COUNT,
};
use crate::config::{Prompts, Settings};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Writes quizzes with an OpenAI chat model.
pub struct ChatQuizGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: Prompts,
}

impl ChatQuizGenerator {
    pub fn from_settings(
        settings: &Settings,
        api_key: &str,
        prompts: Prompts,
    ) -> Result<Self, GenerationError> {
        let client = create_client(api_key, &settings.openai)
            .map_err(|e| GenerationError::Init(e.to_string()))?;

        Ok(Self {
            client,
            model: settings.generation.model.clone(),
            temperature: settings.generation.temperature,
            prompts,
        })
    }

    /// Render system and user messages for a transcript.
    fn build_messages(&self, transcript: &str) -> (String, String) {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("question_count".to_string(), QUESTION_COUNT.to_string());
        vars.insert("option_count".to_string(), OPTION_COUNT.to_string());
        vars.insert("description_limit".to_string(), DESCRIPTION_LIMIT.to_string());

        (
            self.prompts.render_with_custom(&self.prompts.quiz.system, &vars),
            self.prompts.render_with_custom(&self.prompts.quiz.user, &vars),
        )
    }
}

#[async_trait]
impl QuizGenerator for ChatQuizGenerator {
    #[instrument(skip_all, fields(model = %self.model, transcript_chars = transcript.len()))]
    async fn generate(&self, transcript: &str) -> Result<QuizDraft, GenerationError> {
        let (system_message, user_message) = self.build_messages(transcript);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| GenerationError::Request(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GenerationError::Api(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(
            "Model quiz response: {}",
            content.chars().take(500).collect::<String>()
        );

        let quiz = parse_quiz(content)?;
        info!("Generated quiz '{}'", quiz.title);
        Ok(quiz)
    }
}
