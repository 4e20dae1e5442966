//! Quiz generation for quizgen.
//!
//! A generative model is asked for a strict JSON quiz; its raw reply is then
//! parsed and structurally validated before it becomes a [`QuizDraft`].

mod chat;
mod parse;

pub use chat::ChatQuizGenerator;
pub use parse::parse_quiz;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of questions every quiz must have.
pub const QUESTION_COUNT: usize = 10;
/// Number of options every question must have.
pub const OPTION_COUNT: usize = 4;
/// Maximum description length in characters.
pub const DESCRIPTION_LIMIT: usize = 150;

/// A validated, not yet persisted quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// Re-check the structural invariants on an already typed draft.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.questions.len() != QUESTION_COUNT {
            return Err(GenerationError::QuestionCount {
                expected: QUESTION_COUNT,
                got: self.questions.len(),
            });
        }

        for (idx, question) in self.questions.iter().enumerate() {
            let number = idx + 1;
            if question.options.len() != OPTION_COUNT {
                return Err(GenerationError::OptionCount {
                    number,
                    expected: OPTION_COUNT,
                    got: question.options.len(),
                });
            }
            let mut distinct = question.options.clone();
            distinct.sort();
            distinct.dedup();
            if distinct.len() != question.options.len() {
                return Err(GenerationError::DuplicateOptions { number });
            }
            if !question.options.contains(&question.answer) {
                return Err(GenerationError::AnswerNotInOptions { number });
            }
        }

        Ok(())
    }
}

/// A validated, not yet persisted question.
///
/// `answer` is always one of `options`, and `options` holds exactly
/// [`OPTION_COUNT`] distinct strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_title: String,
    #[serde(rename = "question_options")]
    pub options: Vec<String>,
    pub answer: String,
}

/// Failure while generating or validating a quiz.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to initialize model client: {0}")]
    Init(String),

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Model API error: {0}")]
    Api(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Failed to parse JSON from model response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid quiz structure: missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid quiz structure: {0}")]
    InvalidField(String),

    #[error("Expected {expected} questions, got {got}")]
    QuestionCount { expected: usize, got: usize },

    #[error("Question {number} has invalid structure: {reason}")]
    InvalidQuestion { number: usize, reason: String },

    #[error("Question {number} must have exactly {expected} options, got {got}")]
    OptionCount {
        number: usize,
        expected: usize,
        got: usize,
    },

    #[error("Question {number} has duplicate options")]
    DuplicateOptions { number: usize },

    #[error("Question {number} answer is not one of its options")]
    AnswerNotInOptions { number: usize },
}

/// Trait for quiz generators.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Write a quiz for the transcript. A malformed reply is an error, never retried.
    async fn generate(&self, transcript: &str) -> Result<QuizDraft, GenerationError>;
}
