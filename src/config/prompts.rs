//! Prompt templates for quizgen.
//!
//! The quiz prompt can be customized by placing a `quiz.toml` file in the
//! custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// `{{name}}` template placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub quiz: QuizPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for quiz generation.
///
/// Available variables: `{{transcript}}`, `{{question_count}}`,
/// `{{option_count}}`, `{{description_limit}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuizPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a quiz author. You read video transcripts and write multiple-choice quizzes that test understanding of the material.

You reply with a single JSON object and nothing else: no explanations, no comments, no text before or after the JSON."#.to_string(),

            user: r#"Based on the following transcript, generate a quiz in valid JSON format.

The quiz must follow this exact structure:

{
  "title": "Create a concise quiz title based on the topic of the transcript.",
  "description": "Summarize the transcript in no more than {{description_limit}} characters. Do not include any quiz questions or answers.",
  "questions": [
    {
      "question_title": "The question goes here.",
      "question_options": ["Option A", "Option B", "Option C", "Option D"],
      "answer": "The correct answer from the above options"
    }
  ]
}

Requirements:
- "questions" must contain exactly {{question_count}} entries.
- Each question must have exactly {{option_count}} distinct answer options.
- Only one correct answer is allowed per question, and it must be copied verbatim from "question_options".
- The output must be valid JSON and parsable as-is.
- Do not include explanations, comments, or any text outside the JSON.

Transcript:
{{transcript}}"#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let quiz_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("quiz.toml");
            if quiz_path.exists() {
                let content = std::fs::read_to_string(&quiz_path)?;
                prompts.quiz = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in a single pass, so substituted values are
    /// never rescanned. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_reference_transcript() {
        let prompts = Prompts::default();
        assert!(!prompts.quiz.system.is_empty());
        assert!(prompts.quiz.user.contains("{{transcript}}"));
        assert!(prompts.quiz.user.contains("{{question_count}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Write {{question_count}} questions about {{topic}}.";
        let mut vars = HashMap::new();
        vars.insert("question_count".to_string(), "10".to_string());
        vars.insert("topic".to_string(), "Rust".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Write 10 questions about Rust.");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), "say {{question_count}} and {{nope}}".to_string());
        vars.insert("question_count".to_string(), "10".to_string());

        for _ in 0..20 {
            let out = Prompts::render("{{question_count}}: {{transcript}} {{unknown}}", &vars);
            assert_eq!(out, "10: say {{question_count}} and {{nope}} {{unknown}}");
        }
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("audience".to_string(), "students".to_string());
        prompts.variables.insert("transcript".to_string(), "stale".to_string());

        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), "fresh".to_string());

        let out = prompts.render_with_custom("{{audience}}: {{transcript}}", &vars);
        assert_eq!(out, "students: fresh");
    }

    #[test]
    fn test_load_custom_quiz_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("quiz.toml"),
            "system = \"custom system\"\nuser = \"custom {{transcript}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.quiz.system, "custom system");
        assert_eq!(prompts.quiz.user, "custom {{transcript}}");
    }
}
