//! Parsing and structural validation of model output.

use super::{
    GenerationError, QuestionDraft, QuizDraft, DESCRIPTION_LIMIT, OPTION_COUNT, QUESTION_COUNT,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Parse a raw model reply into a validated [`QuizDraft`].
///
/// Checks run in a fixed order and the first violation is returned:
/// top-level fields, question count, per-question fields, option count,
/// option distinctness, answer membership.
pub fn parse_quiz(raw: &str) -> Result<QuizDraft, GenerationError> {
    let text = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(text)?;

    let obj = value
        .as_object()
        .ok_or_else(|| GenerationError::InvalidField("top level is not a JSON object".into()))?;

    let missing: Vec<&'static str> = ["title", "description", "questions"]
        .into_iter()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(GenerationError::MissingFields(missing));
    }

    let title = string_field(obj, "title")?.trim().to_string();
    if title.is_empty() {
        return Err(GenerationError::InvalidField("title is empty".into()));
    }
    let description = truncate_description(string_field(obj, "description")?.trim());

    let entries = obj["questions"]
        .as_array()
        .ok_or_else(|| GenerationError::InvalidField("questions is not an array".into()))?;
    if entries.len() != QUESTION_COUNT {
        return Err(GenerationError::QuestionCount {
            expected: QUESTION_COUNT,
            got: entries.len(),
        });
    }

    let questions = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| parse_question(idx + 1, entry))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed quiz '{}' with {} questions", title, questions.len());

    Ok(QuizDraft {
        title,
        description,
        questions,
    })
}

fn parse_question(number: usize, entry: &Value) -> Result<QuestionDraft, GenerationError> {
    let invalid = |reason: &str| GenerationError::InvalidQuestion {
        number,
        reason: reason.to_string(),
    };

    let obj = entry.as_object().ok_or_else(|| invalid("not an object"))?;

    let missing: Vec<&str> = ["question_title", "question_options", "answer"]
        .into_iter()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(&format!("missing {}", missing.join(", "))));
    }

    let question_title = obj["question_title"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid("question_title must be a non-empty string"))?
        .to_string();

    let raw_options = obj["question_options"]
        .as_array()
        .ok_or_else(|| invalid("question_options must be an array"))?;
    if raw_options.len() != OPTION_COUNT {
        return Err(GenerationError::OptionCount {
            number,
            expected: OPTION_COUNT,
            got: raw_options.len(),
        });
    }

    let options = raw_options
        .iter()
        .map(|o| o.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| invalid("question_options must contain only strings"))?;

    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    if distinct.len() != options.len() {
        return Err(GenerationError::DuplicateOptions { number });
    }

    let answer = obj["answer"]
        .as_str()
        .map(|a| a.trim().to_string())
        .ok_or_else(|| invalid("answer must be a string"))?;
    if !options.contains(&answer) {
        return Err(GenerationError::AnswerNotInOptions { number });
    }

    Ok(QuestionDraft {
        question_title,
        options,
        answer,
    })
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, GenerationError> {
    obj[key]
        .as_str()
        .ok_or_else(|| GenerationError::InvalidField(format!("{} must be a string", key)))
}

/// Remove a surrounding Markdown code fence, optionally tagged `json`.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some((tag, body)) = rest.split_once('\n') else {
        return text;
    };
    let tag = tag.trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return text;
    }

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_LIMIT {
        return description.to_string();
    }
    warn!(
        "Description exceeds {} characters, truncating",
        DESCRIPTION_LIMIT
    );
    description.chars().take(DESCRIPTION_LIMIT).collect::<String>().trim_end().to_string()
}
