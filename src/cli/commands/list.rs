//! List command implementation.

use super::{open_store, require_user};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::store::QuizStore;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(username: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::List, &settings)?;

    let store = open_store(&settings)?;
    let user = require_user(&store, username).await?;

    match store.list_quizzes(user.id).await {
        Ok(quizzes) => {
            if quizzes.is_empty() {
                Output::info(&format!(
                    "No quizzes for {} yet. Use 'quizgen create <url> --user {}' to add one.",
                    user.username, user.username
                ));
            } else {
                Output::header(&format!("Quizzes for {} ({})", user.username, quizzes.len()));
                println!();

                for quiz in &quizzes {
                    Output::quiz_info(quiz);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list quizzes: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
