//! Create command - run the quiz pipeline once from the terminal.

use super::{open_store, require_user};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the create command.
pub async fn run_create(url: &str, username: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::CreateQuiz, &settings)?;

    let store = open_store(&settings)?;
    let user = require_user(&store, username).await?;
    let orchestrator = Orchestrator::new(&settings, store)?;

    let spinner = Output::spinner("Downloading, transcribing and writing the quiz...");
    let report = orchestrator.execute(user.id, url).await;
    spinner.finish_and_clear();

    match report.result {
        Ok(quiz) => {
            Output::success(&format!("Created quiz #{} '{}'", quiz.id, quiz.title));
            println!("{}", serde_json::to_string_pretty(&quiz)?);
            Ok(())
        }
        Err(e) => {
            Output::error(&e.to_string());
            Err(e.into())
        }
    }
}
