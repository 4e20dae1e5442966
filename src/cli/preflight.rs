//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{QuizgenError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Creating a quiz runs the whole pipeline.
    CreateQuiz,
    /// Serving needs everything quiz creation needs.
    Serve,
    /// Listing only reads the database.
    List,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::CreateQuiz | Operation::Serve => {
            settings.api_key()?;
            check_tool(&settings.tools.ytdlp, "--version")?;
            check_tool(&settings.tools.ffmpeg_binary(), "-version")?;
        }
        Operation::List => {}
    }
    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_arg: &str) -> Result<()> {
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(QuizgenError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(QuizgenError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(QuizgenError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
