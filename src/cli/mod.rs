//! CLI module for quizgen.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// quizgen - YouTube videos to multiple-choice quizzes
///
/// Downloads a video's audio, transcribes it with Whisper and asks a chat
/// model for a ten-question quiz, stored per user.
#[derive(Parser, Debug)]
#[command(name = "quizgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "QUIZGEN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a quiz from a YouTube URL for an existing user
    Create {
        /// YouTube video URL
        url: String,

        /// Username that will own the quiz
        #[arg(short, long)]
        user: String,
    },

    /// List a user's quizzes
    List {
        /// Username whose quizzes to list
        #[arg(short, long)]
        user: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "quizgen",
            "create",
            "https://youtu.be/dQw4w9WgXcQ",
            "--user",
            "alice",
        ])
        .unwrap();

        match cli.command {
            Commands::Create { url, user } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(user, "alice");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["quizgen", "-vv", "serve", "--port", "9000"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Serve { host: None, port: Some(9000) }
        ));
    }

    #[test]
    fn test_create_requires_user() {
        assert!(Cli::try_parse_from(["quizgen", "create", "https://youtu.be/x"]).is_err());
    }
}
