//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<&str>, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", settings.to_display_toml()?);
        }

        ConfigAction::Path => {
            let path = config_path
                .map(Settings::expand_path)
                .unwrap_or_else(Settings::default_config_path);
            println!("{}", path.display());
            if !path.exists() {
                Output::warning("File does not exist; built-in defaults are in use.");
            }
        }
    }

    Ok(())
}
