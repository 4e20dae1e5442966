//! CLI command implementations.

mod config;
mod create;
mod doctor;
mod list;
mod serve;

pub use config::run_config;
pub use create::run_create;
pub use doctor::run_doctor;
pub use list::run_list;
pub use serve::run_serve;

use crate::config::Settings;
use crate::store::{AccountStore, SqliteStore, User};
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Open the configured SQLite database, creating its directory if needed.
fn open_store(settings: &Settings) -> Result<Arc<SqliteStore>> {
    let path = settings.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(SqliteStore::new(&path)?))
}

async fn require_user(store: &SqliteStore, username: &str) -> Result<User> {
    store
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| anyhow!("No user named '{}'. Register through the API first.", username))
}
