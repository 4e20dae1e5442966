//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::SqliteStore;
use console::style;
use std::process::Command;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("quizgen Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        check_tool("yt-dlp", &settings.tools.ytdlp, "--version", install_hint_ytdlp()),
        check_tool("ffmpeg", &settings.tools.ffmpeg_binary(), "-version", install_hint_ffmpeg()),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    println!("{}", style("API Configuration").bold());
    let key_check = check_api_key(settings);
    key_check.print();
    let key_ok = key_check.status == CheckStatus::Ok;
    checks.push(key_check);
    if key_ok {
        let reach = check_api_reachable(settings).await;
        reach.print();
        checks.push(reach);
    }

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings);
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before creating quizzes.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! quizgen is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, binary: &str, version_arg: &str, hint: &str) -> CheckResult {
    match Command::new(binary).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect::<String>();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, &format!("'{}' not found", binary), hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_api_key(settings: &Settings) -> CheckResult {
    match settings.api_key() {
        Ok(key) if key.is_ascii() && key.len() > 11 => CheckResult::ok(
            "API key",
            &format!("configured ({}...{})", &key[..7], &key[key.len() - 4..]),
        ),
        Ok(_) => CheckResult::warning(
            "API key",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "API key",
            "not set",
            "Set openai.api_key in the config file, or export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// List models to confirm the key is accepted.
async fn check_api_reachable(settings: &Settings) -> CheckResult {
    let Ok(key) = settings.api_key() else {
        return CheckResult::error("API access", "no key", "Configure an API key first");
    };
    let base = settings
        .openai
        .api_base
        .as_deref()
        .unwrap_or(DEFAULT_API_BASE)
        .trim_end_matches('/');

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => return CheckResult::error("API access", &e.to_string(), "Check TLS setup"),
    };

    match client
        .get(format!("{}/models", base))
        .bearer_auth(&key)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => CheckResult::ok("API access", base),
        Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
            CheckResult::error("API access", "key rejected (401)", "Check the API key")
        }
        Ok(resp) => CheckResult::warning(
            "API access",
            &format!("unexpected status {}", resp.status()),
            "The API may be degraded; quiz creation can fail",
        ),
        Err(e) => CheckResult::warning(
            "API access",
            &format!("unreachable: {}", e),
            "Check network access or openai.api_base",
        ),
    }
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let scratch = settings.scratch_dir();
    match std::fs::create_dir_all(&scratch).and_then(|_| tempfile::tempfile_in(&scratch)) {
        Ok(_) => results.push(CheckResult::ok("Scratch directory", &scratch.display().to_string())),
        Err(e) => results.push(CheckResult::error(
            "Scratch directory",
            &format!("{} not writable: {}", scratch.display(), e),
            "Set general.scratch_dir to a writable directory",
        )),
    }

    let db_path = settings.database_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        match SqliteStore::new(&db_path).and_then(|store| store.counts()) {
            Ok((quizzes, questions)) => results.push(CheckResult::ok(
                "Database",
                &format!(
                    "{} ({}, {} quizzes, {} questions)",
                    db_path.display(),
                    size,
                    quizzes,
                    questions
                ),
            )),
            Err(e) => results.push(CheckResult::error(
                "Database",
                &format!("{} cannot be opened: {}", db_path.display(), e),
                "Move the file aside to start with a fresh database",
            )),
        }
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first use",
        ));
    }

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override settings", config_path.display()),
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
