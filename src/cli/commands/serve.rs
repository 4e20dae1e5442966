//! Serve command - run the HTTP API.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server::{router, AppState};
use std::sync::Arc;
use tracing::info;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(Operation::Serve, &settings)?;

    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| settings.server.host.clone()),
        port.unwrap_or(settings.server.port)
    );

    let state = Arc::new(AppState::from_settings(settings)?);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("quizgen API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Register", "POST /api/register");
    Output::kv("Login", "POST /api/login");
    Output::kv("Refresh", "POST /api/token/refresh");
    Output::kv("Logout", "POST /api/logout");
    Output::kv("Create Quiz", "POST /api/quizzes");
    Output::kv("List Quizzes", "GET  /api/quizzes");
    Output::kv("Get Quiz", "GET  /api/quizzes/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
