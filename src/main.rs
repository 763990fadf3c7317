//! CodeBuddy · Coding Tutorial Backend
//!
//! - Axum HTTP + WebSocket API
//! - Optional Gemini integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                   : u16 (default 3000)
//!   GEMINI_API_KEY         : enables Gemini if present (API_KEY also accepted)
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_TEXT_MODEL      : default "gemini-3-flash-preview"
//!   GEMINI_TTS_MODEL       : default "gemini-2.5-flash-preview-tts"
//!   GEMINI_VOICE           : default "Puck"
//!   CODEBUDDY_CONFIG_PATH  : path to TOML config (prompts, storage, extra courses)
//!   CODEBUDDY_PROFILE_PATH : where the learner profile JSON is kept
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use codebuddy_backend::{build_router, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalog, saved profile, Gemini client, prompts.
  let state = Arc::new(AppState::new()?);

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "codebuddy_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "codebuddy_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "codebuddy_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "codebuddy_backend", "Shutdown requested");
}
