//! PTE Practice Platform · Backend relay
//!
//! - Axum HTTP API generating PTE Academic practice items and evaluating answers
//! - Gemini for text, Pexels for images, Google Speech-to-Text for recordings
//! - Each provider is optional; its endpoints answer 503 when unconfigured
//!
//! Important env variables (a `.env` file is honoured):
//!   PORT                    : u16 (default 5001)
//!   GEMINI_API_KEY          : enables generation and evaluation
//!   GEMINI_MODEL            : default "gemini-1.5-flash"
//!   PEXELS_API_KEY          : enables describe-image
//!   GOOGLE_SPEECH_API_KEY   : enables transcription (or GOOGLE_SPEECH_ACCESS_TOKEN)
//!   SPEECH_LANGUAGE         : default "en-US"
//!   PTE_CONFIG_PATH         : path to TOML config (topics, search terms, prompts)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod templates;
mod normalize;
mod reorder;
mod seeds;
mod error;
mod providers;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

const DEFAULT_PORT: u16 = 5001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let dotenv = dotenvy::dotenv();
  telemetry::init_tracing();
  if let Ok(path) = dotenv {
    info!(target: "pte_backend", path = %path.display(), "Loaded .env");
  }

  let state = Arc::new(AppState::from_env());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "pte_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "pte_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "pte_backend", error = %e, "Could not listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "pte_backend", "Shutdown signal received");
}
