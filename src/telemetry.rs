//! Tracing setup.
//!
//! - LOG_LEVEL: filter directives, e.g. "debug" or "info,upstream=trace".
//!   Defaults to debug for our own targets (`pte_backend`, `upstream`).
//! - LOG_FORMAT: "pretty" (default) or "json" (one flattened object per line).
//!
//! Pipeline spans log their duration on close; TraceLayer adds per-request spans.

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const DEFAULT_FILTER: &str = "info,pte_backend=debug,upstream=debug,tower_http=info,axum=info";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true)
    .with_span_events(FmtSpan::CLOSE);

  // JSON and pretty builders are different types.
  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => builder.json().flatten_event(true).init(),
    _ => builder.init(),
  }
}
