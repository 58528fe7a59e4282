//! Request-boundary errors and their HTTP mapping.
//!
//! Every handler returns `Result<_, AppError>`. The response body is always
//! `{"error": "<message>"}`; provider detail is logged, never sent to the client.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::normalize::FormatError;
use crate::providers::ProviderError;

pub const RETRY_MESSAGE: &str = "The AI service returned an unexpected response. Please try again.";
pub const UNAVAILABLE_MESSAGE: &str = "The upstream service is currently unavailable. Please try again later.";
pub const NO_SPEECH_MESSAGE: &str =
  "Could not detect speech in the recording. Please speak clearly and try again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  /// A provider credential is missing.
  #[error("{service} is not configured")]
  Configuration { service: &'static str },
  /// Missing, empty or malformed request input.
  #[error("{0}")]
  InvalidInput(String),
  /// Network or auth failure talking to a provider.
  #[error("upstream unavailable: {detail}")]
  UpstreamUnavailable { detail: String },
  /// Provider replied, but not in the expected shape.
  #[error("upstream format error: {detail}")]
  UpstreamFormat { message: String, detail: String },
  #[error("{0}")]
  NoResults(String),
  #[error("no speech detected")]
  NoSpeechDetected,
}

impl AppError {
  pub fn invalid(message: impl Into<String>) -> Self {
    AppError::InvalidInput(message.into())
  }

  /// Format error with a task-specific client message.
  pub fn format(message: impl Into<String>, cause: FormatError) -> Self {
    AppError::UpstreamFormat { message: message.into(), detail: cause.to_string() }
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      AppError::Configuration { .. } => StatusCode::SERVICE_UNAVAILABLE,
      AppError::InvalidInput(_) | AppError::NoSpeechDetected => StatusCode::BAD_REQUEST,
      AppError::UpstreamUnavailable { .. } | AppError::UpstreamFormat { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::NoResults(_) => StatusCode::NOT_FOUND,
    }
  }

  /// Message safe to show the end user.
  pub fn client_message(&self) -> String {
    match self {
      AppError::Configuration { service } => format!("{service} is not configured on this server"),
      AppError::InvalidInput(m) | AppError::NoResults(m) => m.clone(),
      AppError::UpstreamUnavailable { .. } => UNAVAILABLE_MESSAGE.into(),
      AppError::UpstreamFormat { message, .. } => message.clone(),
      AppError::NoSpeechDetected => NO_SPEECH_MESSAGE.into(),
    }
  }
}

impl From<ProviderError> for AppError {
  fn from(e: ProviderError) -> Self {
    match e {
      ProviderError::NoResults(m) => AppError::NoResults(m),
      ProviderError::Parse(detail) => AppError::UpstreamFormat { message: RETRY_MESSAGE.into(), detail },
      other => AppError::UpstreamUnavailable { detail: other.to_string() },
    }
  }
}

impl From<FormatError> for AppError {
  fn from(e: FormatError) -> Self {
    AppError::format(RETRY_MESSAGE, e)
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      error!(target: "pte_backend", %status, error = %self, "Request failed");
    } else {
      warn!(target: "pte_backend", %status, error = %self, "Request rejected");
    }
    (status, Json(ErrorOut { error: self.client_message() })).into_response()
  }
}
