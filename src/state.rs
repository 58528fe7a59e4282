//! Application state: configuration, prompt templates, and provider clients.
//!
//! Built once at startup and shared read-only by every request (`Arc<AppState>`).
//! A provider whose credentials are missing is `None`; its endpoints answer 503.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_app_config_from_env, AppConfig, Prompts};
use crate::error::AppError;
use crate::providers::gemini::Gemini;
use crate::providers::pexels::Pexels;
use crate::providers::speech::GoogleSpeech;
use crate::providers::{ImageSearch, TextGenerator, Transcriber};

/// Upstream clients, each optional.
#[derive(Clone, Default)]
pub struct Providers {
  pub text: Option<Arc<dyn TextGenerator>>,
  pub images: Option<Arc<dyn ImageSearch>>,
  pub speech: Option<Arc<dyn Transcriber>>,
}

impl Providers {
  /// Build every provider whose credentials are in the environment.
  pub fn from_env() -> Self {
    Self {
      text: Gemini::from_env().map(|g| Arc::new(g) as Arc<dyn TextGenerator>),
      images: Pexels::from_env().map(|p| Arc::new(p) as Arc<dyn ImageSearch>),
      speech: GoogleSpeech::from_env().map(|s| Arc::new(s) as Arc<dyn Transcriber>),
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub config: AppConfig,
  pub providers: Providers,
}

impl AppState {
  pub fn new(config: AppConfig, providers: Providers) -> Self {
    Self { config, providers }
  }

  /// Build state from env: load TOML config, init provider clients.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Self {
    let config = load_app_config_from_env();
    let providers = Providers::from_env();

    match &providers.text {
      Some(t) => info!(target: "pte_backend", model = %t.model_id(), "Generative text enabled."),
      None => warn!(target: "pte_backend", "GEMINI_API_KEY not set; generation and evaluation endpoints will answer 503."),
    }
    if providers.images.is_some() {
      info!(target: "pte_backend", "Image search enabled.");
    } else {
      warn!(target: "pte_backend", "PEXELS_API_KEY not set; describe-image will answer 503.");
    }
    if providers.speech.is_some() {
      info!(target: "pte_backend", language = %config.speech_language, "Speech transcription enabled.");
    } else {
      warn!(target: "pte_backend", "No speech credentials; transcribe-and-evaluate will answer 503.");
    }
    info!(target: "pte_backend", default_topic = %config.default_topic, "Configuration ready.");

    Self::new(config, providers)
  }

  pub fn prompts(&self) -> &Prompts {
    &self.config.prompts
  }

  pub fn text_generator(&self) -> Result<&dyn TextGenerator, AppError> {
    self.providers.text.as_deref().ok_or(AppError::Configuration { service: "Generative text service" })
  }

  pub fn image_search(&self) -> Result<&dyn ImageSearch, AppError> {
    self.providers.images.as_deref().ok_or(AppError::Configuration { service: "Image search service" })
  }

  pub fn transcriber(&self) -> Result<&dyn Transcriber, AppError> {
    self.providers.speech.as_deref().ok_or(AppError::Configuration { service: "Speech transcription service" })
  }

  /// Requested topic, or the configured default when absent/blank.
  pub fn topic_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
    match requested.map(str::trim) {
      Some(t) if !t.is_empty() => t,
      _ => &self.config.default_topic,
    }
  }
}
