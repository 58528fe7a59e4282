//! Upstream provider adapters.
//!
//! One trait per external service, so the dispatch layer can run against fakes:
//! - [`TextGenerator`]: generative text ([`gemini::Gemini`])
//! - [`ImageSearch`]: photo search ([`pexels::Pexels`])
//! - [`Transcriber`]: speech-to-text ([`speech::GoogleSpeech`])
//!
//! Adapters only translate requests and responses. Parsing the model's text is the
//! response normalizer's job.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::ImageResult;

pub mod gemini;
pub mod pexels;
pub mod speech;

/// Errors returned by upstream adapters.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
  /// Transport failure (DNS, TLS, timeout, connection reset).
  #[error("provider request failed: {0}")]
  Request(#[from] reqwest::Error),
  /// Non-success status, including auth failures.
  #[error("provider returned status {status}: {message}")]
  HttpStatus { status: u16, message: String },
  /// Response envelope did not match the provider's documented schema.
  #[error("provider response parse error: {0}")]
  Parse(String),
  /// Search matched nothing.
  #[error("{0}")]
  NoResults(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Send `prompt` and return the model's raw text.
  async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

  fn model_id(&self) -> &str;
}

#[async_trait]
pub trait ImageSearch: Send + Sync {
  /// Return one photo matching `query`.
  async fn search_image(&self, query: &str) -> Result<ImageResult, ProviderError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
  /// Transcribe `audio`. Silence yields `Ok(String::new())`, not an error.
  async fn transcribe(
    &self,
    audio: &[u8],
    encoding: AudioEncoding,
    sample_rate_hz: u32,
    language: &str,
  ) -> Result<String, ProviderError>;
}

/// Container/codec hint forwarded to the transcription provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEncoding {
  WebmOpus,
  OggOpus,
  Linear16,
  Flac,
  Mp3,
  Unspecified,
}

impl AudioEncoding {
  /// Guess the encoding from an upload's MIME type (parameters ignored).
  pub fn from_mime(mime: &str) -> Self {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
      "audio/webm" | "video/webm" => AudioEncoding::WebmOpus,
      "audio/ogg" | "audio/opus" => AudioEncoding::OggOpus,
      "audio/wav" | "audio/x-wav" | "audio/wave" => AudioEncoding::Linear16,
      "audio/flac" | "audio/x-flac" => AudioEncoding::Flac,
      "audio/mpeg" | "audio/mp3" => AudioEncoding::Mp3,
      _ => AudioEncoding::Unspecified,
    }
  }

  pub fn as_api_str(self) -> &'static str {
    match self {
      AudioEncoding::WebmOpus => "WEBM_OPUS",
      AudioEncoding::OggOpus => "OGG_OPUS",
      AudioEncoding::Linear16 => "LINEAR16",
      AudioEncoding::Flac => "FLAC",
      AudioEncoding::Mp3 => "MP3",
      AudioEncoding::Unspecified => "ENCODING_UNSPECIFIED",
    }
  }
}

/// Check status and return the body, turning non-2xx into `HttpStatus` with the
/// provider's own error message when it sends the usual `{"error": {"message"}}`.
pub(crate) async fn read_success_body(res: reqwest::Response) -> Result<String, ProviderError> {
  let status = res.status();
  let body = res.text().await?;
  if !status.is_success() {
    let message = extract_error_message(&body).unwrap_or(body);
    return Err(ProviderError::HttpStatus { status: status.as_u16(), message });
  }
  Ok(body)
}

fn extract_error_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
