//! Google Cloud Speech-to-Text (v1 `speech:recognize`) client.
//!
//! Auth is either an API key (GOOGLE_SPEECH_API_KEY) or an OAuth access token
//! minted for a service account (GOOGLE_SPEECH_ACCESS_TOKEN). Audio is sent
//! inline as base64, which keeps us to the synchronous endpoint (~1 minute of audio).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{read_success_body, AudioEncoding, ProviderError, Transcriber};

const DEFAULT_BASE_URL: &str = "https://speech.googleapis.com/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechAuth {
  ApiKey(String),
  BearerToken(String),
}

#[derive(Clone)]
pub struct GoogleSpeech {
  pub client: reqwest::Client,
  pub auth: SpeechAuth,
  pub base_url: String,
}

impl GoogleSpeech {
  /// Construct the client if credentials are present; otherwise return None.
  /// The access token wins when both are set.
  pub fn from_env() -> Option<Self> {
    let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    let auth = match (non_empty("GOOGLE_SPEECH_ACCESS_TOKEN"), non_empty("GOOGLE_SPEECH_API_KEY")) {
      (Some(token), _) => SpeechAuth::BearerToken(token),
      (None, Some(key)) => SpeechAuth::ApiKey(key),
      (None, None) => return None,
    };
    let base_url = std::env::var("GOOGLE_SPEECH_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(30)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "upstream", error = %e, "Failed to build HTTP client for speech");
        return None;
      }
    };
    Some(Self { client, auth, base_url })
  }
}

#[async_trait]
impl Transcriber for GoogleSpeech {
  #[instrument(level = "info", skip(self, audio, encoding), fields(audio_bytes = audio.len(), encoding = encoding.as_api_str()))]
  async fn transcribe(
    &self,
    audio: &[u8],
    encoding: AudioEncoding,
    sample_rate_hz: u32,
    language: &str,
  ) -> Result<String, ProviderError> {
    let req = build_request(audio, encoding, sample_rate_hz, language);
    let url = format!("{}/speech:recognize", self.base_url.trim_end_matches('/'));

    let mut builder = self
      .client
      .post(url)
      .header(USER_AGENT, "pte-practice-backend/0.1")
      .header(CONTENT_TYPE, "application/json");
    builder = match &self.auth {
      SpeechAuth::ApiKey(key) => builder.header("x-goog-api-key", key),
      SpeechAuth::BearerToken(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
    };

    let start = Instant::now();
    let res = builder.json(&req).send().await?;
    let body = read_success_body(res).await?;
    let parsed: RecognizeResponse = serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let transcript = join_transcript(parsed);
    info!(target: "upstream", elapsed = ?start.elapsed(), transcript_len = transcript.len(), "Speech recognized");
    Ok(transcript)
  }
}

fn build_request(audio: &[u8], encoding: AudioEncoding, sample_rate_hz: u32, language: &str) -> RecognizeRequest {
  RecognizeRequest {
    config: RecognitionConfig {
      encoding: encoding.as_api_str(),
      // Containers that carry their own header reject an explicit rate mismatch.
      sample_rate_hertz: match encoding {
        AudioEncoding::Linear16 | AudioEncoding::Flac | AudioEncoding::Unspecified => None,
        _ => Some(sample_rate_hz),
      },
      language_code: language.to_string(),
      enable_automatic_punctuation: true,
    },
    audio: RecognitionAudio { content: BASE64.encode(audio) },
  }
}

/// Best alternative of every result, space-joined. No results means silence.
fn join_transcript(res: RecognizeResponse) -> String {
  res
    .results
    .into_iter()
    .filter_map(|r| r.alternatives.into_iter().next())
    .map(|a| a.transcript.trim().to_string())
    .filter(|t| !t.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

// --- Speech DTOs ---

#[derive(Serialize)]
struct RecognizeRequest {
  config: RecognitionConfig,
  audio: RecognitionAudio,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
  encoding: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  sample_rate_hertz: Option<u32>,
  language_code: String,
  enable_automatic_punctuation: bool,
}
#[derive(Serialize)]
struct RecognitionAudio {
  content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
  #[serde(default)]
  results: Vec<RecognitionResult>,
}
#[derive(Deserialize)]
struct RecognitionResult {
  #[serde(default)]
  alternatives: Vec<Alternative>,
}
#[derive(Deserialize)]
struct Alternative {
  #[serde(default)]
  transcript: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_carries_base64_audio_and_config() {
    let req = build_request(b"abc", AudioEncoding::WebmOpus, 48_000, "en-US");
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["audio"]["content"], "YWJj");
    assert_eq!(v["config"]["encoding"], "WEBM_OPUS");
    assert_eq!(v["config"]["sampleRateHertz"], 48_000);
    assert_eq!(v["config"]["languageCode"], "en-US");
  }

  #[test]
  fn wav_omits_sample_rate() {
    let req = build_request(b"", AudioEncoding::Linear16, 16_000, "en-GB");
    let v = serde_json::to_value(&req).unwrap();
    assert!(v["config"].get("sampleRateHertz").is_none());
  }

  #[test]
  fn joins_best_alternatives() {
    let body = r#"{"results": [
      {"alternatives": [{"transcript": "the quick brown fox ", "confidence": 0.9}, {"transcript": "the quick brown socks"}]},
      {"alternatives": [{"transcript": "jumps over the dog"}]}
    ]}"#;
    let parsed: RecognizeResponse = serde_json::from_str(body).unwrap();
    assert_eq!(join_transcript(parsed), "the quick brown fox jumps over the dog");
  }

  #[test]
  fn silence_is_an_empty_transcript() {
    let parsed: RecognizeResponse = serde_json::from_str(r#"{"totalBilledTime": "3s"}"#).unwrap();
    assert_eq!(join_transcript(parsed), "");
  }
}
