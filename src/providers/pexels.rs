//! Pexels photo search for the Describe Image task.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::{read_success_body, ImageSearch, ProviderError};
use crate::domain::ImageResult;

const DEFAULT_BASE_URL: &str = "https://api.pexels.com/v1";
const PER_PAGE: u32 = 10;

#[derive(Clone)]
pub struct Pexels {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl Pexels {
  /// Construct the client if we find PEXELS_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("PEXELS_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("PEXELS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(20)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "upstream", error = %e, "Failed to build HTTP client for Pexels");
        return None;
      }
    };
    Some(Self { client, api_key, base_url })
  }
}

#[async_trait]
impl ImageSearch for Pexels {
  #[instrument(level = "info", skip(self))]
  async fn search_image(&self, query: &str) -> Result<ImageResult, ProviderError> {
    let url = format!("{}/search", self.base_url.trim_end_matches('/'));
    let per_page = PER_PAGE.to_string();
    let start = Instant::now();
    let res = self
      .client
      .get(url)
      .query(&[("query", query), ("per_page", per_page.as_str())])
      .header(USER_AGENT, "pte-practice-backend/0.1")
      .header(AUTHORIZATION, &self.api_key)
      .send()
      .await?;
    let body = read_success_body(res).await?;

    let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    info!(target: "upstream", elapsed = ?start.elapsed(), hits = parsed.photos.len(), "Pexels search");
    pick_photo(parsed.photos, &mut rand::thread_rng())
  }
}

fn pick_photo<R: rand::Rng + ?Sized>(photos: Vec<Photo>, rng: &mut R) -> Result<ImageResult, ProviderError> {
  let photo = photos
    .choose(rng)
    .ok_or_else(|| ProviderError::NoResults("No images found for the topic".into()))?;
  Ok(ImageResult {
    image_url: photo.src.large.clone(),
    alt_text: photo.alt.clone(),
    attribution: photo.photographer.clone(),
  })
}

// --- Pexels DTOs ---

#[derive(Deserialize)]
struct SearchResponse {
  #[serde(default)]
  photos: Vec<Photo>,
}
#[derive(Deserialize)]
struct Photo {
  src: PhotoSrc,
  #[serde(default)]
  alt: String,
  #[serde(default)]
  photographer: String,
}
#[derive(Deserialize)]
struct PhotoSrc {
  large: String,
}
