//! One generated image per visual beat, with an idempotency cache.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use super::{ServiceError, status_error};
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::ui::prelude::{Level, emit};

const IMAGE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const IMAGE_MODEL: &str = "dall-e-3";

lazy_static! {
    // Suggested visuals often arrive as "Scene label: actual description".
    static ref LABEL_PREFIX: Regex = Regex::new(r"^[^:]+:\s*").expect("label prefix regex");
}

pub struct ImageGenerator {
    cache: TtlCache<String>,
}

impl Default for ImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageGenerator {
    pub fn new() -> Self {
        Self::with_ttl(IMAGE_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    /// Returns the URL of a generated image for `prompt`. Identical
    /// prompt + unique-id pairs resolve to the cached URL for the cache
    /// lifetime, so regenerating a manifest does not re-bill every image.
    pub async fn generate(
        &mut self,
        client: &Client,
        config: &AppConfig,
        prompt: &str,
        unique_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        if prompt.trim().is_empty() {
            return Err(ServiceError::InvalidInput("prompt is required".to_string()));
        }

        let cache_key = match unique_id {
            Some(id) => format!("image-{id}-{prompt}"),
            None => format!("image-{prompt}"),
        };
        if let Some(url) = self.cache.get(&cache_key) {
            emit(
                Level::Debug,
                "generate.image.cached",
                "Using cached image URL",
                None,
            );
            return Ok(url);
        }

        let url = request_image(client, config, prompt).await?;
        self.cache.set(cache_key, url.clone());
        Ok(url)
    }
}

async fn request_image(
    client: &Client,
    config: &AppConfig,
    prompt: &str,
) -> Result<String, ServiceError> {
    let api_key = config
        .require_api_key()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let styled_prompt = format!(
        "Create a whimsical, painterly illustration with soft, vibrant colors, \
         attention to natural elements, and dreamlike lighting. The image should \
         suit a short social media video about: {}. Keep a hand-drawn animation \
         look with detailed backgrounds and charming character design.",
        clean_prompt(prompt)
    );

    let url = format!("{}/images/generations", config.api_base_url);
    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&json!({
            "model": IMAGE_MODEL,
            "prompt": styled_prompt,
            "n": 1,
            "size": "1024x1024",
            "quality": "standard",
            "response_format": "url",
        }))
        .send()
        .await
        .map_err(|err| ServiceError::Transient(format!("image request failed: {err}")))?;

    if !resp.status().is_success() {
        return Err(status_error("image", resp).await);
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|err| ServiceError::Transient(format!("image response unreadable: {err}")))?;

    body["data"][0]["url"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::Transient("no image URL in generation response".to_string())
        })
}

/// Strips a leading `label:` prefix so the style wrapper reads naturally.
fn clean_prompt(prompt: &str) -> String {
    LABEL_PREFIX.replace(prompt, "").trim().to_string()
}
