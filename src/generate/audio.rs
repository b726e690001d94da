//! Narration synthesis. Response bytes land in the asset cache directory;
//! the cache maps the request back to the written file's path.

use rand::Rng;
use reqwest::Client;
use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{ServiceError, key_fragment, status_error};
use crate::cache::TtlCache;
use crate::config::{AppConfig, asset_cache_dir};
use crate::ui::prelude::{Level, emit};

const AUDIO_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const SPEECH_MODEL: &str = "tts-1";

pub struct AudioGenerator {
    cache: TtlCache<String>,
}

impl Default for AudioGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGenerator {
    pub fn new() -> Self {
        Self::with_ttl(AUDIO_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    /// Synthesizes narration for `text` and returns the path of the written
    /// MP3 file.
    pub async fn generate(
        &mut self,
        client: &Client,
        config: &AppConfig,
        text: &str,
        voice: Option<&str>,
        unique_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput("text is required".to_string()));
        }
        let voice = voice.unwrap_or(&config.voice);

        let cache_key = match unique_id {
            Some(id) => format!("audio-{id}-{voice}"),
            None => format!("audio-{}-{voice}", key_fragment(text, 50)),
        };
        if let Some(path) = self.cache.get(&cache_key) {
            emit(
                Level::Debug,
                "generate.audio.cached",
                &format!("Using cached narration at {path}"),
                None,
            );
            return Ok(path);
        }

        let path = request_speech(client, config, text, voice).await?;
        self.cache.set(cache_key, path.clone());
        Ok(path)
    }
}

async fn request_speech(
    client: &Client,
    config: &AppConfig,
    text: &str,
    voice: &str,
) -> Result<String, ServiceError> {
    let api_key = config
        .require_api_key()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let url = format!("{}/audio/speech", config.api_base_url);
    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&serde_json::json!({
            "model": SPEECH_MODEL,
            "voice": voice,
            "input": text,
        }))
        .send()
        .await
        .map_err(|err| ServiceError::Transient(format!("speech request failed: {err}")))?;

    if !resp.status().is_success() {
        return Err(status_error("speech", resp).await);
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|err| ServiceError::Transient(format!("speech download failed: {err}")))?;

    let dir = asset_cache_dir()
        .map_err(|err| ServiceError::Transient(format!("asset directory unavailable: {err}")))?;
    let path = dir.join(narration_filename(voice));
    fs::write(&path, &bytes).map_err(|err| {
        ServiceError::Transient(format!("failed to write narration to {}: {err}", path.display()))
    })?;

    emit(
        Level::Info,
        "generate.audio.saved",
        &format!("Narration saved to {}", path.display()),
        None,
    );
    Ok(path.display().to_string())
}

/// Timestamp plus a random suffix keeps concurrent generations from
/// clobbering each other.
fn narration_filename(voice: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{timestamp}{suffix}-{voice}.mp3")
}
