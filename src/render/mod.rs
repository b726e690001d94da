//! Cloud rendering of a media set into a downloadable MP4.
//!
//! An unconfigured backend is a normal condition: the caller falls back to
//! client-side playback and shows setup guidance. A failed render is
//! retryable by the user but never retried automatically, since every
//! attempt bills the rendering backend.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::sleep;

use crate::cache::TtlCache;
use crate::config::RenderBackendConfig;
use crate::media::MediaSet;
use crate::ui::prelude::{Level, emit};

const RENDER_CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 120;
const FRAME_RATE: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactResult {
    /// The backend produced a downloadable file.
    Ready { url: String },
    /// No backend configured; client-side playback only.
    Unavailable { guidance: RenderGuidance },
    /// A render was attempted and explicitly failed.
    Failed { reason: String },
}

/// Human-readable setup instructions shown when no backend is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGuidance {
    pub title: String,
    pub steps: Vec<String>,
}

impl RenderGuidance {
    fn setup() -> Self {
        Self {
            title: "Set up a cloud rendering backend for downloads".to_string(),
            steps: vec![
                "1. Sign up with a rendering provider and create an API key".to_string(),
                "2. Add a [render] section to the shortform config file".to_string(),
                "3. Set `endpoint` to the provider's render URL and `api_key` to your key"
                    .to_string(),
                "4. Run the render command again once configured".to_string(),
            ],
        }
    }
}

/// Opaque handle tying an in-flight render to the session generation that
/// started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

/// Tracks which render request is current for one player view.
///
/// Regenerating assets starts a new generation; a result delivered against a
/// stale ticket is discarded instead of overwriting newer state.
#[derive(Debug, Default)]
pub struct RenderSession {
    generation: u64,
    outcome: Option<ArtifactResult>,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding any still in flight.
    pub fn begin(&mut self) -> RenderTicket {
        self.generation += 1;
        RenderTicket(self.generation)
    }

    /// Applies `result` if `ticket` is still current. Returns whether it
    /// was applied.
    pub fn complete(&mut self, ticket: RenderTicket, result: ArtifactResult) -> bool {
        if ticket.0 != self.generation {
            emit(
                Level::Debug,
                "render.superseded",
                &format!(
                    "Discarding render result from superseded request #{}",
                    ticket.0
                ),
                None,
            );
            return false;
        }
        self.outcome = Some(result);
        true
    }

    pub fn outcome(&self) -> Option<&ArtifactResult> {
        self.outcome.as_ref()
    }
}

pub struct Renderer {
    backend: Option<RenderBackendConfig>,
    cache: TtlCache<String>,
}

impl Renderer {
    pub fn new(backend: Option<RenderBackendConfig>) -> Self {
        Self {
            backend,
            cache: TtlCache::new(RENDER_CACHE_TTL),
        }
    }

    /// Submits `media_set` for rendering and resolves to a downloadable
    /// artifact URL, guidance, or an explicit failure.
    ///
    /// Errors only on invalid input (no audio track, unusable audio
    /// reference); everything that happens after submission is reported
    /// through [`ArtifactResult`].
    pub async fn request_artifact(
        &mut self,
        client: &Client,
        media_set: &MediaSet,
        total_duration: f64,
    ) -> Result<ArtifactResult> {
        let Some(backend) = self.backend.clone() else {
            emit(
                Level::Info,
                "render.unavailable",
                "No rendering backend configured; falling back to client-side playback",
                None,
            );
            return Ok(ArtifactResult::Unavailable {
                guidance: RenderGuidance::setup(),
            });
        };

        let audio = media_set
            .audio()
            .ok_or_else(|| anyhow::anyhow!("rendering requires a narration track"))?
            .normalized_audio()?;

        let duration_in_frames = (total_duration * FRAME_RATE as f64).ceil() as u64;
        let cache_key = render_cache_key(media_set, audio.as_str(), duration_in_frames);
        if let Some(url) = self.cache.get(&cache_key) {
            emit(
                Level::Info,
                "render.cached",
                "Reusing previously rendered video",
                None,
            );
            return Ok(ArtifactResult::Ready { url });
        }

        let result = submit_and_poll(client, &backend, media_set, audio.as_str(), duration_in_frames)
            .await;
        if let ArtifactResult::Ready { url } = &result {
            self.cache.set(cache_key, url.clone());
        }
        Ok(result)
    }
}

/// Cache key over every input that changes the output video.
fn render_cache_key(media_set: &MediaSet, audio: &str, duration_in_frames: u64) -> String {
    let mut hasher = Sha256::new();
    for image in media_set.images() {
        hasher.update(image.as_str().as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(audio.as_bytes());
    hasher.update(duration_in_frames.to_le_bytes());
    format!("render-{:x}", hasher.finalize())
}

async fn submit_and_poll(
    client: &Client,
    backend: &RenderBackendConfig,
    media_set: &MediaSet,
    audio: &str,
    duration_in_frames: u64,
) -> ArtifactResult {
    let images: Vec<&str> = media_set.images().iter().map(|s| s.as_str()).collect();

    emit(
        Level::Info,
        "render.submit",
        &format!(
            "Submitting {} images and narration for rendering...",
            images.len()
        ),
        None,
    );

    let resp = match client
        .post(&backend.endpoint)
        .bearer_auth(&backend.api_key)
        .json(&json!({
            "images": images,
            "audioUrl": audio,
            "durationInFrames": duration_in_frames,
            "frameRate": FRAME_RATE,
            "outputFormat": "mp4",
        }))
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            return ArtifactResult::Failed {
                reason: format!("render submission failed: {err}"),
            };
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return ArtifactResult::Failed {
            reason: format!("render backend error ({status}): {body}"),
        };
    }

    let body: Value = match resp.json().await {
        Ok(body) => body,
        Err(err) => {
            return ArtifactResult::Failed {
                reason: format!("render response unreadable: {err}"),
            };
        }
    };

    // Some backends answer synchronously with the finished URL.
    if let Some(url) = direct_video_url(&body) {
        emit(Level::Success, "render.done", "Video rendered", None);
        return ArtifactResult::Ready { url };
    }

    let Some(render_id) = body["renderId"].as_str().or_else(|| body["id"].as_str()) else {
        return ArtifactResult::Failed {
            reason: "render backend returned neither a video URL nor a render id".to_string(),
        };
    };

    poll_render(client, backend, render_id).await
}

fn direct_video_url(body: &Value) -> Option<String> {
    body["videoUrl"]
        .as_str()
        .or_else(|| body["url"].as_str())
        .map(str::to_string)
}

async fn poll_render(
    client: &Client,
    backend: &RenderBackendConfig,
    render_id: &str,
) -> ArtifactResult {
    let status_url = format!("{}/{}", backend.endpoint.trim_end_matches('/'), render_id);

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("progress template"),
    );
    bar.set_message("Rendering...");

    for _ in 0..MAX_POLLS {
        sleep(POLL_INTERVAL).await;
        bar.tick();

        let resp = match client
            .get(&status_url)
            .bearer_auth(&backend.api_key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                emit(
                    Level::Warn,
                    "render.poll",
                    &format!("Status check failed, retrying: {err}"),
                    None,
                );
                continue;
            }
        };

        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(_) => continue,
        };

        let status = body["status"].as_str().unwrap_or("unknown");
        bar.set_message(format!("Rendering... ({status})"));

        match status {
            "done" | "succeeded" => {
                bar.finish_and_clear();
                if let Some(url) = direct_video_url(&body) {
                    emit(Level::Success, "render.done", "Video rendered", None);
                    return ArtifactResult::Ready { url };
                }
                return ArtifactResult::Failed {
                    reason: "render finished but no video URL was returned".to_string(),
                };
            }
            "failed" | "error" => {
                bar.finish_and_clear();
                let reason = body["errorMessage"]
                    .as_str()
                    .or_else(|| body["error"].as_str())
                    .unwrap_or("render backend reported failure");
                return ArtifactResult::Failed {
                    reason: reason.to_string(),
                };
            }
            _ => {}
        }
    }

    bar.finish_and_clear();
    ArtifactResult::Failed {
        reason: "render timed out".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaSource;

    fn media_set() -> MediaSet {
        MediaSet::new(
            vec![
                MediaSource::parse("https://cdn.example/1.png"),
                MediaSource::parse("https://cdn.example/2.png"),
            ],
            Some(MediaSource::parse("https://cdn.example/narration.mp3")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unconfigured_backend_reports_unavailable_with_guidance() {
        let mut renderer = Renderer::new(None);
        let client = Client::new();
        let result = renderer
            .request_artifact(&client, &media_set(), 20.0)
            .await
            .unwrap();
        match result {
            ArtifactResult::Unavailable { guidance } => {
                assert!(!guidance.steps.is_empty());
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_audio_is_rejected_before_submission() {
        let set = MediaSet::new(
            vec![MediaSource::parse("https://cdn.example/1.png")],
            None,
        )
        .unwrap();
        let mut renderer = Renderer::new(Some(RenderBackendConfig {
            endpoint: "https://render.example/v1/renders".to_string(),
            api_key: "rk".to_string(),
        }));
        let client = Client::new();
        assert!(renderer.request_artifact(&client, &set, 20.0).await.is_err());
    }

    #[test]
    fn superseded_result_is_discarded() {
        let mut session = RenderSession::new();

        let ticket_a = session.begin();
        let ticket_b = session.begin();

        let applied = session.complete(
            ticket_b,
            ArtifactResult::Ready {
                url: "https://cdn.example/b.mp4".to_string(),
            },
        );
        assert!(applied);

        // A's late result must not overwrite B's.
        let applied = session.complete(
            ticket_a,
            ArtifactResult::Failed {
                reason: "stale".to_string(),
            },
        );
        assert!(!applied);
        assert_eq!(
            session.outcome(),
            Some(&ArtifactResult::Ready {
                url: "https://cdn.example/b.mp4".to_string()
            })
        );
    }

    #[test]
    fn cache_key_is_stable_and_input_sensitive() {
        let set = media_set();
        let a = render_cache_key(&set, "audio.mp3", 600);
        let b = render_cache_key(&set, "audio.mp3", 600);
        let c = render_cache_key(&set, "audio.mp3", 601);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
