use thiserror::Error;

pub mod audio;
pub mod image;
pub mod script;
pub mod trending;

pub use audio::AudioGenerator;
pub use image::ImageGenerator;
pub use script::{Script, ScriptGenerator};
pub use trending::TrendingTopic;

/// Failure taxonomy for the vendor service wrappers.
///
/// Invalid input is rejected synchronously before any network call; anything
/// that happened on the wire (including malformed vendor JSON) is transient
/// and worth a retry affordance. Nothing here is fatal to the player.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} (retryable)")]
    Transient(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}

/// First `max` characters of `s`, respecting char boundaries. Used to build
/// stable cache keys from free-form text.
pub(crate) fn key_fragment(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Maps a completed-but-unsuccessful HTTP response into a transient error,
/// capturing the body for diagnosis.
pub(crate) async fn status_error(
    service: &str,
    resp: reqwest::Response,
) -> ServiceError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    ServiceError::Transient(format!("{service} API error ({status}): {body}"))
}
