use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AUDIO_EXTENSION: Regex =
        Regex::new(r"\.(mp3|wav|ogg|m4a|aac)($|\?)").expect("audio extension regex");
    static ref DATA_URL_HEADER: Regex =
        Regex::new(r"^data:([^;,]*)(;base64)?,").expect("data url regex");
}

/// A reference to a single image or audio asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Remote or app-served URL
    Url(String),
    /// Embedded `data:` URL carrying the asset inline
    DataUrl(String),
}

impl MediaSource {
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("data:") {
            MediaSource::DataUrl(reference.to_string())
        } else {
            MediaSource::Url(reference.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaSource::Url(s) | MediaSource::DataUrl(s) => s,
        }
    }

    /// Rewrites an audio reference into a form the player and the rendering
    /// backend both accept.
    ///
    /// Narration services sometimes hand back data URLs with a generic or
    /// missing MIME tag; those are retagged as `audio/mpeg`. Plain URLs
    /// without a recognized audio extension get a `type=audio/mpeg` query
    /// hint. A data URL with no payload separator is rejected outright.
    pub fn normalized_audio(&self) -> Result<MediaSource> {
        match self {
            MediaSource::DataUrl(raw) => {
                let Some(captures) = DATA_URL_HEADER.captures(raw) else {
                    bail!("malformed data URL: missing payload separator");
                };
                if captures.get(2).is_some() {
                    let payload_start = captures.get(0).map(|m| m.end()).unwrap_or(0);
                    BASE64
                        .decode(&raw[payload_start..])
                        .context("data URL payload is not valid base64")?;
                }
                let mime = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                if mime.starts_with("audio/") {
                    return Ok(self.clone());
                }
                // Keep the payload (and any ;base64 tag) as-is, swap the MIME.
                let mime_end = captures.get(1).map(|m| m.end()).unwrap_or(5);
                Ok(MediaSource::DataUrl(format!(
                    "data:audio/mpeg{}",
                    &raw[mime_end..]
                )))
            }
            MediaSource::Url(raw) => {
                if AUDIO_EXTENSION.is_match(raw) {
                    return Ok(self.clone());
                }
                let separator = if raw.contains('?') { '&' } else { '?' };
                Ok(MediaSource::Url(format!(
                    "{}{}type=audio/mpeg",
                    raw, separator
                )))
            }
        }
    }
}

/// The images + narration bundle for one generated video.
///
/// Immutable after construction; regenerating assets produces a new set.
#[derive(Debug, Clone)]
pub struct MediaSet {
    images: Vec<MediaSource>,
    audio: Option<MediaSource>,
}

impl MediaSet {
    pub fn new(images: Vec<MediaSource>, audio: Option<MediaSource>) -> Result<Self> {
        if images.is_empty() {
            bail!("a media set needs at least one image");
        }
        Ok(Self { images, audio })
    }

    pub fn images(&self) -> &[MediaSource] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn audio(&self) -> Option<&MediaSource> {
        self.audio.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_image_list() {
        assert!(MediaSet::new(Vec::new(), None).is_err());
    }

    #[test]
    fn parse_distinguishes_data_urls() {
        assert!(matches!(
            MediaSource::parse("data:audio/mpeg;base64,AAAA"),
            MediaSource::DataUrl(_)
        ));
        assert!(matches!(
            MediaSource::parse("https://cdn.example/a.mp3"),
            MediaSource::Url(_)
        ));
    }

    #[test]
    fn retags_data_url_without_audio_mime() {
        let source = MediaSource::parse("data:application/octet-stream;base64,AAAA");
        let normalized = source.normalized_audio().unwrap();
        assert_eq!(
            normalized.as_str(),
            "data:audio/mpeg;base64,AAAA"
        );
    }

    #[test]
    fn keeps_correctly_tagged_data_url() {
        let source = MediaSource::parse("data:audio/mpeg;base64,AAAA");
        assert_eq!(source.normalized_audio().unwrap(), source);
    }

    #[test]
    fn rejects_data_url_without_payload() {
        let source = MediaSource::parse("data:application/octet-stream");
        assert!(source.normalized_audio().is_err());
    }

    #[test]
    fn rejects_undecodable_base64_payload() {
        let source = MediaSource::parse("data:audio/mpeg;base64,!!not-base64!!");
        assert!(source.normalized_audio().is_err());
    }

    #[test]
    fn hints_content_type_for_extensionless_url() {
        let source = MediaSource::parse("https://cdn.example/narration");
        assert_eq!(
            source.normalized_audio().unwrap().as_str(),
            "https://cdn.example/narration?type=audio/mpeg"
        );

        let with_query = MediaSource::parse("https://cdn.example/narration?id=7");
        assert_eq!(
            with_query.normalized_audio().unwrap().as_str(),
            "https://cdn.example/narration?id=7&type=audio/mpeg"
        );
    }

    #[test]
    fn leaves_recognized_audio_url_alone() {
        let source = MediaSource::parse("https://cdn.example/a.wav?sig=x");
        assert_eq!(source.normalized_audio().unwrap(), source);
    }
}
