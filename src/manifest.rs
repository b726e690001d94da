use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generate::Script;
use crate::media::{MediaSet, MediaSource};

/// On-disk record of one generated video's assets, shared between the
/// generate, preview, and render commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoManifest {
    pub topic: String,
    pub category: String,
    pub script: Script,
    pub images: Vec<String>,
    pub audio: Option<String>,
    /// Narration length in seconds, once known. Frequently absent right
    /// after generation because audio metadata loads later.
    pub audio_duration: Option<f64>,
}

impl VideoManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading manifest from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing manifest {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating manifest directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing manifest")?;
        fs::write(path, json)
            .with_context(|| format!("writing manifest to {}", path.display()))
    }

    pub fn media_set(&self) -> Result<MediaSet> {
        let images = self
            .images
            .iter()
            .map(|reference| MediaSource::parse(reference))
            .collect();
        let audio = self.audio.as_deref().map(MediaSource::parse);
        MediaSet::new(images, audio)
    }
}
