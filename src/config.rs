use anyhow::{Context, Result};
use dirs::{cache_dir, config_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_MIN_SLIDE_SECONDS: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API key for the generation services (script, image, narration)
    pub api_key: Option<String>,
    /// Base URL for the generation API
    pub api_base_url: String,
    /// Narration voice passed to the speech service
    pub voice: String,
    /// Minimum seconds a slide stays on screen
    pub min_slide_seconds: f64,
    /// Cloud rendering backend; absent means client-side playback only
    pub render: Option<RenderBackendConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderBackendConfig {
    /// Render submission endpoint
    pub endpoint: String,
    /// API key for the rendering backend
    pub api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            min_slide_seconds: DEFAULT_MIN_SLIDE_SECONDS,
            render: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(app_config_path()?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents).context("parsing config")?;
        if !config.min_slide_seconds.is_finite() || config.min_slide_seconds <= 0.0 {
            config.min_slide_seconds = DEFAULT_MIN_SLIDE_SECONDS;
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(app_config_path()?)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("API key not configured. Set `api_key` in the shortform config file")
    }
}

fn app_config_path() -> Result<PathBuf> {
    Ok(config_dir()
        .context("Unable to determine config directory")?
        .join("shortform")
        .join("config.toml"))
}

/// Directory for generated assets (narration audio, downloaded renders).
pub fn asset_cache_dir() -> Result<PathBuf> {
    let dir = cache_dir()
        .context("Unable to determine cache directory for generated assets")?
        .join("shortform")
        .join("assets");
    fs::create_dir_all(&dir).with_context(|| {
        format!("Failed to create asset cache directory at {}", dir.display())
    })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = AppConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.voice, DEFAULT_VOICE);
        assert!(config.render.is_none());
    }

    #[test]
    fn round_trips_render_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.render = Some(RenderBackendConfig {
            endpoint: "https://render.example/v1/renders".to_string(),
            api_key: "rk-123".to_string(),
        });
        config.save_to_path(&path).unwrap();

        let loaded = AppConfig::load_from_path(&path).unwrap();
        let render = loaded.render.expect("render backend");
        assert_eq!(render.endpoint, "https://render.example/v1/renders");
    }

    #[test]
    fn invalid_slide_floor_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "min_slide_seconds = -3.0\n").unwrap();
        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.min_slide_seconds, DEFAULT_MIN_SLIDE_SECONDS);
    }
}
