use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated config/cache/home tree for one CLI invocation.
///
/// The binary resolves its directories through the XDG environment
/// variables, so pointing those at a tempdir keeps tests away from the
/// developer's real config.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    pub fn config_home(&self) -> PathBuf {
        self.temp_dir.path().join("config")
    }

    pub fn cache_home(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// Writes the app config file the binary will pick up.
    pub fn write_config(&self, contents: &str) -> Result<()> {
        let dir = self.config_home().join("shortform");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("config.toml"), contents)?;
        Ok(())
    }

    /// Drops a manifest file into the temp tree and returns its path.
    pub fn write_manifest(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
