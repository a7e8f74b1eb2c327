use anyhow::{Context, Result};
use config::{Config as Layered, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_AI_THRESHOLD;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

const DEFAULT_CONFIG: &str = r#"# recruit client configuration
# Every key can also be set through the environment, e.g. RECRUIT_API_URL.

# Backend base URL, including the /api prefix
api_url = "http://localhost:5000/api"

# Default match threshold for AI ranking (0-1)
ai_threshold = 0.7

# Request timeout in seconds. Leave unset to wait as long as the transport does.
# timeout_secs = 30

# Log filter used when RUST_LOG is not set
log_level = "warn"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub ai_threshold: f64,
    pub timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ai_threshold: DEFAULT_AI_THRESHOLD,
            timeout_secs: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads the user config file (writing a commented default the first
    /// time) and applies `RECRUIT_*` environment overrides on top.
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        if !path.exists() {
            std::fs::write(&path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        }
        let config = Self::load_from(&path)?;
        Ok((config, path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Config::default();
        let config = Layered::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("ai_threshold", defaults.ai_threshold)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("RECRUIT"))
            .build()
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let config: Config = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ai_threshold) {
            anyhow::bail!("ai_threshold must be between 0 and 1, got {}", self.ai_threshold);
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://, got '{}'", self.api_url);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

pub fn default_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "recruit") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("recruit.toml")
    }
}

/// Where the session file and the TUI log live.
pub fn data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "recruit") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ai_threshold, 0.7);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.api_url.starts_with("http"));
        assert_eq!(config.ai_threshold, DEFAULT_AI_THRESHOLD);
    }

    #[test]
    fn test_file_values_and_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            "api_url = \"https://jobs.example.com/api\"\nai_threshold = 0.4\ntimeout_secs = 12\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url, "https://jobs.example.com/api");
        assert_eq!(config.ai_threshold, 0.4);
        assert_eq!(config.timeout(), Some(Duration::from_secs(12)));

        std::fs::write(&path, "ai_threshold = 3.0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "api_url = \"ftp://nope\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
