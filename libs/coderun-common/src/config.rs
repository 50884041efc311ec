// Client configuration for coderun
use crate::endpoints::Endpoints;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const ENV_API_URL: &str = "CODERUN_API_URL";
pub const ENV_TOKEN: &str = "CODERUN_TOKEN";

/// How to acquire results when a 202 reply carries no streaming hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptMode {
    #[default]
    Poll,
    Stream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub poll_interval_ms: u64,
    pub unhinted_accept: AcceptMode,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            unhinted_accept: AcceptMode::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Load client configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Client config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ClientConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load config/client.json when present, defaults otherwise,
    /// then apply environment overrides
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if default_path.exists() {
            Self::load(default_path)?
        } else {
            tracing::debug!(path = DEFAULT_CONFIG_PATH, "No client config file, using defaults");
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `CODERUN_API_URL` / `CODERUN_TOKEN`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_TOKEN).ok(),
        )
    }

    fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token.trim().to_string());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("api_url must be an http(s) URL, got '{}'", self.api_url);
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("coderun-{}-{}.json", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.unhinted_accept, AcceptMode::Poll);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let path = write_temp(
            "partial",
            r#"{ "api_url": "https://judge.example.com", "unhinted_accept": "stream" }"#,
        );
        let config = ClientConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.api_url, "https://judge.example.com");
        assert_eq!(config.unhinted_accept, AcceptMode::Stream);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_load_rejects_bad_url() {
        let path = write_temp("bad-url", r#"{ "api_url": "localhost:8000" }"#);
        let result = ClientConfig::load(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClientConfig::load(Path::new("does/not/exist.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let config = ClientConfig::default()
            .with_overrides(Some("  ".to_string()), Some("tok".to_string()));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token.as_deref(), Some("tok"));

        let config = ClientConfig::default()
            .with_overrides(Some("http://10.0.0.2:9000".to_string()), None);
        assert_eq!(config.api_url, "http://10.0.0.2:9000");
        assert_eq!(config.token, None);
    }
}
