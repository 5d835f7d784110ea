use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.modelplace.ai/v3/";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub polling: PollingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            auth: AuthSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

impl AuthSettings {
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.consumer_key, &self.consumer_secret) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self { interval_secs: 2 }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("modelplace").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;

        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!("api.base_url must be an http(s) URL, got {}", self.api.base_url);
        }
        if self.polling.interval_secs == 0 {
            anyhow::bail!("polling.interval_secs must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, DEFAULT_BASE_URL);
        assert!(settings.auth.consumer_key.is_none());
        assert_eq!(settings.polling.interval_secs, 2);
        assert_eq!(settings.polling.interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.polling.interval_secs = 0;
        assert!(settings.validate().is_err());

        settings.polling.interval_secs = 2;
        settings.api.base_url = "ftp://example.com".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [api]
            base_url = "https://staging.modelplace.ai/v3/"

            [auth]
            consumer_key = "key-123"
            consumer_secret = "secret-456"

            [polling]
            interval_secs = 5
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.api.base_url, "https://staging.modelplace.ai/v3/");
        assert_eq!(
            settings.auth.credentials(),
            Some(("key-123".to_string(), "secret-456".to_string()))
        );
        assert_eq!(settings.polling.interval_secs, 5);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings: Settings = toml::from_str("[auth]\nconsumer_key = \"k\"").unwrap();
        assert_eq!(settings.api.base_url, DEFAULT_BASE_URL);
        assert!(settings.auth.credentials().is_none());
        assert_eq!(settings.polling.interval_secs, 2);
    }
}
