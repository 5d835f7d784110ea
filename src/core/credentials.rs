use crate::core::error::{Error, Result};
use crate::core::models::{LoginResponse, TokenResponse};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn from_login(response: &LoginResponse) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: Some(response.refresh_token.clone()),
            expires_at: Some(Utc::now() + Duration::seconds(response.expires_in)),
        }
    }

    pub fn from_token(response: &TokenResponse) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    /// A credential with no expiry is treated as live until the server says
    /// otherwise with a 401.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now(),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    path: PathBuf,
    cached: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("modelplace").join("credentials.json"))
    }

    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
        Ok(Self::new(path))
    }

    pub async fn load(&self) -> Result<Option<Credential>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential: Credential = serde_json::from_str(&content)?;

        let mut cached = self.cached.write().await;
        *cached = Some(credential.clone());
        Ok(Some(credential))
    }

    pub async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, content).await?;

        let mut cached = self.cached.write().await;
        *cached = Some(credential.clone());

        tracing::debug!(path = ?self.path, "Credential saved");
        Ok(())
    }

    pub async fn current(&self) -> Option<Credential> {
        self.cached.read().await.clone()
    }

    pub async fn is_authorized(&self) -> bool {
        self.current()
            .await
            .map(|c| !c.is_expired())
            .unwrap_or(false)
    }
}
