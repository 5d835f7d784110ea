use crate::cloud::gate::TokenRefresher;
use crate::core::credentials::{Credential, CredentialStore};
use crate::core::error::{Error, Result};
use crate::core::models::{LoginResponse, TokenResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

const TOKEN_PATH: &str = "o/token/";
const LOGIN_PATH: &str = "login";
const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// OAuth client for the token endpoints. Uses its own plain `reqwest::Client`
/// so refresh traffic never re-enters the 401 retry path.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    store: CredentialStore,
}

impl AuthClient {
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        store: CredentialStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            store,
        }
    }

    /// Client-credentials grant. Persists the credential on success.
    pub async fn authorize(&self) -> Result<Credential> {
        let credential = self.request_client_credentials().await?;
        self.store.save(&credential).await?;
        tracing::info!("Authorized via client credentials");
        Ok(credential)
    }

    /// Email/password login flow. Persists the credential on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential> {
        let url = format!("{}/{}", self.base_url, LOGIN_PATH);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let login: LoginResponse = Self::decode(response).await?;
        let credential = Credential::from_login(&login);
        self.store.save(&credential).await?;
        tracing::info!("Authorized via login");
        Ok(credential)
    }

    async fn request_client_credentials(&self) -> Result<Credential> {
        let url = format!("{}/{}", self.base_url, TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", GRANT_CLIENT_CREDENTIALS),
                ("client_id", self.consumer_key.as_str()),
                ("client_secret", self.consumer_secret.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::decode(response).await?;
        Ok(Credential::from_token(&token))
    }

    async fn request_refresh_grant(&self, refresh_token: &str) -> Result<Credential> {
        let url = format!("{}/{}", self.base_url, TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", GRANT_REFRESH_TOKEN),
                ("refresh_token", refresh_token),
                ("client_id", self.consumer_key.as_str()),
                ("client_secret", self.consumer_secret.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::decode(response).await?;
        let mut credential = Credential::from_token(&token);
        // The token endpoint may omit the refresh token on rotation-free
        // servers; keep the one we already hold.
        if credential.refresh_token.is_none() {
            credential.refresh_token = Some(refresh_token.to_string());
        }
        Ok(credential)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenRefresher for AuthClient {
    /// Refresh-token grant when a refresh token is stored, client-credentials
    /// grant otherwise. Persistence is the gate's job.
    async fn refresh(&self) -> Result<Credential> {
        let refresh_token = self.store.current().await.and_then(|c| c.refresh_token);
        match refresh_token {
            Some(token) => self.request_refresh_grant(&token).await,
            None => self.request_client_credentials().await,
        }
    }
}
