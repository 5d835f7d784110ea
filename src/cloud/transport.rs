use crate::cloud::gate::{RefreshGate, RefreshOutcome};
use crate::core::credentials::CredentialStore;
use crate::core::error::{Error, Result};
use reqwest::StatusCode;
use std::sync::Arc;

/// Authenticated HTTP layer. Every request goes out with the current
/// credential attached; a 401 routes through the refresh gate and is retried
/// exactly once with the refreshed credential. Non-401 failures bypass the
/// gate entirely.
///
/// `execute` takes a builder closure rather than a built request because
/// retried requests must be rebuilt (multipart bodies cannot be cloned).
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    store: CredentialStore,
    gate: Arc<RefreshGate>,
}

impl Transport {
    pub fn new(store: CredentialStore, gate: Arc<RefreshGate>) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            gate,
        }
    }

    pub async fn execute<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let response = self.send_authorized(&build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Request rejected with 401, entering refresh gate");
        match self.gate.refresh().await {
            RefreshOutcome::Refreshed(_) => {
                let retried = self.send_authorized(&build).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    return Err(Error::Unauthorized);
                }
                Ok(retried)
            }
            RefreshOutcome::Failed(reason) => Err(Error::RefreshFailed(reason)),
        }
    }

    async fn send_authorized<F>(&self, build: &F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut request = build(&self.http);
        if let Some(credential) = self.store.current().await {
            request = request.bearer_auth(&credential.access_token);
        }
        Ok(request.send().await?)
    }
}
