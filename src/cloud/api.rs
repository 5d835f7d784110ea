use crate::cloud::auth::AuthClient;
use crate::cloud::gate::RefreshGate;
use crate::cloud::poller::{StatusSource, TaskPoller};
use crate::cloud::transport::Transport;
use crate::core::credentials::CredentialStore;
use crate::core::error::{Error, Result};
use crate::core::image::ImagePayload;
use crate::core::models::{ModelPage, TaskCreated, TaskResult};
use crate::core::settings::Settings;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const MODELS_PAGE_SIZE: &str = "1000";
const MODELS_SORT_KEY: &str = "id";

/// Typed surface over the Modelplace REST API. Cheap to clone; every clone
/// shares the same transport, credential store and refresh gate.
#[derive(Clone)]
pub struct CloudClient {
    transport: Transport,
    base_url: String,
    poll_interval: Duration,
}

impl CloudClient {
    pub fn new(base_url: impl Into<String>, transport: Transport) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: crate::cloud::poller::POLL_INTERVAL,
        }
    }

    /// Assembles store, auth, gate and transport from settings, authorizing
    /// with the client-credentials grant when no live credential is stored.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let (key, secret) = settings.auth.credentials().ok_or_else(|| {
            Error::Config("auth.consumer_key and auth.consumer_secret must be set".to_string())
        })?;
        Self::assemble(settings, key, secret, None).await
    }

    /// Like `connect`, but authorizes with the email/password flow when no
    /// live credential is stored.
    pub async fn connect_with_login(
        settings: &Settings,
        email: &str,
        password: &str,
    ) -> Result<Self> {
        let login = (email.to_string(), password.to_string());
        let (key, secret) = settings.auth.credentials().unwrap_or_default();
        Self::assemble(settings, key, secret, Some(login)).await
    }

    async fn assemble(
        settings: &Settings,
        consumer_key: String,
        consumer_secret: String,
        login: Option<(String, String)>,
    ) -> Result<Self> {
        let store = CredentialStore::open_default()?;
        store.load().await?;

        let base_url = settings.api.base_url.trim_end_matches('/').to_string();
        let auth = Arc::new(AuthClient::new(
            base_url.clone(),
            consumer_key,
            consumer_secret,
            store.clone(),
        ));

        if !store.is_authorized().await {
            match &login {
                Some((email, password)) => {
                    auth.login(email, password).await?;
                }
                None => {
                    auth.authorize().await?;
                }
            }
        }

        let gate = Arc::new(RefreshGate::new(auth, store.clone()));
        Ok(Self {
            transport: Transport::new(store, gate),
            base_url,
            poll_interval: settings.polling.interval(),
        })
    }

    pub async fn models(&self) -> Result<ModelPage> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .transport
            .execute(|http| {
                http.get(&url)
                    .query(&[("page_size", MODELS_PAGE_SIZE), ("sort_key", MODELS_SORT_KEY)])
            })
            .await?;
        Self::decode(response).await
    }

    /// Uploads the image and creates a computation task for the model.
    pub async fn submit(&self, model_id: i64, image: &ImagePayload) -> Result<TaskCreated> {
        let url = format!("{}/process", self.base_url);
        let model_id = model_id.to_string();

        let submitted = self
            .transport
            .execute(|http| {
                let part = match reqwest::multipart::Part::bytes(image.data.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(&image.mime_type)
                {
                    Ok(part) => part,
                    Err(_) => reqwest::multipart::Part::bytes(image.data.clone())
                        .file_name(image.file_name.clone()),
                };
                let form = reqwest::multipart::Form::new().part("upload_data", part);
                http.post(&url)
                    .query(&[("model_id", model_id.as_str())])
                    .multipart(form)
            })
            .await;

        match submitted {
            Ok(response) => Self::decode(response).await.map_err(as_sending_error),
            Err(e) => Err(as_sending_error(e)),
        }
    }

    pub async fn task_result(&self, task_id: &str, visualize: bool) -> Result<TaskResult> {
        let url = format!("{}/task", self.base_url);
        let visualize = visualize.to_string();
        let response = self
            .transport
            .execute(|http| {
                http.get(&url)
                    .query(&[("task_id", task_id), ("visualize", visualize.as_str())])
            })
            .await?;
        Self::decode(response).await
    }

    /// Poller wired to this client, using the configured poll interval.
    pub fn poller(&self) -> TaskPoller {
        TaskPoller::with_interval(Arc::new(self.clone()), self.poll_interval)
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

/// Submission failures get their own error kind; auth-flow errors keep theirs.
fn as_sending_error(e: Error) -> Error {
    match e {
        e @ (Error::Unauthorized | Error::RefreshFailed(_)) => e,
        other => Error::SendingFailed(other.to_string()),
    }
}

#[async_trait]
impl StatusSource for CloudClient {
    async fn fetch_status(&self, task_id: &str, visualize: bool) -> Result<TaskResult> {
        self.task_result(task_id, visualize).await
    }
}
