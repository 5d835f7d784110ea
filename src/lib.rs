pub mod cloud;
pub mod core;

pub use crate::cloud::{
    AuthClient, CloudClient, RefreshGate, RefreshOutcome, StatusSource, Subscription,
    TaskFailure, TaskPoller, TaskProgress, TokenRefresher, Transport, POLL_INTERVAL,
};
pub use crate::core::{
    Credential, CredentialStore, Error, ImagePayload, ModelInfo, ModelPage, Result, Settings,
    TaskCreated, TaskResult, TaskStatus,
};
