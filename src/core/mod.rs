pub mod credentials;
pub mod error;
pub mod image;
pub mod models;
pub mod settings;

pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use image::ImagePayload;
pub use models::{
    LoginResponse, ModelInfo, ModelPage, TaskCreated, TaskResult, TaskStatus, TokenResponse,
};
pub use settings::Settings;
