use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("sending failed: {0}")]
    SendingFailed(String),

    #[error("computation failed on the server")]
    ComputingFailed,

    #[error("status retrieval failed: {0}")]
    StatusRetrievalFailed(String),

    #[error("request not authorized after credential refresh")]
    Unauthorized,

    #[error("credential refresh failed: {0}")]
    RefreshFailed(String),

    #[error("polling was cancelled")]
    Cancelled,

    #[error("no credential available, call authorize or login first")]
    MissingCredential,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
