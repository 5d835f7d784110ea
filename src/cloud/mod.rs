pub mod api;
pub mod auth;
pub mod gate;
pub mod poller;
pub mod transport;

pub use api::CloudClient;
pub use auth::AuthClient;
pub use gate::{RefreshGate, RefreshOutcome, TokenRefresher};
pub use poller::{
    StatusSource, Subscription, TaskFailure, TaskPoller, TaskProgress, POLL_INTERVAL,
};
pub use transport::Transport;
