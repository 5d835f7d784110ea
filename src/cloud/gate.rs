use crate::core::credentials::{Credential, CredentialStore};
use crate::core::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<Credential>;
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Refreshed(Credential),
    Failed(String),
}

/// Single-flight credential refresh. When several in-flight requests hit a
/// 401 in the same window, the first caller starts the refresh and every
/// concurrent caller shares its outcome. One refresh call per window.
///
/// The refresh itself runs on a detached task. Callers only await the
/// broadcast, so dropping a caller's future mid-refresh (a cancelled poll
/// loop, a `tokio::time::timeout`) cannot leave the in-flight slot stuck.
pub struct RefreshGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    refresher: Arc<dyn TokenRefresher>,
    store: CredentialStore,
    inflight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
}

impl RefreshGate {
    pub fn new(refresher: Arc<dyn TokenRefresher>, store: CredentialStore) -> Self {
        Self {
            inner: Arc::new(GateInner {
                refresher,
                store,
                inflight: Mutex::new(None),
            }),
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let mut receiver = {
            let mut inflight = self.inner.inflight.lock().await;
            match inflight.as_ref() {
                Some(sender) => sender.subscribe(),
                None => {
                    let (sender, receiver) = broadcast::channel(1);
                    *inflight = Some(sender.clone());

                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        tracing::info!("Refreshing credential");
                        let outcome = inner.run_refresh().await;

                        // Clear the in-flight slot first so a later 401
                        // starts a new refresh; waiters already subscribed
                        // still get this outcome.
                        {
                            let mut inflight = inner.inflight.lock().await;
                            *inflight = None;
                        }
                        let _ = sender.send(outcome);
                    });
                    receiver
                }
            }
        };

        receiver
            .recv()
            .await
            .unwrap_or_else(|_| RefreshOutcome::Failed("refresh aborted".to_string()))
    }
}

impl GateInner {
    async fn run_refresh(&self) -> RefreshOutcome {
        match self.refresher.refresh().await {
            Ok(credential) => {
                // Persist before anyone is released so retried requests
                // observe the new credential.
                match self.store.save(&credential).await {
                    Ok(()) => RefreshOutcome::Refreshed(credential),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to persist refreshed credential");
                        RefreshOutcome::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh failed");
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRefresher {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self) -> Result<Credential> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Hold the refresh open long enough for every waiter to pile up.
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                return Err(Error::RefreshFailed("server said no".to_string()));
            }
            Ok(Credential {
                access_token: format!("token-{n}"),
                refresh_token: None,
                expires_at: None,
            })
        }
    }

    fn gate_with(
        refresher: Arc<CountingRefresher>,
    ) -> (Arc<RefreshGate>, CredentialStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        let gate = Arc::new(RefreshGate::new(refresher, store.clone()));
        (gate, store, dir)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let (gate, _store, _dir) = gate_with(refresher.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.refresh().await }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                RefreshOutcome::Refreshed(credential) => tokens.push(credential.access_token),
                RefreshOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
            }
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(tokens.iter().all(|t| t == "token-1"));
    }

    #[tokio::test]
    async fn test_failure_released_to_all_waiters() {
        let refresher = Arc::new(CountingRefresher::new(true));
        let (gate, _store, _dir) = gate_with(refresher.clone());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.refresh().await }));
        }

        for handle in handles {
            assert!(matches!(handle.await.unwrap(), RefreshOutcome::Failed(_)));
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gate_returns_to_idle_after_completion() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let (gate, _store, _dir) = gate_with(refresher.clone());

        gate.refresh().await;
        gate.refresh().await;

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_wedge_the_gate() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let (gate, store, _dir) = gate_with(refresher.clone());

        // First caller starts the refresh, then its future is dropped
        // mid-flight, the way a cancelled poll loop or a timeout drops it.
        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();
        assert!(first.await.is_err());

        // The refresh must still run to completion and release later
        // callers; this one joins the in-flight window.
        let outcome = tokio::time::timeout(Duration::from_millis(500), gate.refresh())
            .await
            .unwrap();
        match outcome {
            RefreshOutcome::Refreshed(credential) => {
                assert_eq!(credential.access_token, "token-1");
            }
            RefreshOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.current().await.map(|c| c.access_token), Some("token-1".to_string()));
    }

    #[tokio::test]
    async fn test_credential_persisted_before_release() {
        let refresher = Arc::new(CountingRefresher::new(false));
        let (gate, store, _dir) = gate_with(refresher);

        match gate.refresh().await {
            RefreshOutcome::Refreshed(credential) => {
                assert_eq!(store.current().await, Some(credential));
            }
            RefreshOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        }
    }
}
