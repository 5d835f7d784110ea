use crate::core::error::{Error, Result};
use crate::core::models::{TaskResult, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Fixed delay between status queries. Deliberately not backed off or
/// jittered, matching the service's recommended request frequency.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, task_id: &str, visualize: bool) -> Result<TaskResult>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub status: TaskStatus,
    /// Always 0 while polling; the remote API reports no granular progress.
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    Computing,
    StatusRetrieval(String),
    Cancelled,
}

impl From<TaskFailure> for Error {
    fn from(failure: TaskFailure) -> Self {
        match failure {
            TaskFailure::Computing => Error::ComputingFailed,
            TaskFailure::StatusRetrieval(reason) => Error::StatusRetrievalFailed(reason),
            TaskFailure::Cancelled => Error::Cancelled,
        }
    }
}

type TaskOutcome = std::result::Result<TaskResult, TaskFailure>;

/// Handle onto a running poll loop. Cloning attaches to the same loop; the
/// completion outcome is delivered to every clone exactly once.
#[derive(Clone)]
pub struct Subscription {
    task_id: String,
    progress: watch::Receiver<TaskProgress>,
    outcome: watch::Receiver<Option<TaskOutcome>>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Receiver that observes the status reported by every poll cycle.
    pub fn progress(&self) -> watch::Receiver<TaskProgress> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Marks the subscription finished; the loop stops before its next
    /// status query and `wait` resolves with a cancellation error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(&mut self) -> Result<TaskResult> {
        let outcome = {
            let observed = self
                .outcome
                .wait_for(|o| o.is_some())
                .await
                .map_err(|_| Error::Cancelled)?;
            observed.clone()
        };
        match outcome {
            Some(Ok(result)) => Ok(result),
            Some(Err(failure)) => Err(failure.into()),
            None => Err(Error::Cancelled),
        }
    }
}

/// Registry of active poll loops, at most one per task id. Replaces the
/// ambient per-class loader dictionary with state owned by the component
/// that issues the polls.
#[derive(Clone)]
pub struct TaskPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    active: Mutex<HashMap<String, Subscription>>,
}

impl TaskPoller {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self::with_interval(source, POLL_INTERVAL)
    }

    pub fn with_interval(source: Arc<dyn StatusSource>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                source,
                interval,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Starts polling the task, or attaches to the poll loop already running
    /// for this task id. Never two concurrent loops for the same id.
    pub async fn watch(&self, task_id: &str, needs_visualization: bool) -> Subscription {
        let mut active = self.inner.active.lock().await;
        if let Some(existing) = active.get(task_id) {
            if !existing.is_finished() {
                tracing::debug!(task_id, "Attaching to existing poll");
                return existing.clone();
            }
        }

        let (progress_tx, progress_rx) = watch::channel(TaskProgress {
            status: TaskStatus::Pending,
            value: 0.0,
        });
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let subscription = Subscription {
            task_id: task_id.to_string(),
            progress: progress_rx,
            outcome: outcome_rx,
            cancel: cancel.clone(),
        };
        active.insert(task_id.to_string(), subscription.clone());
        drop(active);

        let inner = Arc::clone(&self.inner);
        let id = task_id.to_string();
        let own_outcome = subscription.outcome.clone();
        tokio::spawn(async move {
            let outcome =
                poll_loop(&inner, &id, needs_visualization, &progress_tx, &cancel).await;
            // Publish the outcome exactly once, then retire the loop so no
            // further progress or completion event can fire.
            let _ = outcome_tx.send(Some(outcome));

            // Only drop the registry entry if it is still ours; a new poll
            // for the same id may have replaced it already.
            let mut active = inner.active.lock().await;
            if let Some(current) = active.get(&id) {
                if current.outcome.same_channel(&own_outcome) {
                    active.remove(&id);
                }
            }
        });

        subscription
    }
}

async fn poll_loop(
    inner: &PollerInner,
    task_id: &str,
    needs_visualization: bool,
    progress: &watch::Sender<TaskProgress>,
    cancel: &CancellationToken,
) -> TaskOutcome {
    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
            fetched = inner.source.fetch_status(task_id, needs_visualization) => fetched,
        };

        let result = match fetched {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Status retrieval failed");
                return Err(TaskFailure::StatusRetrieval(e.to_string()));
            }
        };

        let _ = progress.send(TaskProgress {
            status: result.status.clone(),
            value: 0.0,
        });

        if result.is_complete(needs_visualization) {
            tracing::info!(task_id, "Task finished");
            return Ok(result);
        }
        if result.is_failed(needs_visualization) {
            tracing::info!(task_id, status = %result.status, "Task failed on the server");
            return Err(TaskFailure::Computing);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
            _ = tokio::time::sleep(inner.interval) => {}
        }
    }
}
