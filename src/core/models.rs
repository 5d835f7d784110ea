use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Processing,
    Finished,
    Failed,
    TimedOut,
    Unknown(String),
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Finished)
    }

    /// "failed" and "timed out" are both terminal failures, not distinguished.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::TimedOut)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
            TaskStatus::TimedOut => "timed out",
            TaskStatus::Unknown(other) => other,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TaskStatus::Pending,
            "processing" => TaskStatus::Processing,
            "finished" => TaskStatus::Finished,
            "failed" => TaskStatus::Failed,
            "timed out" => TaskStatus::TimedOut,
            _ => TaskStatus::Unknown(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: i64,
    pub short_model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPage {
    pub items: Vec<ModelInfo>,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    #[serde(default)]
    pub visualization_status: Option<TaskStatus>,
    #[serde(default)]
    pub visualization: Option<String>,
    #[serde(default)]
    pub visualization_type: Option<String>,
}

impl TaskResult {
    pub fn computed(&self) -> bool {
        self.status.is_success()
    }

    pub fn failed(&self) -> bool {
        self.status.is_failure()
    }

    pub fn visualization_computed(&self) -> bool {
        self.visualization_status
            .as_ref()
            .is_some_and(|s| s.is_success())
    }

    pub fn visualization_failed(&self) -> bool {
        self.visualization_status
            .as_ref()
            .is_some_and(|s| s.is_failure())
    }

    /// When visualization is required, both the primary status and the
    /// visualization status must reach "finished".
    pub fn is_complete(&self, needs_visualization: bool) -> bool {
        if needs_visualization {
            self.computed() && self.visualization_computed()
        } else {
            self.computed()
        }
    }

    pub fn is_failed(&self, needs_visualization: bool) -> bool {
        self.failed() || (needs_visualization && self.visualization_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: &str, visualization_status: Option<&str>) -> TaskResult {
        TaskResult {
            status: TaskStatus::from(status.to_string()),
            visualization_status: visualization_status
                .map(|s| TaskStatus::from(s.to_string())),
            visualization: None,
            visualization_type: None,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(TaskStatus::from("pending".to_string()), TaskStatus::Pending);
        assert_eq!(
            TaskStatus::from("timed out".to_string()),
            TaskStatus::TimedOut
        );
        assert_eq!(
            TaskStatus::from("queued".to_string()),
            TaskStatus::Unknown("queued".to_string())
        );
    }

    #[test]
    fn test_status_roundtrip() {
        for raw in ["pending", "processing", "finished", "failed", "timed out"] {
            let status = TaskStatus::from(raw.to_string());
            assert_eq!(String::from(status), raw);
        }
    }

    #[test]
    fn test_failed_and_timed_out_are_both_failures() {
        assert!(TaskStatus::Failed.is_failure());
        assert!(TaskStatus::TimedOut.is_failure());
        assert!(!TaskStatus::Processing.is_failure());
    }

    #[test]
    fn test_complete_without_visualization() {
        assert!(result("finished", None).is_complete(false));
        assert!(!result("processing", None).is_complete(false));
    }

    #[test]
    fn test_complete_requires_both_statuses_when_visualizing() {
        assert!(result("finished", Some("finished")).is_complete(true));
        assert!(!result("finished", Some("pending")).is_complete(true));
        assert!(!result("pending", Some("finished")).is_complete(true));
        assert!(!result("finished", None).is_complete(true));
    }

    #[test]
    fn test_failed_visualization_fails_task_only_when_required() {
        let r = result("finished", Some("timed out"));
        assert!(r.is_failed(true));
        assert!(!r.is_failed(false));
    }

    #[test]
    fn test_task_result_deserializes_partial_response() {
        let r: TaskResult = serde_json::from_str(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(r.status, TaskStatus::Processing);
        assert!(r.visualization_status.is_none());
        assert!(r.visualization.is_none());
    }

    #[test]
    fn test_task_result_deserializes_full_response() {
        let json = r#"{
            "status": "finished",
            "visualization_status": "finished",
            "visualization": "https://api.modelplace.ai/v3/results/42.png",
            "visualization_type": "image"
        }"#;
        let r: TaskResult = serde_json::from_str(json).unwrap();
        assert!(r.is_complete(true));
        assert_eq!(
            r.visualization.as_deref(),
            Some("https://api.modelplace.ai/v3/results/42.png")
        );
    }
}
