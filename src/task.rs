use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier assigned by the server at submission time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Scan,
    Fix,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Scan => "scan",
            TaskKind::Fix => "fix",
        }
    }

    /// Capitalised name used at the start of status messages
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Scan => "Scan",
            TaskKind::Fix => "Fix",
        }
    }

    /// Present participle used while the task is in flight
    pub fn activity(&self) -> &'static str {
        match self {
            TaskKind::Scan => "Scanning",
            TaskKind::Fix => "Fixing",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::Running => 1,
            TaskStatus::Cancelling => 2,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => 3,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    /// Terminal states only accept themselves.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Cancelling => "cancelling",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status report as returned by a poll
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub progress: u8,
    pub processed_count: u64,
    pub total_count: Option<u64>,
    pub current_item: Option<String>,
    pub error: Option<String>,
    /// Raw `result` payload, classified later by the reconciler
    pub result: Option<serde_json::Value>,
}

impl TaskSnapshot {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            progress: 0,
            processed_count: 0,
            total_count: None,
            current_item: None,
            error: None,
            result: None,
        }
    }
}

/// The single in-flight job tracked by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: u8,
    pub processed_count: u64,
    pub total_count: Option<u64>,
    pub current_item: Option<String>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            status: TaskStatus::Queued,
            progress: 0,
            processed_count: 0,
            total_count: None,
            current_item: None,
            error: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Fold a poll snapshot into this task. A status that would move the
    /// lifecycle backwards is ignored; counters are always taken as reported.
    pub fn apply(&mut self, snapshot: &TaskSnapshot) {
        if self.status.can_advance_to(snapshot.status) {
            self.status = snapshot.status;
        } else {
            tracing::warn!(
                "Task {}: ignoring status regression {} -> {}",
                self.id,
                self.status,
                snapshot.status
            );
        }

        self.progress = snapshot.progress.min(100);
        self.processed_count = snapshot.processed_count;
        self.total_count = snapshot.total_count;
        self.current_item = snapshot.current_item.clone();
        self.error = if self.status == TaskStatus::Failed {
            snapshot.error.clone()
        } else {
            None
        };
    }

    /// `"<p>% (<done>/<total>)"`, as shown next to the progress bar
    pub fn progress_text(&self) -> String {
        format!(
            "{}% ({}/{})",
            self.progress,
            self.processed_count,
            self.total_count.unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: TaskStatus) -> TaskSnapshot {
        TaskSnapshot::new(status)
    }

    #[test]
    fn test_forward_path() {
        assert!(TaskStatus::Queued.can_advance_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_advance_to(TaskStatus::Cancelling));
        assert!(TaskStatus::Cancelling.can_advance_to(TaskStatus::Cancelled));
        assert!(TaskStatus::Queued.can_advance_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_advance_to(TaskStatus::Running));
    }

    #[test]
    fn test_no_resurrection_or_regression() {
        assert!(!TaskStatus::Completed.can_advance_to(TaskStatus::Running));
        assert!(!TaskStatus::Cancelled.can_advance_to(TaskStatus::Failed));
        assert!(!TaskStatus::Cancelling.can_advance_to(TaskStatus::Running));
        assert!(!TaskStatus::Running.can_advance_to(TaskStatus::Queued));
    }

    #[test]
    fn test_apply_updates_counters() {
        let mut task = Task::new(TaskId::new("scan_1"), TaskKind::Scan);
        let mut snap = snapshot(TaskStatus::Running);
        snap.progress = 10;
        snap.processed_count = 1;
        snap.total_count = Some(10);
        snap.current_item = Some("a.mkv".to_string());
        task.apply(&snap);

        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.progress_text(), "10% (1/10)");
        assert_eq!(task.current_item.as_deref(), Some("a.mkv"));
    }

    #[test]
    fn test_apply_ignores_regression() {
        let mut task = Task::new(TaskId::new("scan_1"), TaskKind::Scan);
        task.apply(&snapshot(TaskStatus::Cancelling));
        task.apply(&snapshot(TaskStatus::Running));
        assert_eq!(task.status, TaskStatus::Cancelling);
    }

    #[test]
    fn test_error_only_kept_when_failed() {
        let mut task = Task::new(TaskId::new("fix_1"), TaskKind::Fix);
        let mut snap = snapshot(TaskStatus::Running);
        snap.error = Some("spurious".to_string());
        task.apply(&snap);
        assert_eq!(task.error, None);

        let mut snap = snapshot(TaskStatus::Failed);
        snap.error = Some("ffprobe missing".to_string());
        task.apply(&snap);
        assert_eq!(task.error.as_deref(), Some("ffprobe missing"));
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let status: TaskStatus = serde_json::from_str("\"cancelling\"").unwrap();
        assert_eq!(status, TaskStatus::Cancelling);
        assert_eq!(serde_json::to_string(&TaskKind::Fix).unwrap(), "\"fix\"");
    }
}
