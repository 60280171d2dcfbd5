use crate::api::types::FixOptions;
use crate::projector::ControlVector;
use crate::results::{ResultSet, Summary};
use crate::task::{TaskId, TaskKind, TaskStatus};

/// Messages sent from Engine to TUI
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Human-readable status line
    Status(String),
    TaskStarted {
        task_id: TaskId,
        kind: TaskKind,
    },
    Progress {
        kind: TaskKind,
        status: TaskStatus,
        progress: u8,
        processed: u64,
        total: Option<u64>,
        current_item: Option<String>,
    },
    /// A new submission discarded the previous results
    ResultsCleared,
    ResultsChanged {
        kind: TaskKind,
        results: ResultSet,
        summary: Summary,
    },
    Controls(ControlVector),
    Finished {
        kind: TaskKind,
        status: TaskStatus,
    },
    /// Polling ended because of a transport failure
    PollingStopped {
        error: String,
    },
}

/// Messages sent from TUI to Engine
#[derive(Debug, Clone)]
pub enum Command {
    SubmitScan {
        directory: String,
        profile_name: String,
    },
    SubmitFix(FixOptions),
    Cancel,
    SetEditing(bool),
    Quit,
}
