use crate::api::types::FixOptions;
use crate::messages::EngineEvent;
use crate::projector::ControlVector;
use crate::results::{ResultFilter, ResultSet, Summary};
use crate::task::{TaskKind, TaskStatus};
use std::collections::VecDeque;

const MAX_LOG_LINES: usize = 100;

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: Status,
    pub status_message: String,
    pub progress: u8,
    pub processed: u64,
    pub total: Option<u64>,
    pub current_item: Option<String>,
    pub results: ResultSet,
    pub results_kind: Option<TaskKind>,
    pub summary: Option<Summary>,
    pub controls: ControlVector,
    pub filter: ResultFilter,
    pub directory: String,
    pub profiles: Vec<String>,
    pub profile_index: usize,
    pub fix_options: FixOptions,
    pub logs: VecDeque<String>,
    pub should_quit: bool,
    pub scroll_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Active(TaskKind, TaskStatus),
    Done(TaskKind, TaskStatus),
    Error(String),
}

impl AppState {
    pub fn new(directory: String, profiles: Vec<String>, fix_options: FixOptions) -> Self {
        Self {
            status: Status::Idle,
            status_message: "Choose a directory and profile, then press 's' to scan.".to_string(),
            progress: 0,
            processed: 0,
            total: None,
            current_item: None,
            results: ResultSet::Empty,
            results_kind: None,
            summary: None,
            controls: ControlVector::default(),
            filter: ResultFilter::All,
            directory,
            profiles,
            profile_index: 0,
            fix_options,
            logs: VecDeque::new(),
            should_quit: false,
            scroll_offset: 0,
        }
    }

    /// Update state based on engine events (Elm Architecture - Update)
    pub fn update(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Status(msg) => {
                self.status_message = msg;
            }
            EngineEvent::TaskStarted { task_id, kind } => {
                self.status = Status::Active(kind, TaskStatus::Queued);
                self.progress = 0;
                self.processed = 0;
                self.total = None;
                self.current_item = None;
                self.add_log(format!("[→] {} task {} queued", kind.label(), task_id));
            }
            EngineEvent::Progress {
                kind,
                status,
                progress,
                processed,
                total,
                current_item,
            } => {
                self.status = Status::Active(kind, status);
                self.progress = progress;
                self.processed = processed;
                self.total = total;
                self.current_item = current_item;
            }
            EngineEvent::ResultsCleared => {
                self.results = ResultSet::Empty;
                self.results_kind = None;
                self.summary = None;
                self.filter = ResultFilter::All;
                self.scroll_offset = 0;
            }
            EngineEvent::ResultsChanged {
                kind,
                results,
                summary,
            } => {
                self.results = results;
                self.results_kind = Some(kind);
                self.summary = Some(summary);
                self.clamp_scroll();
            }
            EngineEvent::Controls(controls) => {
                self.controls = controls;
            }
            EngineEvent::Finished { kind, status } => {
                self.status = Status::Done(kind, status);
                self.current_item = None;
                let symbol = match status {
                    TaskStatus::Completed => "[✓]",
                    TaskStatus::Cancelled => "[○]",
                    _ => "[✗]",
                };
                self.add_log(format!("{} {}", symbol, self.status_message));
            }
            EngineEvent::PollingStopped { error } => {
                self.current_item = None;
                self.add_log(format!("[!] Polling stopped: {}", error));
                self.status = Status::Error(error);
            }
        }
    }

    pub fn add_log(&mut self, msg: String) {
        if self.logs.len() >= MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(msg);
    }

    pub fn selected_profile(&self) -> Option<&str> {
        self.profiles.get(self.profile_index).map(String::as_str)
    }

    pub fn cycle_profile(&mut self) {
        if !self.profiles.is_empty() {
            self.profile_index = (self.profile_index + 1) % self.profiles.len();
        }
    }

    pub fn toggle_filter(&mut self) {
        self.filter = self.filter.toggle();
        self.scroll_offset = 0;
    }

    /// Results as currently filtered for display
    pub fn visible_results(&self) -> ResultSet {
        self.results.filtered(self.filter)
    }

    /// `("All (n)", "Needs Attention (n)")`, or `Failed` for fix results
    pub fn filter_labels(&self) -> (String, String) {
        let attention = if self.results_kind == Some(TaskKind::Fix) {
            "Failed"
        } else {
            "Needs Attention"
        };
        (
            format!("All ({})", self.results.row_count()),
            format!("{} ({})", attention, self.results.needs_attention_count()),
        )
    }

    pub fn progress(&self) -> f64 {
        f64::from(self.progress.min(100)) / 100.0
    }

    pub fn scroll_down(&mut self) {
        let rows = self.visible_results().len();
        if self.scroll_offset + 1 < rows {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// Keep the offset inside the visible rows after they shrink
    fn clamp_scroll(&mut self) {
        let last = self.visible_results().len().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.min(last);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(String::new(), Vec::new(), FixOptions::default())
    }
}
