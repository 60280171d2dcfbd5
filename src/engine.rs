//! Task lifecycle engine.
//!
//! One `Engine` owns the active-task slot, the poll loop and the held
//! result set. It is driven from a single async task: commands and poll
//! outcomes are handled one at a time, so none of its state needs locking.
//! The only suspension points are the transport calls, and every response
//! is checked against the currently active task id before it is applied.

use crate::api::types::{FixOptions, FixRequest, JobRequest, ScanRequest};
use crate::api::Transport;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::messages::{Command, EngineEvent};
use crate::projector::{self, ControlVector};
use crate::results::{ResultReconciler, ResultSet, Summary};
use crate::scheduler::{PollOutcome, PollScheduler};
use crate::session::{SessionRecord, TaskStateStore};
use crate::task::{Task, TaskId, TaskKind, TaskSnapshot, TaskStatus};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Engine {
    transport: Arc<dyn Transport>,
    store: TaskStateStore,
    scheduler: PollScheduler,
    reconciler: ResultReconciler,
    outcomes: mpsc::UnboundedReceiver<PollOutcome>,
    events: mpsc::UnboundedSender<EngineEvent>,
    /// Kind of the task that produced the held results
    results_kind: Option<TaskKind>,
    /// Stop requested locally, not yet confirmed by a `cancelling` status
    cancel_pending: bool,
    editing: bool,
    /// A submission is waiting on the server
    submitting: bool,
    /// Highest poll tick applied for the current task
    last_seq: Option<u64>,
    status_message: String,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        transport: Arc<dyn Transport>,
        store: TaskStateStore,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let scheduler =
            PollScheduler::new(config.poll_interval, Arc::clone(&transport), outcome_tx);

        Self {
            transport,
            store,
            scheduler,
            reconciler: ResultReconciler::new(),
            outcomes,
            events,
            results_kind: None,
            cancel_pending: false,
            editing: false,
            submitting: false,
            last_seq: None,
            status_message: String::new(),
        }
    }

    pub fn current(&self) -> Option<&Task> {
        self.store.current()
    }

    pub fn results(&self) -> &ResultSet {
        self.reconciler.current()
    }

    pub fn results_kind(&self) -> Option<TaskKind> {
        self.results_kind
    }

    /// `None` until the current task has delivered a result payload
    pub fn summary(&self) -> Option<Summary> {
        if !self.reconciler.has_received() {
            return None;
        }
        self.results_kind
            .map(|kind| self.reconciler.current().summarize(kind))
    }

    pub fn controls(&self) -> ControlVector {
        projector::project(
            self.store.current().map(|task| task.status),
            self.reconciler.current(),
            self.results_kind,
            self.editing || self.submitting,
        )
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_polling()
    }

    pub fn cancel_pending(&self) -> bool {
        self.cancel_pending
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
        self.emit_controls();
    }

    pub async fn submit_scan(&mut self, directory: &str, profile_name: &str) -> Result<TaskId> {
        let profile_name = profile_name.trim();
        if profile_name.is_empty() {
            return Err(self.reject("No profile selected."));
        }

        self.submit(JobRequest::Scan(ScanRequest {
            directory: directory.to_string(),
            profile_name: profile_name.to_string(),
        }))
        .await
    }

    /// Submit every incompatible, cleanly probed row of the held scan
    /// results for remediation.
    pub async fn submit_fix(&mut self, options: FixOptions) -> Result<TaskId> {
        if let Err(e) = options.validate() {
            self.set_status(format!("Error: {}", e));
            return Err(e);
        }

        let files_to_fix = self.reconciler.current().remediation_candidates();
        if files_to_fix.is_empty() {
            return Err(self.reject("No files marked 'Needs Attention'."));
        }

        tracing::info!("Requesting fix for {} files", files_to_fix.len());
        self.submit(JobRequest::Fix(FixRequest {
            files_to_fix,
            fix_options: options,
        }))
        .await
    }

    async fn submit(&mut self, job: JobRequest) -> Result<TaskId> {
        let kind = job.kind();
        self.supersede();
        self.results_kind = Some(kind);
        self.emit(EngineEvent::ResultsCleared);
        self.set_status(format!("Requesting {}...", kind));
        self.submitting = true;
        self.emit_controls();

        let submitted = self.transport.submit(&job).await;
        self.submitting = false;
        match submitted {
            Ok(task_id) => {
                self.store.begin(kind, task_id.clone());
                self.scheduler.start(task_id.clone());
                self.set_status(match kind {
                    TaskKind::Scan => "Scan queued. Polling...",
                    TaskKind::Fix => "Fix task queued. Polling...",
                });
                self.emit(EngineEvent::TaskStarted {
                    task_id: task_id.clone(),
                    kind,
                });
                self.emit_controls();
                Ok(task_id)
            }
            Err(e) => {
                tracing::error!("Failed to start {}: {}", kind, e);
                self.results_kind = None;
                self.set_status(format!("Error starting {}: {}", kind, e));
                self.emit_controls();
                Err(e)
            }
        }
    }

    /// Re-attach to a task recorded before a restart
    pub fn resume(&mut self, record: SessionRecord) {
        let SessionRecord { task_id, task_kind } = record;
        self.supersede();
        self.results_kind = Some(task_kind);
        self.store.begin(task_kind, task_id.clone());
        self.scheduler.start(task_id.clone());
        self.set_status(format!(
            "Reconnected to {} task {}. Polling...",
            task_kind, task_id
        ));
        self.emit(EngineEvent::TaskStarted {
            task_id,
            kind: task_kind,
        });
        self.emit_controls();
    }

    /// Resume from the session file, if it names a task
    pub fn recover_session(&mut self) -> Option<TaskId> {
        let record = self.store.recover()?;
        let task_id = record.task_id.clone();
        tracing::info!("Recovered {} task {} from session", record.task_kind, task_id);
        self.resume(record);
        Some(task_id)
    }

    /// Ask the server to stop the active task. Local state is not forced
    /// to a terminal status; polling continues until the server reports one.
    pub async fn request_cancel(&mut self) -> Result<()> {
        let Some(task) = self.store.current() else {
            return Err(self.reject("No active task to stop."));
        };
        let task_id = task.id.clone();
        let kind = task.kind;

        self.cancel_pending = true;
        self.set_status(format!("Requesting stop for {}...", kind));
        self.emit_controls();

        let result = self.transport.request_cancel(&task_id).await;

        if !self.store.is_current(&task_id) {
            tracing::debug!("Discarding cancel response for stale task {}", task_id);
            return Ok(());
        }

        match result {
            Ok(ack) => {
                tracing::info!("Cancellation acknowledged for task {}: {}", task_id, ack);
                self.set_status("Cancellation requested. Waiting for task to stop...");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Cancel request for task {} failed: {}", task_id, e);
                self.cancel_pending = false;
                self.set_status(format!("Error stopping task: {}", e));
                self.emit_controls();
                Err(e)
            }
        }
    }

    /// Apply one poll outcome. Returns false when it was discarded because
    /// it belongs to a task that is no longer active or is older than one
    /// already applied.
    pub fn handle_poll(&mut self, outcome: PollOutcome) -> bool {
        if !self.store.is_current(&outcome.task_id) {
            tracing::debug!("Discarding stale poll response for task {}", outcome.task_id);
            return false;
        }
        if self.last_seq.is_some_and(|last| outcome.seq <= last) {
            tracing::debug!(
                "Discarding out-of-order poll response {} for task {}",
                outcome.seq,
                outcome.task_id
            );
            return false;
        }
        self.last_seq = Some(outcome.seq);

        match outcome.result {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(e) => self.stop_on_error(e),
        }
        true
    }

    /// Wait for the next poll outcome
    pub async fn next_outcome(&mut self) -> Option<PollOutcome> {
        self.outcomes.recv().await
    }

    pub async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SubmitScan {
                directory,
                profile_name,
            } => self.submit_scan(&directory, &profile_name).await.map(|_| ()),
            Command::SubmitFix(options) => self.submit_fix(options).await.map(|_| ()),
            Command::Cancel => self.request_cancel().await,
            Command::SetEditing(editing) => {
                self.set_editing(editing);
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    /// Serve commands and poll outcomes until `Quit` or the command
    /// channel closes. The session file is left in place so a later run
    /// can resume the task.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::info!("Engine started");
        self.emit_controls();

        loop {
            tokio::select! {
                Some(outcome) = self.outcomes.recv() => {
                    self.handle_poll(outcome);
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if matches!(command, Command::Quit) {
                        break;
                    }
                    if let Err(e) = self.execute(command).await {
                        tracing::warn!("Command failed: {}", e);
                    }
                }
            }
        }

        self.scheduler.stop();
        tracing::info!("Engine stopped");
    }

    fn apply_snapshot(&mut self, snapshot: TaskSnapshot) {
        let Some(task) = self.store.current_mut() else {
            return;
        };
        task.apply(&snapshot);
        let task = task.clone();

        if task.status == TaskStatus::Cancelling {
            self.cancel_pending = false;
        }

        if self.reconciler.reconcile(snapshot.result.as_ref(), task.kind) {
            let results = self.reconciler.current().clone();
            let summary = results.summarize(task.kind);
            self.emit(EngineEvent::ResultsChanged {
                kind: task.kind,
                results,
                summary,
            });
        }

        if task.status.is_terminal() {
            self.finish(&task);
        } else {
            let text = active_status_text(&task, self.cancel_pending);
            self.set_status(text);
            self.emit(EngineEvent::Progress {
                kind: task.kind,
                status: task.status,
                progress: task.progress,
                processed: task.processed_count,
                total: task.total_count,
                current_item: task.current_item.clone(),
            });
        }
        self.emit_controls();
    }

    fn finish(&mut self, task: &Task) {
        self.scheduler.stop();
        self.store.clear();
        self.cancel_pending = false;

        tracing::info!(
            "{} task {} finished with status {}",
            task.kind.label(),
            task.id,
            task.status
        );
        let text = terminal_status_text(task, self.reconciler.current());
        self.set_status(text);
        self.emit(EngineEvent::Finished {
            kind: task.kind,
            status: task.status,
        });
    }

    fn stop_on_error(&mut self, error: EngineError) {
        tracing::error!("Polling failed: {}", error);
        self.scheduler.stop();
        self.store.clear();
        self.cancel_pending = false;

        self.set_status(format!("Polling error: {}. Stopping polling.", error));
        self.emit(EngineEvent::PollingStopped {
            error: error.to_string(),
        });
        self.emit_controls();
    }

    /// Drop local tracking of whatever was active. The server-side job is
    /// left alone.
    fn supersede(&mut self) {
        self.scheduler.stop();
        if let Some(previous) = self.store.clear() {
            tracing::info!(
                "Dropping local tracking of {} task {} ({})",
                previous.kind,
                previous.id,
                previous.status
            );
        }
        self.reconciler.reset();
        self.cancel_pending = false;
        self.last_seq = None;
        self.results_kind = None;
    }

    fn reject(&mut self, msg: &str) -> EngineError {
        let error = EngineError::Rejected(msg.to_string());
        self.set_status(msg);
        error
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if msg != self.status_message {
            tracing::debug!("Status: {}", msg);
        }
        self.status_message = msg.clone();
        self.emit(EngineEvent::Status(msg));
    }

    fn emit_controls(&self) {
        self.emit(EngineEvent::Controls(self.controls()));
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

fn active_status_text(task: &Task, cancel_pending: bool) -> String {
    let activity = task.kind.activity();
    match task.status {
        _ if cancel_pending && task.status != TaskStatus::Cancelling => {
            "Cancellation requested. Waiting for task to stop...".to_string()
        }
        TaskStatus::Queued => format!("Status: {} queued...", activity),
        TaskStatus::Running if task.total_count.is_some() => {
            let detail = match &task.current_item {
                Some(item) => item.clone(),
                None if task.processed_count == 0 => "Initializing...".to_string(),
                None => task.progress_text(),
            };
            format!("{}...\n{}", activity, detail)
        }
        TaskStatus::Cancelling => format!("Status: cancelling {}...", activity),
        status => format!("Status: {}", status),
    }
}

fn terminal_status_text(task: &Task, results: &ResultSet) -> String {
    let label = task.kind.label();
    match task.status {
        TaskStatus::Cancelled => {
            let mut text = format!("{} cancelled.", label);
            if results.has_file_rows() {
                text.push_str(" Displaying partial results.");
            }
            text
        }
        TaskStatus::Failed => format!(
            "{} failed: {}",
            label,
            task.error.as_deref().unwrap_or("Unknown reason")
        ),
        TaskStatus::Completed => match task.kind {
            TaskKind::Fix => "Fix task completed.".to_string(),
            TaskKind::Scan => match results.message() {
                Some(msg) => format!("Scan completed. {}", msg),
                None => format!("Scan completed. Processed {} files.", results.row_count()),
            },
        },
        status => format!("Status: {}", status),
    }
}
