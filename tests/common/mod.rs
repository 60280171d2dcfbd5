#![allow(dead_code)]

use async_trait::async_trait;
use playarr::api::types::JobRequest;
use playarr::api::Transport;
use playarr::config::EngineConfig;
use playarr::messages::EngineEvent;
use playarr::session::TaskStateStore;
use playarr::task::{TaskId, TaskSnapshot, TaskStatus};
use playarr::{Engine, EngineError};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const POLL_MS: u64 = 100;

/// Transport fake that replays canned responses and records every call.
///
/// Poll scripts are kept per task id; the last scripted response for an id
/// repeats once the queue is down to one entry.
#[derive(Default)]
pub struct ScriptedTransport {
    submits: Mutex<VecDeque<Result<TaskId, EngineError>>>,
    polls: Mutex<HashMap<TaskId, VecDeque<Result<TaskSnapshot, EngineError>>>>,
    cancel_reply: Mutex<Option<Result<String, EngineError>>>,
    poll_delay: Mutex<Option<Duration>>,
    pub submitted: Mutex<Vec<JobRequest>>,
    pub polled: Mutex<Vec<TaskId>>,
    pub cancelled: Mutex<Vec<TaskId>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_submit(&self, reply: Result<TaskId, EngineError>) {
        self.submits.lock().unwrap().push_back(reply);
    }

    pub fn on_poll(&self, id: &str, reply: Result<TaskSnapshot, EngineError>) {
        self.polls
            .lock()
            .unwrap()
            .entry(TaskId::new(id))
            .or_default()
            .push_back(reply);
    }

    pub fn on_cancel(&self, reply: Result<String, EngineError>) {
        *self.cancel_reply.lock().unwrap() = Some(reply);
    }

    pub fn delay_polls(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = Some(delay);
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn polled_ids(&self) -> Vec<TaskId> {
        self.polled.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit(&self, job: &JobRequest) -> Result<TaskId, EngineError> {
        self.submitted.lock().unwrap().push(job.clone());
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Submission("no scripted reply".to_string())))
    }

    async fn poll(&self, task_id: &TaskId) -> Result<TaskSnapshot, EngineError> {
        self.polled.lock().unwrap().push(task_id.clone());
        let delay = *self.poll_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut polls = self.polls.lock().unwrap();
        let Some(queue) = polls.get_mut(task_id) else {
            return Err(EngineError::NotFound(task_id.clone()));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(EngineError::NotFound(task_id.clone())))
        }
    }

    async fn request_cancel(&self, task_id: &TaskId) -> Result<String, EngineError> {
        self.cancelled.lock().unwrap().push(task_id.clone());
        self.cancel_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("Stop requested".to_string()))
    }
}

pub fn snapshot(status: TaskStatus) -> TaskSnapshot {
    TaskSnapshot::new(status)
}

pub fn running(progress: u8, processed: u64, total: u64) -> TaskSnapshot {
    TaskSnapshot {
        progress,
        processed_count: processed,
        total_count: Some(total),
        ..TaskSnapshot::new(TaskStatus::Running)
    }
}

pub fn with_result(status: TaskStatus, result: Value) -> TaskSnapshot {
    TaskSnapshot {
        result: Some(result),
        ..TaskSnapshot::new(status)
    }
}

pub fn config() -> EngineConfig {
    EngineConfig::new("http://playarr.test", POLL_MS)
}

pub struct Harness {
    pub engine: Engine,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub transport: Arc<ScriptedTransport>,
}

impl Harness {
    pub fn new(store: TaskStateStore) -> Self {
        let transport = ScriptedTransport::new();
        let (events_tx, events) = mpsc::unbounded_channel();
        let engine = Engine::new(
            &config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            store,
            events_tx,
        );
        Self {
            engine,
            events,
            transport,
        }
    }

    /// Wait for the next poll outcome and apply it
    pub async fn step(&mut self) -> bool {
        let outcome = self
            .engine
            .next_outcome()
            .await
            .expect("outcome channel closed");
        self.engine.handle_poll(outcome)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
