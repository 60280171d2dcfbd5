use crate::api::Transport;
use crate::error::EngineError;
use crate::task::{TaskId, TaskSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Result of one poll attempt, tagged with the task it was requested for
/// and the tick that issued it
#[derive(Debug)]
pub struct PollOutcome {
    pub task_id: TaskId,
    /// Tick number within one loop, starting at 1. Attempts may finish out
    /// of order; a lower number is an older report.
    pub seq: u64,
    pub result: Result<TaskSnapshot, EngineError>,
}

/// Running poll loop. Dropping or stopping the handle aborts the loop and
/// any attempt still in flight.
#[derive(Debug)]
pub struct PollHandle {
    task_id: TaskId,
    join: JoinHandle<()>,
}

impl PollHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn stop(self) {
        self.join.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Fixed-period poll driver with at most one live loop
pub struct PollScheduler {
    period: Duration,
    transport: Arc<dyn Transport>,
    outcomes: mpsc::UnboundedSender<PollOutcome>,
    handle: Option<PollHandle>,
}

impl PollScheduler {
    pub fn new(
        period: Duration,
        transport: Arc<dyn Transport>,
        outcomes: mpsc::UnboundedSender<PollOutcome>,
    ) -> Self {
        Self {
            period,
            transport,
            outcomes,
            handle: None,
        }
    }

    /// Begin polling `task_id`, replacing any loop already running.
    /// The first attempt fires one period from now.
    pub fn start(&mut self, task_id: TaskId) {
        self.stop();

        tracing::info!(
            "Polling task {} every {} ms",
            task_id,
            self.period.as_millis()
        );

        let join = tokio::spawn(poll_loop(
            task_id.clone(),
            self.period,
            Arc::clone(&self.transport),
            self.outcomes.clone(),
        ));

        self.handle = Some(PollHandle { task_id, join });
    }

    /// Safe to call when idle
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("Stopping poll loop for task {}", handle.task_id());
            handle.stop();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.handle.is_some()
    }

    pub fn polling_task(&self) -> Option<&TaskId> {
        self.handle.as_ref().map(PollHandle::task_id)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    task_id: TaskId,
    period: Duration,
    transport: Arc<dyn Transport>,
    outcomes: mpsc::UnboundedSender<PollOutcome>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Attempts are not awaited by the loop, so a slow request never delays
    // the next tick. Dropping the set aborts whatever is still running.
    let mut attempts = JoinSet::new();
    let mut seq = 0u64;

    loop {
        ticker.tick().await;
        seq += 1;

        while attempts.try_join_next().is_some() {}

        if outcomes.is_closed() {
            tracing::debug!("Outcome receiver gone, ending poll loop for {}", task_id);
            break;
        }

        tracing::debug!(
            "Poll tick {} for task {} ({} attempts in flight)",
            seq,
            task_id,
            attempts.len()
        );

        let transport = Arc::clone(&transport);
        let outcomes = outcomes.clone();
        let task_id = task_id.clone();
        attempts.spawn(async move {
            let result = transport.poll(&task_id).await;
            let _ = outcomes.send(PollOutcome {
                task_id,
                seq,
                result,
            });
        });
    }
}
