mod common;

use common::{running, ScriptedTransport, POLL_MS};
use playarr::api::Transport;
use playarr::scheduler::PollScheduler;
use playarr::task::TaskId;
use playarr::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

const PERIOD: Duration = Duration::from_millis(POLL_MS);

fn scheduler(
    transport: &Arc<ScriptedTransport>,
) -> (
    PollScheduler,
    mpsc::UnboundedReceiver<playarr::scheduler::PollOutcome>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let transport = Arc::clone(transport) as Arc<dyn Transport>;
    (PollScheduler::new(PERIOD, transport, tx), rx)
}

#[tokio::test(start_paused = true)]
async fn test_first_attempt_waits_one_period() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_1", Ok(running(0, 0, 1)));
    let (mut scheduler, mut rx) = scheduler(&transport);

    let started = Instant::now();
    scheduler.start(TaskId::new("scan_1"));
    let outcome = rx.recv().await.unwrap();

    assert!(started.elapsed() >= PERIOD);
    assert_eq!(outcome.task_id, TaskId::new("scan_1"));
    assert!(outcome.result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_restart_keeps_a_single_loop() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_a", Ok(running(0, 0, 1)));
    transport.on_poll("scan_b", Ok(running(0, 0, 1)));
    let (mut scheduler, mut rx) = scheduler(&transport);

    scheduler.start(TaskId::new("scan_a"));
    scheduler.start(TaskId::new("scan_b"));
    assert_eq!(scheduler.polling_task(), Some(&TaskId::new("scan_b")));

    let outcome = rx.recv().await.unwrap();
    assert_eq!(outcome.task_id, TaskId::new("scan_b"));

    sleep(PERIOD / 2).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(transport.polled_ids(), vec![TaskId::new("scan_b")]);
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_are_numbered_per_loop() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_a", Ok(running(0, 0, 1)));
    transport.on_poll("scan_b", Ok(running(0, 0, 1)));
    let (mut scheduler, mut rx) = scheduler(&transport);

    scheduler.start(TaskId::new("scan_a"));
    assert_eq!(rx.recv().await.unwrap().seq, 1);
    assert_eq!(rx.recv().await.unwrap().seq, 2);

    scheduler.start(TaskId::new("scan_b"));
    let outcome = rx.recv().await.unwrap();
    assert_eq!(outcome.task_id, TaskId::new("scan_b"));
    assert_eq!(outcome.seq, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_1", Ok(running(0, 0, 1)));
    let (mut scheduler, mut rx) = scheduler(&transport);

    scheduler.stop();
    scheduler.start(TaskId::new("scan_1"));
    scheduler.stop();
    scheduler.stop();

    assert!(!scheduler.is_polling());
    sleep(PERIOD * 5).await;
    assert!(rx.try_recv().is_err());
    assert!(transport.polled_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_attempt_does_not_delay_ticks() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_1", Ok(running(0, 0, 1)));
    transport.delay_polls(PERIOD * 5 / 2);
    let (mut scheduler, mut rx) = scheduler(&transport);

    scheduler.start(TaskId::new("scan_1"));
    sleep(PERIOD * 33 / 10).await;

    assert_eq!(transport.polled_ids().len(), 3);
    assert!(rx.try_recv().is_err());

    let outcome = rx.recv().await.unwrap();
    assert_eq!(outcome.task_id, TaskId::new("scan_1"));
}

#[tokio::test(start_paused = true)]
async fn test_errors_are_delivered_as_outcomes() {
    let transport = ScriptedTransport::new();
    let (mut scheduler, mut rx) = scheduler(&transport);

    scheduler.start(TaskId::new("gone"));
    let outcome = rx.recv().await.unwrap();

    assert_eq!(
        outcome.result.unwrap_err(),
        EngineError::NotFound(TaskId::new("gone"))
    );
    // The scheduler keeps ticking; stopping on errors is the engine's call.
    assert!(scheduler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_scheduler_ends_loop() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_1", Ok(running(0, 0, 1)));
    let (mut scheduler, _rx) = scheduler(&transport);

    scheduler.start(TaskId::new("scan_1"));
    drop(scheduler);
    sleep(PERIOD * 3).await;

    assert!(transport.polled_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_closed_receiver_ends_loop() {
    let transport = ScriptedTransport::new();
    transport.on_poll("scan_1", Ok(running(0, 0, 1)));
    let (mut scheduler, rx) = scheduler(&transport);
    drop(rx);

    scheduler.start(TaskId::new("scan_1"));
    sleep(PERIOD * 3).await;

    assert!(transport.polled_ids().is_empty());
}
