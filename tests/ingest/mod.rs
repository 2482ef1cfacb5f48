use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use strata::config::context::{build_dispatcher, poll_interval};
use strata::config::schema::StrataConfig;
use strata::events::dispatcher::{EventDispatcher, TickSummary};
use strata::events::{EventHandler, FixedClock, HandlerError, StagingObjectEvent};
use strata::polling::{run_polling_loop, StepHandler};
use strata::queue::memory::MemoryQueue;
use strata::queue::QueueError;

use crate::fixtures::{config, fan_out, notification, receive_time};

// Records every event it accepts. Keys listed in `release_once` are released on
// their first delivery and accepted afterwards; keys in `broken` always fail.
#[derive(Default)]
struct RecordingHandler {
    handled: Mutex<Vec<StagingObjectEvent>>,
    release_once: Mutex<HashSet<String>>,
    broken: HashSet<String>,
}

impl RecordingHandler {
    fn handled_keys(&self) -> Vec<String> {
        self.handled
            .lock()
            .iter()
            .map(|event| event.object_key.clone())
            .collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: &StagingObjectEvent) -> Result<(), HandlerError> {
        if self.release_once.lock().remove(&event.object_key) {
            return Err(HandlerError::CatchAndRelease);
        }
        if self.broken.contains(&event.object_key) {
            return Err(HandlerError::failed(format!(
                "cannot read {}",
                event.object_url()
            )));
        }

        self.handled.lock().push(event.clone());
        Ok(())
    }
}

// Drives the dispatcher and simulates the visibility timeout running out between
// ticks; requests shutdown once the queue has nothing left to deliver.
struct DrainingStep {
    dispatcher: EventDispatcher,
    queue: Arc<MemoryQueue>,
    ticks: Mutex<Vec<TickSummary>>,
    max_ticks: usize,
    shutdown: CancellationToken,
}

#[async_trait]
impl StepHandler for DrainingStep {
    type Error = QueueError;

    async fn handle_step(&self) -> Result<(), Self::Error> {
        let summary = self.dispatcher.tick().await?;
        self.queue.expire_visibility();

        let mut ticks = self.ticks.lock();
        ticks.push(summary);
        if self.queue.visible_len() == 0 || ticks.len() >= self.max_ticks {
            self.shutdown.cancel();
        }
        Ok(())
    }
}

fn draining_step(
    config: &StrataConfig,
    queue: Arc<MemoryQueue>,
    handler: Arc<RecordingHandler>,
    max_ticks: usize,
    shutdown: CancellationToken,
) -> DrainingStep {
    DrainingStep {
        dispatcher: build_dispatcher(
            config,
            queue.clone(),
            handler,
            Arc::new(FixedClock(receive_time())),
        ),
        queue,
        ticks: Mutex::new(vec![]),
        max_ticks,
        shutdown,
    }
}

#[rstest]
#[tokio::test]
async fn test_drain_mixed_encodings(config: StrataConfig) {
    let queue = Arc::new(MemoryQueue::new("staging-events"));
    queue.send(notification(&["69ab.logs.pv_log/2018/06/27/a.gz"]));
    queue.send(fan_out(&notification(&[
        "69ab.logs.pv_log/2018/06/27/b.gz",
        "69ab.logs.pv_log/2018/06/27/c.gz",
    ])));
    queue.send(r#"{"Service":"Amazon S3","Event":"s3:TestEvent"}"#);
    queue.send(fan_out(&notification(&["69ab.logs.click_log/2018/06/27/d.gz"])));

    let handler = Arc::new(RecordingHandler::default());
    let shutdown = CancellationToken::new();
    let step = draining_step(&config, queue.clone(), handler.clone(), 10, shutdown.clone());

    run_polling_loop(&step, poll_interval(&config), shutdown).await;

    assert_eq!(
        handler.handled_keys(),
        vec![
            "69ab.logs.pv_log/2018/06/27/a.gz",
            "69ab.logs.pv_log/2018/06/27/b.gz",
            "69ab.logs.pv_log/2018/06/27/c.gz",
            "69ab.logs.click_log/2018/06/27/d.gz",
        ]
    );
    assert!(handler
        .handled
        .lock()
        .iter()
        .all(|event| event.receive_time == receive_time()
            && event.bucket_name == "staging-bucket"));
    assert_eq!(queue.acknowledged().len(), 4);

    // Batches are capped at the configured three messages
    let ticks = step.ticks.lock();
    assert_eq!(ticks[0].received, 3);
    assert_eq!(ticks[1].received, 1);
}

#[rstest]
#[tokio::test]
async fn test_released_message_is_redelivered_whole(config: StrataConfig) {
    let queue = Arc::new(MemoryQueue::new("staging-events"));
    queue.send(notification(&["first.gz", "late.gz", "last.gz"]));

    let handler = Arc::new(RecordingHandler {
        release_once: Mutex::new(HashSet::from(["late.gz".to_string()])),
        ..Default::default()
    });
    let shutdown = CancellationToken::new();
    let step = draining_step(&config, queue.clone(), handler.clone(), 10, shutdown.clone());

    let steps = run_polling_loop(&step, Duration::ZERO, shutdown).await;

    assert_eq!(steps, 2);
    // The record before the released one is handled again on redelivery
    assert_eq!(
        handler.handled_keys(),
        vec!["first.gz", "first.gz", "late.gz", "last.gz"]
    );
    assert_eq!(queue.acknowledged().len(), 1);

    let ticks = step.ticks.lock();
    assert_eq!(ticks[0].released, 1);
    assert_eq!(ticks[1].acknowledged, 1);
}

#[rstest]
#[tokio::test]
async fn test_poison_message_stays_on_queue(config: StrataConfig) {
    let queue = Arc::new(MemoryQueue::new("staging-events"));
    queue.send(notification(&["broken.gz"]));
    queue.send("<html>not a notification</html>");
    queue.send(notification(&["fine.gz"]));

    let handler = Arc::new(RecordingHandler {
        broken: HashSet::from(["broken.gz".to_string()]),
        ..Default::default()
    });
    let shutdown = CancellationToken::new();
    let step = draining_step(&config, queue.clone(), handler.clone(), 3, shutdown.clone());

    let steps = run_polling_loop(&step, Duration::ZERO, shutdown).await;

    assert_eq!(steps, 3);
    assert_eq!(handler.handled_keys(), vec!["fine.gz"]);
    assert_eq!(queue.acknowledged(), vec![notification(&["fine.gz"])]);
    assert_eq!(queue.visible_len(), 2);

    let ticks = step.ticks.lock();
    assert!(ticks[1..]
        .iter()
        .all(|tick| tick.received == 2 && tick.failed == 1 && tick.undecodable == 1));
}

#[rstest]
#[tokio::test]
async fn test_receive_failures_are_survived(config: StrataConfig) {
    let queue = Arc::new(MemoryQueue::new("staging-events"));
    queue.send(notification(&["a.gz"]));
    queue.fail_receives(2);

    let handler = Arc::new(RecordingHandler::default());
    let shutdown = CancellationToken::new();
    let step = draining_step(&config, queue.clone(), handler.clone(), 10, shutdown.clone());

    let steps = run_polling_loop(&step, Duration::ZERO, shutdown).await;

    assert_eq!(steps, 3);
    assert_eq!(queue.receive_calls(), 3);
    assert_eq!(handler.handled_keys(), vec!["a.gz"]);
}
