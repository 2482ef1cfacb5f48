use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::events::notification::{decode_message, DecodeError, NotificationRecord};
use crate::events::{Clock, EventHandler, HandlerError, StagingObjectEvent};
use crate::polling::StepHandler;
use crate::queue::{MessageQueue, QueueError, QueueMessage, QueueResult, ReceiveOptions};

#[derive(Debug, thiserror::Error)]
enum MessageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Per-tick message counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub received: usize,
    /// Fully handled and deleted from the queue.
    pub acknowledged: usize,
    /// Left on the queue because the handler released one of their events.
    pub released: usize,
    /// Left on the queue because the handler failed on one of their events.
    pub failed: usize,
    pub undecodable: usize,
    /// Fully handled, but the delete call failed.
    pub undeletable: usize,
}

fn staging_event(record: NotificationRecord, receive_time: DateTime<Utc>) -> StagingObjectEvent {
    StagingObjectEvent {
        bucket_name: record.s3.bucket.name,
        object_key: record.s3.object.key,
        send_time: record.event_time,
        receive_time,
    }
}

/// Drains storage change notifications from a queue into an [`EventHandler`].
///
/// A message is deleted only once every record it carries has been handled, so a
/// failure on any record gets the whole message redelivered after its visibility
/// timeout. Messages that fail to decode are left on the queue as well.
pub struct EventDispatcher {
    queue: Arc<dyn MessageQueue>,
    handler: Arc<dyn EventHandler>,
    clock: Arc<dyn Clock>,
    options: ReceiveOptions,
}

impl EventDispatcher {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        handler: Arc<dyn EventHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            handler,
            clock,
            options: ReceiveOptions::default(),
        }
    }

    pub fn with_receive_options(mut self, options: ReceiveOptions) -> Self {
        self.options = options;
        self
    }

    /// Receive one batch and dispatch every message in it.
    ///
    /// Only a failed receive call is returned as an error; problems with individual
    /// messages are logged and counted.
    pub async fn tick(&self) -> QueueResult<TickSummary> {
        let messages = self.queue.receive(&self.options).await?;
        let receive_time = self.clock.now();

        let mut summary = TickSummary {
            received: messages.len(),
            ..Default::default()
        };

        for message in &messages {
            match self.handle_message(message, receive_time).await {
                Ok(()) => {}
                Err(MessageError::Handler(HandlerError::CatchAndRelease)) => {
                    debug!(
                        "Released message {} back to the queue",
                        message.receipt_handle
                    );
                    summary.released += 1;
                    continue;
                }
                Err(MessageError::Handler(e)) => {
                    error!("Encountered an error in processing event message: {e}");
                    summary.failed += 1;
                    continue;
                }
                Err(MessageError::Decode(e)) => {
                    error!("Could not decode message {}: {e}", message.receipt_handle);
                    summary.undecodable += 1;
                    continue;
                }
            }

            match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => summary.acknowledged += 1,
                Err(e) => {
                    error!("Could not acknowledge handled message: {e}");
                    summary.undeletable += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn handle_message(
        &self,
        message: &QueueMessage,
        receive_time: DateTime<Utc>,
    ) -> Result<(), MessageError> {
        let records = decode_message(&message.body)?;
        if records.is_empty() {
            warn!("Message {} carries no records", message.receipt_handle);
            return Ok(());
        }

        for record in records {
            let event = staging_event(record, receive_time);
            let object_url = event.object_url();

            async {
                info!("Handling event");
                self.handler.handle_event(&event).await
            }
            .instrument(info_span!("handle_event", object_url = %object_url))
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl StepHandler for EventDispatcher {
    type Error = QueueError;

    async fn handle_step(&self) -> Result<(), Self::Error> {
        let summary = self.tick().await?;
        debug!("Dispatcher tick finished: {summary:?}");
        Ok(())
    }
}
