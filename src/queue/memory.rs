//! An in-process queue with visibility timeout semantics.
//!
//! Time doesn't pass on its own: received messages stay in flight until they are
//! deleted or [`MemoryQueue::expire_visibility`] makes them visible again.
use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::queue::{MessageQueue, QueueError, QueueMessage, QueueResult, ReceiveOptions};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: u64,
    body: String,
}

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<StoredMessage>,
    in_flight: BTreeMap<String, StoredMessage>,
    acknowledged: Vec<String>,
    next_id: u64,
    deliveries: u64,
    receive_calls: usize,
    fail_receives: usize,
    reject_deletes: bool,
}

#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    state: Mutex<QueueState>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Default::default(),
        }
    }

    pub fn send(&self, body: impl Into<String>) {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.visible.push_back(StoredMessage {
            id,
            body: body.into(),
        });
    }

    /// Make every undeleted delivery visible again, as if its lease had run out.
    pub fn expire_visibility(&self) {
        let mut state = self.state.lock();
        let mut expired: Vec<StoredMessage> =
            std::mem::take(&mut state.in_flight).into_values().collect();
        expired.sort_by_key(|message| message.id);

        for message in expired.into_iter().rev() {
            state.visible.push_front(message);
        }
    }

    /// Fail the next `count` receive calls.
    pub fn fail_receives(&self, count: usize) {
        self.state.lock().fail_receives = count;
    }

    pub fn set_reject_deletes(&self, reject_deletes: bool) {
        self.state.lock().reject_deletes = reject_deletes;
    }

    pub fn visible_len(&self) -> usize {
        self.state.lock().visible.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Bodies of the messages deleted so far, in deletion order.
    pub fn acknowledged(&self) -> Vec<String> {
        self.state.lock().acknowledged.clone()
    }

    pub fn receive_calls(&self) -> usize {
        self.state.lock().receive_calls
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn receive(&self, options: &ReceiveOptions) -> QueueResult<Vec<QueueMessage>> {
        let mut state = self.state.lock();
        state.receive_calls += 1;

        if state.fail_receives > 0 {
            state.fail_receives -= 1;
            return Err(QueueError::Receive {
                queue: self.name.clone(),
                reason: "queue unavailable".to_string(),
            });
        }

        let count = (options.max_messages as usize).min(state.visible.len());
        let mut batch = Vec::with_capacity(count);
        for message in state.visible.drain(..count).collect::<Vec<_>>() {
            state.deliveries += 1;
            let receipt_handle = format!("{}-{}", message.id, state.deliveries);
            batch.push(QueueMessage {
                receipt_handle: receipt_handle.clone(),
                body: message.body.clone(),
            });
            state.in_flight.insert(receipt_handle, message);
        }

        debug!("Delivered {} message(s) from {}", batch.len(), self.name);
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        let mut state = self.state.lock();

        if state.reject_deletes {
            return Err(QueueError::Delete {
                receipt_handle: receipt_handle.to_string(),
                reason: "access denied".to_string(),
            });
        }

        let message =
            state
                .in_flight
                .remove(receipt_handle)
                .ok_or_else(|| QueueError::Delete {
                    receipt_handle: receipt_handle.to_string(),
                    reason: "receipt handle is not in flight".to_string(),
                })?;
        state.acknowledged.push(message.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryQueue;
    use crate::queue::{MessageQueue, QueueError, ReceiveOptions};

    #[tokio::test]
    async fn test_receive_respects_batch_size() {
        let queue = MemoryQueue::new("staging");
        for i in 0..12 {
            queue.send(format!("message {i}"));
        }

        let batch = queue.receive(&ReceiveOptions::default()).await.unwrap();

        assert_eq!(batch.len(), 10);
        assert_eq!(batch[0].body, "message 0");
        assert_eq!(queue.visible_len(), 2);
        assert_eq!(queue.in_flight_len(), 10);
    }

    #[tokio::test]
    async fn test_undeleted_message_is_redelivered() {
        let queue = MemoryQueue::new("staging");
        queue.send("first");
        queue.send("second");

        let batch = queue.receive(&ReceiveOptions::default()).await.unwrap();
        queue.delete(&batch[1].receipt_handle).await.unwrap();
        queue.expire_visibility();

        let redelivered = queue.receive(&ReceiveOptions::default()).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].body, "first");
        assert_ne!(redelivered[0].receipt_handle, batch[0].receipt_handle);
        assert_eq!(queue.acknowledged(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_stale_receipt_is_rejected() {
        let queue = MemoryQueue::new("staging");
        queue.send("first");

        let batch = queue.receive(&ReceiveOptions::default()).await.unwrap();
        queue.expire_visibility();

        assert!(matches!(
            queue.delete(&batch[0].receipt_handle).await,
            Err(QueueError::Delete { .. })
        ));
    }
}
