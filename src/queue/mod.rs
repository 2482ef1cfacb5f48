use async_trait::async_trait;

pub mod memory;

pub const MAX_RECEIVE_MESSAGES: u32 = 10;
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u32 = 1200;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to receive messages from {queue}: {reason}")]
    Receive { queue: String, reason: String },

    #[error("Failed to delete message {receipt_handle}: {reason}")]
    Delete {
        receipt_handle: String,
        reason: String,
    },
}

pub type QueueResult<T, E = QueueError> = Result<T, E>;

/// Parameters of a single long-poll receive call.
///
/// Received messages stay invisible to other consumers for the visibility timeout;
/// a message that isn't deleted before it runs out is delivered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: u32,
    pub wait_time_seconds: u32,
    pub visibility_timeout_seconds: u32,
}

impl ReceiveOptions {
    pub fn new(max_messages: u32, wait_time_seconds: u32, visibility_timeout_seconds: u32) -> Self {
        Self {
            max_messages: max_messages.clamp(1, MAX_RECEIVE_MESSAGES),
            wait_time_seconds: wait_time_seconds.min(MAX_WAIT_TIME_SECONDS),
            visibility_timeout_seconds,
        }
    }
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self::new(
            MAX_RECEIVE_MESSAGES,
            MAX_WAIT_TIME_SECONDS,
            DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Handle of this particular delivery, used to acknowledge it.
    pub receipt_handle: String,
    pub body: String,
}

/// An at-least-once message queue.
#[async_trait]
pub trait MessageQueue: Sync + Send {
    /// Long-poll for a batch of messages; an empty batch means none arrived in time.
    async fn receive(&self, options: &ReceiveOptions) -> QueueResult<Vec<QueueMessage>>;

    /// Acknowledge a delivery so that the message isn't redelivered.
    async fn delete(&self, receipt_handle: &str) -> QueueResult<()>;
}
