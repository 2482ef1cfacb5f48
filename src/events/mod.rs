use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

pub mod dispatcher;
pub mod notification;

/// A change to an object in the staging bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingObjectEvent {
    pub bucket_name: String,
    pub object_key: String,
    /// When the storage service emitted the notification.
    pub send_time: DateTime<Utc>,
    /// When the batch carrying the notification was received from the queue.
    pub receive_time: DateTime<Utc>,
}

impl StagingObjectEvent {
    pub fn object_url(&self) -> String {
        format!("s3://{}/{}", self.bucket_name, self.object_key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler declined the event for now; the message goes back to the queue.
    #[error("Event released back to the queue")]
    CatchAndRelease,

    #[error(transparent)]
    Failed(#[from] Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn failed(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        HandlerError::Failed(error.into())
    }
}

/// Downstream consumer of staging object events.
///
/// Messages are delivered at least once, so the same event may arrive more than once.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventHandler: Sync + Send {
    async fn handle_event(&self, event: &StagingObjectEvent) -> Result<(), HandlerError>;
}

pub trait Clock: Sync + Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
