//! Wire format of storage change notifications.
//!
//! A queue message either carries the notification directly or wraps it as a JSON
//! string in the `Message` field of a fan-out envelope:
//!
//! ```text
//! { "Message": "{\"Records\": [...]}", "Timestamp": "...", ... }
//! { "Records": [ { "eventTime": "...", "s3": { "bucket": { "name": ... }, "object": { "key": ... } } } ] }
//! ```
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed message envelope: {0}")]
    Envelope(serde_json::Error),

    #[error("Malformed storage notification: {0}")]
    Notification(serde_json::Error),
}

#[derive(Deserialize)]
struct FanOutEnvelope {
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

/// How a notification was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<'a> {
    /// Wrapped in a fan-out envelope, which carries it as a string.
    FanOut(String),
    /// The message body is the notification itself.
    Direct(&'a str),
}

// Derived struct visitors also accept sequences, so go through a JSON object first
fn from_object<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    let object: Map<String, Value> = serde_json::from_str(json)?;
    serde_json::from_value(Value::Object(object))
}

impl<'a> Envelope<'a> {
    pub fn parse(body: &'a str) -> Result<Self, DecodeError> {
        let envelope: FanOutEnvelope = from_object(body).map_err(DecodeError::Envelope)?;

        Ok(match envelope.message {
            Some(message) => Envelope::FanOut(message),
            None => Envelope::Direct(body),
        })
    }

    pub fn payload(&self) -> &str {
        match self {
            Envelope::FanOut(message) => message,
            Envelope::Direct(body) => body,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageNotification {
    #[serde(rename = "Records", default)]
    pub records: Option<Vec<NotificationRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub event_time: DateTime<Utc>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// Decode a queue message body into its notification records.
///
/// A notification without records (e.g. the test event sent when a bucket
/// subscription is set up) decodes to an empty list.
pub fn decode_message(body: &str) -> Result<Vec<NotificationRecord>, DecodeError> {
    let envelope = Envelope::parse(body)?;
    let notification: StorageNotification =
        from_object(envelope.payload()).map_err(DecodeError::Notification)?;

    Ok(notification.records.unwrap_or_default())
}
