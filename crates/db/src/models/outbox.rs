//! Notification outbox models.
//!
//! Defines the database row struct for `notification_outbox` and the insert
//! DTO used when a request handler schedules a notification.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use eduboard_core::error::CoreError;
use eduboard_core::types::{DbId, Timestamp};

/// Default retry budget for a new message.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    InFlight,
    Sent,
    Dead,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::InFlight => "in_flight",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Dead => "dead",
        }
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        match input {
            "pending" => Ok(OutboxStatus::Pending),
            "in_flight" => Ok(OutboxStatus::InFlight),
            "sent" => Ok(OutboxStatus::Sent),
            "dead" => Ok(OutboxStatus::Dead),
            other => Err(CoreError::Validation(format!(
                "Unknown outbox status '{other}'. Expected pending, in_flight, sent or dead"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A `notification_outbox` row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: DbId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub sent_at: Option<Timestamp>,
}

impl OutboxMessage {
    pub fn status(&self) -> Option<OutboxStatus> {
        OutboxStatus::parse(&self.status).ok()
    }

    /// Whether another failure should still be retried.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOutboxMessage {
    pub kind: String,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
}

impl NewOutboxMessage {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
