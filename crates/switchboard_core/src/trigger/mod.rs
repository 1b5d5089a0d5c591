//! Asynchronous trigger pipeline.
//!
//! Inbound platform activity is wrapped into a [`TriggerEvent`] and tracked
//! through a monotonic `pending -> processing -> completed|failed` lifecycle
//! off the critical response path. Handler failures are captured into the
//! event's own metadata and never reach the submitter.

mod monitor;
mod store;

pub use monitor::{TriggerHandler, TriggerMonitor};
pub use store::TriggerStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EventId;

/// Lifecycle status of a trigger event.
///
/// Transitions are monotonic and single-directional; a terminal status is
/// never reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TriggerStatus {
    /// Position in the lifecycle; transitions must strictly increase.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A unit of inbound platform activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Unique identifier
    pub id: EventId,
    /// Handler type this event is dispatched to, e.g. "telegram_message"
    pub trigger_type: String,
    /// Originating platform, e.g. "telegram"
    pub platform: String,
    /// When the event was received
    pub timestamp: DateTime<Utc>,
    /// Free-form payload
    pub content: serde_json::Value,
    /// Free-form annotations; processing errors land under "error"
    pub metadata: serde_json::Value,
    /// Lifecycle status
    pub status: TriggerStatus,
}

impl TriggerEvent {
    /// Wrap a fresh platform event, status `pending`.
    pub fn new(
        trigger_type: impl Into<String>,
        platform: impl Into<String>,
        content: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::generate(),
            trigger_type: trigger_type.into(),
            platform: platform.into(),
            timestamp: Utc::now(),
            content,
            metadata,
            status: TriggerStatus::Pending,
        }
    }
}
