//! In-memory storage for trigger events.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{TriggerEvent, TriggerStatus};
use crate::error::{CoreError, Result};
use crate::id::EventId;

/// Event registry with monotonic status updates.
#[derive(Debug, Default)]
pub struct TriggerStore {
    events: DashMap<EventId, TriggerEvent>,
}

impl TriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new event.
    pub fn store_event(&self, event: TriggerEvent) {
        self.events.insert(event.id.clone(), event);
    }

    /// Retrieve a specific event by ID.
    pub fn get_event(&self, id: &EventId) -> Option<TriggerEvent> {
        self.events.get(id).map(|entry| entry.value().clone())
    }

    /// Advance an event's status. Regressions and repeats are rejected.
    pub fn update_status(&self, id: &EventId, status: TriggerStatus) -> Result<()> {
        let Some(mut entry) = self.events.get_mut(id) else {
            return Err(CoreError::TriggerTransition {
                event_id: id.to_string(),
                from: "<missing>".to_string(),
                to: status.as_str().to_string(),
            });
        };
        if status.rank() <= entry.status.rank() {
            return Err(CoreError::TriggerTransition {
                event_id: id.to_string(),
                from: entry.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }
        entry.status = status;
        Ok(())
    }

    /// Record a processing error under the event's `metadata.error` key.
    pub fn record_error(&self, id: &EventId, error: &str) {
        if let Some(mut entry) = self.events.get_mut(id) {
            if !entry.metadata.is_object() {
                entry.metadata = serde_json::json!({});
            }
            if let Some(object) = entry.metadata.as_object_mut() {
                object.insert(
                    "error".to_string(),
                    serde_json::Value::String(error.to_string()),
                );
            }
        }
    }

    /// All events of a specific type.
    pub fn events_by_type(&self, trigger_type: &str) -> Vec<TriggerEvent> {
        self.events
            .iter()
            .filter(|entry| entry.trigger_type == trigger_type)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// All events from a specific platform.
    pub fn events_by_platform(&self, platform: &str) -> Vec<TriggerEvent> {
        self.events
            .iter()
            .filter(|entry| entry.platform == platform)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// All events within a time range, inclusive.
    pub fn events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<TriggerEvent> {
        self.events
            .iter()
            .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every stored event. The only way events are destroyed.
    pub fn clear(&self) {
        self.events.clear();
    }
}
