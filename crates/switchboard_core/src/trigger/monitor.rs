//! Background dispatch of trigger events to type-specific handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{TriggerEvent, TriggerStatus, TriggerStore};
use crate::config::TriggerConfig;
use crate::error::Result;
use crate::id::EventId;

/// A type-specific event handler.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// Type name this handler is bound to.
    fn trigger_type(&self) -> &str;

    /// Whether the event is well-formed for this handler.
    async fn validate(&self, event: &TriggerEvent) -> bool;

    /// Process a validated event.
    async fn process(&self, event: &TriggerEvent) -> Result<()>;
}

/// Central dispatcher for trigger events.
///
/// `submit` persists the event and returns immediately; processing happens
/// in a background task. Concurrency is capped by a semaphore so a burst of
/// events queues instead of fanning out without bound.
pub struct TriggerMonitor {
    handlers: DashMap<String, Arc<dyn TriggerHandler>>,
    store: Arc<TriggerStore>,
    in_flight: Arc<DashSet<EventId>>,
    permits: Arc<Semaphore>,
}

impl TriggerMonitor {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            handlers: DashMap::new(),
            store: Arc::new(TriggerStore::new()),
            in_flight: Arc::new(DashSet::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_dispatch)),
        }
    }

    pub fn store(&self) -> &TriggerStore {
        &self.store
    }

    /// Bind a handler to its type name. Re-registration replaces the old
    /// handler.
    pub fn register_trigger(&self, handler: Arc<dyn TriggerHandler>) {
        let trigger_type = handler.trigger_type().to_string();
        if self.handlers.insert(trigger_type.clone(), handler).is_some() {
            warn!(trigger_type = %trigger_type, "replaced existing trigger handler");
        } else {
            debug!(trigger_type = %trigger_type, "registered trigger handler");
        }
    }

    /// Accept an event: store it pending and process it in the background.
    ///
    /// Processing failures never propagate to the submitter; they end up in
    /// the event's `metadata.error` with status `failed`.
    pub fn submit(&self, event: TriggerEvent) -> EventId {
        let id = event.id.clone();
        let trigger_type = event.trigger_type.clone();
        self.store.store_event(event.clone());

        let Some(handler) = self
            .handlers
            .get(&trigger_type)
            .map(|entry| entry.value().clone())
        else {
            warn!(event = %id, trigger_type = %trigger_type, "no handler registered");
            let _ = self.store.update_status(&id, TriggerStatus::Processing);
            let _ = self.store.update_status(&id, TriggerStatus::Failed);
            self.store
                .record_error(&id, &format!("no handler registered for type {trigger_type}"));
            return id;
        };

        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let permits = Arc::clone(&self.permits);

        // Mark in-flight before spawning so bookkeeping can never miss a
        // fast-finishing task.
        self.in_flight.insert(id.clone());
        let task_id = id.clone();

        tokio::spawn(async move {
            // Closed semaphore is impossible here; treat it as a no-op guard.
            let _permit = permits.acquire().await;
            run_event(&store, handler, &event).await;
            in_flight.remove(&task_id);
        });

        id
    }

    /// Retrieve a specific event by ID.
    pub fn get_event(&self, id: &EventId) -> Option<TriggerEvent> {
        self.store.get_event(id)
    }

    /// All events of a specific type.
    pub fn events_by_type(&self, trigger_type: &str) -> Vec<TriggerEvent> {
        self.store.events_by_type(trigger_type)
    }

    /// All events from a specific platform.
    pub fn events_by_platform(&self, platform: &str) -> Vec<TriggerEvent> {
        self.store.events_by_platform(platform)
    }

    /// Number of events currently being processed.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait until no background processing remains. Test and shutdown aid;
    /// no cancellation is exposed.
    pub async fn wait_idle(&self) {
        while !self.in_flight.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl std::fmt::Debug for TriggerMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerMonitor")
            .field("handlers", &self.handlers.len())
            .field("events", &self.store.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

/// Walk one event through its lifecycle with error capture.
async fn run_event(store: &TriggerStore, handler: Arc<dyn TriggerHandler>, event: &TriggerEvent) {
    let id = &event.id;
    if let Err(err) = store.update_status(id, TriggerStatus::Processing) {
        warn!(event = %id, "could not move event to processing: {err}");
        return;
    }

    if !handler.validate(event).await {
        debug!(event = %id, "event failed validation");
        let _ = store.update_status(id, TriggerStatus::Failed);
        store.record_error(id, "event failed validation");
        return;
    }

    match handler.process(event).await {
        Ok(()) => {
            let _ = store.update_status(id, TriggerStatus::Completed);
        }
        Err(err) => {
            warn!(event = %id, "handler failed: {err}");
            let _ = store.update_status(id, TriggerStatus::Failed);
            store.record_error(id, &err.to_string());
        }
    }
}
