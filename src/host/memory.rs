//! In-memory host collaborators
//!
//! Process-local implementations of [`EventSystem`], [`DataSourceRegistry`]
//! and [`StorageSession`]. They back [`LocalHost`](super::LocalHost) and are
//! what the integration tests drive panels against.
//!
//! The event bus does not call panels itself. Matching deliveries go into a
//! crossbeam channel and the owner of the panels drains it, so no callback
//! ever runs while a bus lock is held.

use super::{DataSourceRegistry, EventSystem, StorageSession};
use crate::config::DataSourceDefinition;
use crate::error::{PanelError, Result};
use crate::types::{
    DataSourceEvent, DataSourceStatus, EventCallback, EventPayload, InstanceId, RecordSet,
    Subscription,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Publisher identity used by [`InMemoryDataSourceRegistry::new`]
pub const DEFAULT_SYSTEM_ID: &str = "DataSourceSystem";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ==================== Event Bus ====================

/// One pending callback invocation produced by [`InMemoryEventBus::publish`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub subscriber: InstanceId,
    pub callback: EventCallback,
    pub payload: EventPayload,
}

/// Event bus keeping subscriptions in a list and queuing deliveries.
pub struct InMemoryEventBus {
    subscriptions: Mutex<Vec<Subscription>>,
    instances: Mutex<HashMap<InstanceId, Vec<EventCallback>>>,
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            subscriptions: Mutex::new(Vec::new()),
            instances: Mutex::new(HashMap::new()),
            tx,
            rx,
        }
    }

    /// Queue a delivery for every subscription matching the publisher, the
    /// event name and (if set) the filter. Returns how many were queued.
    pub fn publish(&self, publisher: &str, event: &str, payload: EventPayload) -> usize {
        let matching: Vec<Delivery> = lock(&self.subscriptions)
            .iter()
            .filter(|s| s.publisher == publisher && s.event == event)
            .filter(|s| s.filter.as_ref().map_or(true, |f| f.matches(&payload)))
            .map(|s| Delivery {
                subscriber: s.subscriber.clone(),
                callback: s.callback,
                payload: payload.clone(),
            })
            .collect();

        let queued = matching.len();
        for delivery in matching {
            if let Err(e) = self.tx.send(delivery) {
                tracing::warn!(publisher, event, "Failed to queue delivery: {}", e);
            }
        }
        tracing::trace!(publisher, event, queued, "Published event");
        queued
    }

    /// Take the next pending delivery, if any.
    pub fn next_delivery(&self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.rx.len()
    }

    /// Snapshot of all active subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        lock(&self.subscriptions).clone()
    }

    /// Active subscriptions held by one instance.
    pub fn subscriptions_of(&self, instance: &InstanceId) -> Vec<Subscription> {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| &s.subscriber == instance)
            .cloned()
            .collect()
    }

    pub fn is_registered(&self, instance: &InstanceId) -> bool {
        lock(&self.instances).contains_key(instance)
    }
}

impl EventSystem for InMemoryEventBus {
    fn register_instance(&self, instance: &InstanceId, callbacks: &[EventCallback]) -> Result<()> {
        lock(&self.instances).insert(instance.clone(), callbacks.to_vec());
        tracing::debug!(%instance, "Registered event target");
        Ok(())
    }

    fn subscribe(&self, subscription: &Subscription) -> Result<()> {
        let accepts = lock(&self.instances)
            .get(&subscription.subscriber)
            .map(|callbacks| callbacks.contains(&subscription.callback));

        match accepts {
            None => Err(PanelError::EventBus(format!(
                "instance {} is not registered",
                subscription.subscriber
            ))),
            Some(false) => Err(PanelError::EventBus(format!(
                "instance {} does not accept callback {}",
                subscription.subscriber, subscription.callback
            ))),
            Some(true) => {
                lock(&self.subscriptions).push(subscription.clone());
                tracing::debug!(%subscription, "Subscribed");
                Ok(())
            }
        }
    }

    fn unsubscribe(&self, subscription: &Subscription) -> Result<()> {
        let mut subscriptions = lock(&self.subscriptions);
        let position = subscriptions
            .iter()
            .position(|s| s == subscription)
            .ok_or_else(|| {
                PanelError::EventBus(format!("no active subscription {}", subscription))
            })?;
        subscriptions.remove(position);
        tracing::debug!(%subscription, "Unsubscribed");
        Ok(())
    }
}

// ==================== Data Source Registry ====================

/// A data source known to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceEntry {
    pub status: DataSourceStatus,
    pub definition: Option<DataSourceDefinition>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of data sources kept in a map.
pub struct InMemoryDataSourceRegistry {
    system_id: Mutex<String>,
    entries: Mutex<HashMap<String, DataSourceEntry>>,
}

impl Default for InMemoryDataSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDataSourceRegistry {
    pub fn new() -> Self {
        Self::with_system_id(DEFAULT_SYSTEM_ID)
    }

    pub fn with_system_id(system_id: impl Into<String>) -> Self {
        Self {
            system_id: Mutex::new(system_id.into()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the publisher identity, as a host does when it restarts its
    /// data-source system.
    pub fn set_system_id(&self, system_id: impl Into<String>) {
        *lock(&self.system_id) = system_id.into();
    }

    /// Set the status of a data source, creating the entry if needed.
    /// Returns the status change as an event payload.
    pub fn set_status(&self, name: &str, status: DataSourceStatus) -> DataSourceEvent {
        let mut entries = lock(&self.entries);
        let entry = entries.entry(name.to_string()).or_insert_with(|| DataSourceEntry {
            status: DataSourceStatus::Pending,
            definition: None,
            updated_at: Utc::now(),
        });
        entry.status = status.clone();
        entry.updated_at = Utc::now();
        tracing::debug!(data_source = name, %status, "Data source status changed");
        DataSourceEvent::new(name, status)
    }

    pub fn entry(&self, name: &str) -> Option<DataSourceEntry> {
        lock(&self.entries).get(name).cloned()
    }
}

impl DataSourceRegistry for InMemoryDataSourceRegistry {
    fn system_id(&self) -> String {
        lock(&self.system_id).clone()
    }

    fn status(&self, name: &str) -> Option<DataSourceStatus> {
        lock(&self.entries).get(name).map(|e| e.status.clone())
    }

    fn create_data_source(&self, definition: &DataSourceDefinition) -> Result<()> {
        if definition.name.is_empty() {
            return Err(PanelError::Registry(
                "data source definition has an empty name".to_string(),
            ));
        }

        let mut entries = lock(&self.entries);
        let entry = entries
            .entry(definition.name.clone())
            .or_insert_with(|| DataSourceEntry {
                status: DataSourceStatus::Pending,
                definition: None,
                updated_at: Utc::now(),
            });
        // Redefining keeps the status; the last run's result stays valid.
        entry.definition = Some(definition.clone());
        entry.updated_at = Utc::now();
        tracing::debug!(
            data_source = %definition.name,
            kind = %definition.kind,
            "Data source defined"
        );
        Ok(())
    }
}

// ==================== Storage ====================

/// Storage session keeping record sets in a map.
#[derive(Default)]
pub struct InMemoryStorage {
    records: Mutex<HashMap<String, Arc<RecordSet>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_record(&self, data_source: &str, records: RecordSet) -> Arc<RecordSet> {
        let records = Arc::new(records);
        lock(&self.records).insert(data_source.to_string(), Arc::clone(&records));
        records
    }

    pub fn remove_record(&self, data_source: &str) -> Option<Arc<RecordSet>> {
        lock(&self.records).remove(data_source)
    }
}

impl StorageSession for InMemoryStorage {
    fn get_record(&self, data_source: &str) -> Option<Arc<RecordSet>> {
        lock(&self.records).get(data_source).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventFilter, DATA_SOURCE_STATUS_UPDATE};
    use serde_json::json;

    fn status_subscription(instance: &str, data_source: &str) -> Subscription {
        Subscription {
            publisher: DEFAULT_SYSTEM_ID.to_string(),
            event: DATA_SOURCE_STATUS_UPDATE.to_string(),
            subscriber: InstanceId::new(instance),
            callback: EventCallback::ProcessDataSourceEvent,
            filter: Some(EventFilter::success_of(data_source)),
        }
    }

    fn status_payload(data_source: &str, status: DataSourceStatus) -> EventPayload {
        EventPayload::DataSourceStatus(DataSourceEvent::new(data_source, status))
    }

    #[test]
    fn test_subscribe_requires_registration() {
        let bus = InMemoryEventBus::new();
        let err = bus.subscribe(&status_subscription("p1", "DS-1")).unwrap_err();
        assert!(matches!(err, PanelError::EventBus(_)));

        bus.register_instance(&InstanceId::new("p1"), &[EventCallback::LoadData])
            .unwrap();
        let err = bus.subscribe(&status_subscription("p1", "DS-1")).unwrap_err();
        assert!(err.to_string().contains("does not accept"));
    }

    #[test]
    fn test_publish_respects_filter() {
        let bus = InMemoryEventBus::new();
        bus.register_instance(&InstanceId::new("p1"), &EventCallback::ALL)
            .unwrap();
        bus.subscribe(&status_subscription("p1", "DS-1")).unwrap();

        let publish = |publisher: &str, data_source: &str, status: DataSourceStatus| {
            bus.publish(
                publisher,
                DATA_SOURCE_STATUS_UPDATE,
                status_payload(data_source, status),
            )
        };
        assert_eq!(publish(DEFAULT_SYSTEM_ID, "DS-1", DataSourceStatus::Running), 0);
        assert_eq!(publish(DEFAULT_SYSTEM_ID, "DS-2", DataSourceStatus::Success), 0);
        assert_eq!(publish("Other", "DS-1", DataSourceStatus::Success), 0);
        assert_eq!(publish(DEFAULT_SYSTEM_ID, "DS-1", DataSourceStatus::Success), 1);

        let delivery = bus.next_delivery().unwrap();
        assert_eq!(delivery.subscriber, InstanceId::new("p1"));
        assert_eq!(delivery.callback, EventCallback::ProcessDataSourceEvent);
        assert!(bus.next_delivery().is_none());
    }

    #[test]
    fn test_duplicate_subscriptions_deliver_twice() {
        let bus = InMemoryEventBus::new();
        bus.register_instance(&InstanceId::new("p1"), &EventCallback::ALL)
            .unwrap();
        bus.subscribe(&status_subscription("p1", "DS-1")).unwrap();
        bus.subscribe(&status_subscription("p1", "DS-1")).unwrap();

        let queued = bus.publish(
            DEFAULT_SYSTEM_ID,
            DATA_SOURCE_STATUS_UPDATE,
            status_payload("DS-1", DataSourceStatus::Success),
        );
        assert_eq!(queued, 2);
        assert_eq!(bus.pending_deliveries(), 2);
    }

    #[test]
    fn test_unsubscribe_removes_one_match() {
        let bus = InMemoryEventBus::new();
        let instance = InstanceId::new("p1");
        bus.register_instance(&instance, &EventCallback::ALL).unwrap();
        bus.subscribe(&status_subscription("p1", "DS-1")).unwrap();

        bus.unsubscribe(&status_subscription("p1", "DS-1")).unwrap();
        assert!(bus.subscriptions_of(&instance).is_empty());

        let err = bus.unsubscribe(&status_subscription("p1", "DS-1")).unwrap_err();
        assert!(err.to_string().contains("no active subscription"));
    }

    #[test]
    fn test_registry_status_and_definitions() {
        let registry = InMemoryDataSourceRegistry::new();
        assert!(registry.status("DS-1").is_none());

        let def = DataSourceDefinition {
            kind: "OTL".to_string(),
            name: "DS-1".to_string(),
            extra: serde_json::Map::new(),
        };
        registry.create_data_source(&def).unwrap();
        assert_eq!(registry.status("DS-1"), Some(DataSourceStatus::Pending));

        let event = registry.set_status("DS-1", DataSourceStatus::Success);
        assert_eq!(event, DataSourceEvent::new("DS-1", DataSourceStatus::Success));
        let completed_at = registry.entry("DS-1").unwrap().updated_at;

        registry.create_data_source(&def).unwrap();
        let entry = registry.entry("DS-1").unwrap();
        assert_eq!(entry.status, DataSourceStatus::Success);
        assert_eq!(entry.definition, Some(def));
        assert!(entry.updated_at >= completed_at);
    }

    #[test]
    fn test_registry_rejects_nameless_definition() {
        let registry = InMemoryDataSourceRegistry::new();
        let def = DataSourceDefinition {
            kind: "OTL".to_string(),
            name: String::new(),
            extra: serde_json::Map::new(),
        };
        assert!(matches!(
            registry.create_data_source(&def),
            Err(PanelError::Registry(_))
        ));
    }

    #[test]
    fn test_registry_system_id_can_change() {
        let registry = InMemoryDataSourceRegistry::new();
        assert_eq!(registry.system_id(), DEFAULT_SYSTEM_ID);
        registry.set_system_id("DataSourceSystem-2");
        assert_eq!(registry.system_id(), "DataSourceSystem-2");
    }

    #[test]
    fn test_storage_shares_record_sets() {
        let storage = InMemoryStorage::new();
        assert!(storage.get_record("DS-1").is_none());

        let row = json!({"title": "X", "value": 1}).as_object().cloned().unwrap();
        let stored = storage.put_record("DS-1", vec![row]);
        let fetched = storage.get_record("DS-1").unwrap();

        assert!(Arc::ptr_eq(&stored, &fetched));
        assert!(storage.remove_record("DS-1").is_some());
        assert!(storage.get_record("DS-1").is_none());
    }
}
