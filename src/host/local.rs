//! Local host and dispatch table
//!
//! [`LocalHost`] bundles the in-memory collaborators and a renderer factory
//! into a [`Host`]. [`Dashboard`] owns a local host plus the panels created
//! in it, and routes event-bus deliveries to them by instance id: the typed
//! dispatch table that replaces looking callbacks up by method name.

use super::memory::{InMemoryDataSourceRegistry, InMemoryEventBus, InMemoryStorage};
use super::{DataSourceRegistry, EventSystem, Host, StorageSession};
use crate::config::PanelSettings;
use crate::error::{Result, ResultExt};
use crate::panel::PanelAdapter;
use crate::render::{RecordingRenderer, Renderer};
use crate::types::{
    per_source_event_name, DataSourceStatus, EventPayload, InstanceId, MountTarget, RecordSet,
    DATA_SOURCE_STATUS_UPDATE,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

type RendererFactory = Box<dyn Fn(&MountTarget) -> Box<dyn Renderer>>;

/// Host backed by in-memory collaborators.
pub struct LocalHost {
    bus: Arc<InMemoryEventBus>,
    registry: Arc<InMemoryDataSourceRegistry>,
    storage: Arc<InMemoryStorage>,
    renderer_factory: RendererFactory,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHost {
    /// Local host mounting a fresh [`RecordingRenderer`] per panel.
    pub fn new() -> Self {
        Self::with_renderer_factory(|_| Box::new(RecordingRenderer::new()))
    }

    pub fn with_renderer_factory(
        factory: impl Fn(&MountTarget) -> Box<dyn Renderer> + 'static,
    ) -> Self {
        Self {
            bus: Arc::new(InMemoryEventBus::new()),
            registry: Arc::new(InMemoryDataSourceRegistry::new()),
            storage: Arc::new(InMemoryStorage::new()),
            renderer_factory: Box::new(factory),
        }
    }

    pub fn bus(&self) -> &InMemoryEventBus {
        &self.bus
    }

    pub fn registry(&self) -> &InMemoryDataSourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &InMemoryStorage {
        &self.storage
    }

    /// Change a data source's status and announce it on the bus.
    /// Returns the number of deliveries queued.
    pub fn set_status(&self, data_source: &str, status: DataSourceStatus) -> usize {
        let event = self.registry.set_status(data_source, status);
        self.bus.publish(
            &self.registry.system_id(),
            DATA_SOURCE_STATUS_UPDATE,
            EventPayload::DataSourceStatus(event),
        )
    }

    /// Store a finished data source's records, mark it `success` and announce
    /// it with both the status update and the per-source update event.
    /// Returns the number of deliveries queued.
    pub fn complete_data_source(&self, data_source: &str, records: RecordSet) -> usize {
        let records = self.storage.put_record(data_source, records);
        let status_deliveries = self.set_status(data_source, DataSourceStatus::Success);
        let update_deliveries = self.bus.publish(
            &self.registry.system_id(),
            &per_source_event_name(data_source),
            EventPayload::Records(records),
        );
        status_deliveries + update_deliveries
    }
}

impl Host for LocalHost {
    fn event_system(&self) -> Option<Arc<dyn EventSystem>> {
        Some(self.bus.clone() as Arc<dyn EventSystem>)
    }

    fn data_source_registry(&self) -> Option<Arc<dyn DataSourceRegistry>> {
        Some(self.registry.clone() as Arc<dyn DataSourceRegistry>)
    }

    fn storage(&self) -> Option<Arc<dyn StorageSession>> {
        Some(self.storage.clone() as Arc<dyn StorageSession>)
    }

    fn mount_renderer(&self, target: &MountTarget) -> Option<Box<dyn Renderer>> {
        Some((self.renderer_factory)(target))
    }
}

/// Panels of one dashboard and the table routing deliveries to them.
pub struct Dashboard {
    host: LocalHost,
    panels: BTreeMap<InstanceId, PanelAdapter>,
}

impl Dashboard {
    pub fn new(host: LocalHost) -> Self {
        Self {
            host,
            panels: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> &LocalHost {
        &self.host
    }

    /// Construct a panel in this dashboard and add it to the dispatch table.
    pub fn add_panel(
        &mut self,
        instance_id: InstanceId,
        mount_target: &MountTarget,
        settings: PanelSettings,
    ) -> Result<&mut PanelAdapter> {
        let panel = PanelAdapter::new(&self.host, instance_id.clone(), mount_target, settings)
            .with_context(|| format!("Failed to create panel {}", instance_id))?;
        match self.panels.entry(instance_id) {
            Entry::Occupied(mut entry) => {
                tracing::warn!(instance = %entry.key(), "Replacing existing panel");
                entry.insert(panel);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                tracing::info!(instance = %entry.key(), "Added panel");
                Ok(entry.insert(panel))
            }
        }
    }

    pub fn panel(&self, instance_id: &InstanceId) -> Option<&PanelAdapter> {
        self.panels.get(instance_id)
    }

    pub fn panel_mut(&mut self, instance_id: &InstanceId) -> Option<&mut PanelAdapter> {
        self.panels.get_mut(instance_id)
    }

    pub fn panel_ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.panels.keys()
    }

    /// Deliver all pending bus events to their panels, one at a time.
    /// Returns the number of deliveries handed to a panel.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(delivery) = self.host.bus.next_delivery() {
            let Some(panel) = self.panels.get_mut(&delivery.subscriber) else {
                tracing::warn!(
                    instance = %delivery.subscriber,
                    callback = %delivery.callback,
                    "Dropping delivery for unknown panel"
                );
                continue;
            };
            if let Err(e) = panel.on_event(delivery.callback, delivery.payload) {
                tracing::warn!(instance = %delivery.subscriber, "Event handling failed: {}", e);
            }
            delivered += 1;
        }
        delivered
    }

    /// Configuration of every panel, as the host would persist it.
    pub fn snapshot_configs(&self) -> Result<BTreeMap<InstanceId, serde_json::Value>> {
        self.panels
            .values()
            .map(|panel| Ok((panel.instance_id().clone(), panel.get_config_value()?)))
            .collect()
    }
}
