//! FGK Risk Review panel adapter
//!
//! [`PanelAdapter`] is the whole panel: it takes configuration from the host,
//! keeps one event-bus subscription for its data source, and forwards the
//! data source's records to its renderer when they become available.
//!
//! # Subscription lifecycle
//!
//! ```text
//! Unsubscribed --set_config{dataSource: a}--> Subscribed(a)
//! Subscribed(a) --set_config{dataSource: b}--> unsubscribe(a), Subscribed(b)
//! ```
//!
//! An adapter never holds more than one subscription. A failed unsubscribe
//! is logged and the new subscription still goes ahead. A failed subscribe
//! leaves the adapter unsubscribed.

use crate::config::{
    BarPart, DataSourceRef, PanelConfig, PanelSettings, PublisherResolution, SubscriptionStyle,
};
use crate::error::{PanelError, Result};
use crate::host::{DataSourceRegistry, EventSystem, Host, StorageSession};
use crate::render::Renderer;
use crate::types::{
    per_source_event_name, DataSourceEvent, EventCallback, EventFilter, EventPayload, InstanceId,
    MountTarget, RecordSet, Subscription, DATA_SOURCE_STATUS_UPDATE,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::Span;

/// Registration name of the panel
pub const PLUGIN_NAME: &str = "VisualizationFGKRiskReview";

/// Registration metadata a host reads before creating instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMeta {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: &'static str,
}

static PLUGIN_META: PluginMeta = PluginMeta {
    name: PLUGIN_NAME,
    title: "FGK Risk Review",
    kind: "panel",
    version: env!("CARGO_PKG_VERSION"),
};

/// Subscription state of one adapter.
#[derive(Debug, Clone, PartialEq)]
enum SubscriptionState {
    Unsubscribed,
    Subscribed(Subscription),
}

/// A mounted FGK Risk Review panel.
pub struct PanelAdapter {
    instance_id: InstanceId,
    span: Span,
    settings: PanelSettings,

    event_system: Arc<dyn EventSystem>,
    registry: Arc<dyn DataSourceRegistry>,
    storage: Arc<dyn StorageSession>,
    renderer: Box<dyn Renderer>,

    /// Registry identity captured at construction
    publisher_id: String,
    subscription: SubscriptionState,

    data_source: Option<DataSourceRef>,
    title_col_name: Option<String>,
    /// Only set when configured explicitly; the defaults are not reported back
    bar_parts: Option<Vec<BarPart>>,
}

impl std::fmt::Debug for PanelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelAdapter")
            .field("instance_id", &self.instance_id)
            .field("publisher_id", &self.publisher_id)
            .field("subscription", &self.subscription)
            .field("data_source", &self.data_source)
            .field("title_col_name", &self.title_col_name)
            .field("bar_parts", &self.bar_parts)
            .finish_non_exhaustive()
    }
}

impl PanelAdapter {
    /// Registration metadata for this panel type.
    pub fn registration_meta() -> &'static PluginMeta {
        &PLUGIN_META
    }

    /// Acquire host collaborators, register as an event target and mount the
    /// renderer into `mount_target`.
    ///
    /// Fails with [`PanelError::DependencyUnavailable`] if the host cannot
    /// provide any of them.
    pub fn new(
        host: &dyn Host,
        instance_id: InstanceId,
        mount_target: &MountTarget,
        settings: PanelSettings,
    ) -> Result<Self> {
        let span = tracing::info_span!("panel", instance = %instance_id, plugin = PLUGIN_NAME);
        let _enter = span.enter();

        let event_system = host
            .event_system()
            .ok_or_else(|| PanelError::unavailable("event system"))?;
        let registry = host
            .data_source_registry()
            .ok_or_else(|| PanelError::unavailable("data source registry"))?;
        let storage = host
            .storage()
            .ok_or_else(|| PanelError::unavailable("storage"))?;

        event_system.register_instance(&instance_id, &EventCallback::ALL)?;
        let publisher_id = registry.system_id();

        let mut renderer = host
            .mount_renderer(mount_target)
            .ok_or_else(|| PanelError::unavailable("renderer"))?;
        renderer.set_bar_parts(&settings.initial_bar_parts());

        tracing::info!(mount = %mount_target, publisher = %publisher_id, "Panel mounted");
        drop(_enter);

        Ok(Self {
            instance_id,
            span,
            settings,
            event_system,
            registry,
            storage,
            renderer,
            publisher_id,
            subscription: SubscriptionState::Unsubscribed,
            data_source: None,
            title_col_name: None,
            bar_parts: None,
        })
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// The active subscription, if any.
    pub fn subscription(&self) -> Option<&Subscription> {
        match &self.subscription {
            SubscriptionState::Unsubscribed => None,
            SubscriptionState::Subscribed(subscription) => Some(subscription),
        }
    }

    /// Bar parts currently in effect, falling back to the defaults.
    pub fn effective_bar_parts(&self) -> Vec<BarPart> {
        self.bar_parts
            .clone()
            .unwrap_or_else(|| self.settings.initial_bar_parts())
    }

    /// Apply a configuration. Each present field is applied on its own;
    /// absent fields keep their current value.
    pub fn set_config(&mut self, config: PanelConfig) {
        let span = self.span.clone();
        let _enter = span.enter();

        let config = config.normalized().restricted_to(&self.settings.schema);

        if let Some(column) = config.title_col_name {
            self.renderer.set_title_column(&column);
            self.title_col_name = Some(column);
        }

        if let Some(parts) = config.bar_parts {
            self.renderer.set_bar_parts(&parts);
            self.bar_parts = Some(parts);
        }

        if let Some(data_source) = config.data_source {
            self.set_data_source(data_source);
        }
    }

    /// Apply configuration JSON from the host, skipping malformed fields.
    pub fn set_config_value(&mut self, value: &serde_json::Value) {
        self.set_config(PanelConfig::from_value_lenient(value));
    }

    /// Configuration holding only the fields that were set explicitly.
    pub fn get_config(&self) -> PanelConfig {
        PanelConfig {
            data_source: self.data_source.clone(),
            title_col_name: self.title_col_name.clone(),
            bar_parts: self.bar_parts.clone(),
        }
    }

    /// [`get_config`](Self::get_config) as the JSON object the host persists.
    pub fn get_config_value(&self) -> Result<serde_json::Value> {
        self.get_config().to_value()
    }

    /// Typed entry point for event-bus deliveries.
    pub fn on_event(&mut self, callback: EventCallback, payload: EventPayload) -> Result<()> {
        match (callback, payload) {
            (EventCallback::ProcessDataSourceEvent, EventPayload::DataSourceStatus(event)) => {
                self.on_data_source_event(event);
                Ok(())
            }
            (EventCallback::LoadData, EventPayload::Records(records)) => {
                let span = self.span.clone();
                let _enter = span.enter();
                self.load_data(records);
                Ok(())
            }
            (callback, payload) => Err(PanelError::Dispatch(format!(
                "callback {} cannot take a {} payload",
                callback,
                match payload {
                    EventPayload::DataSourceStatus(_) => "status",
                    EventPayload::Records(_) => "records",
                }
            ))),
        }
    }

    /// React to a data source reaching `success`: fetch its records and render.
    ///
    /// The subscription filter already restricts which events arrive here, so
    /// the status is not checked again.
    pub fn on_data_source_event(&mut self, event: DataSourceEvent) {
        let span = self.span.clone();
        let _enter = span.enter();

        tracing::debug!(
            data_source = %event.data_source,
            status = %event.status,
            "Data source event"
        );
        if self.data_source.as_ref().map(DataSourceRef::name) != Some(event.data_source.as_str()) {
            self.data_source = Some(DataSourceRef::Name(event.data_source.clone()));
        }
        self.fetch_and_render(&event.data_source);
    }

    /// Push records to the renderer and render.
    pub fn load_data(&mut self, records: Arc<RecordSet>) {
        tracing::debug!(rows = records.len(), "Loading data");
        self.renderer.set_dataset(records);
        self.renderer.render();
    }

    fn set_data_source(&mut self, data_source: DataSourceRef) {
        let name = data_source.name().to_string();

        if let Some(definition) = data_source.definition() {
            if let Err(e) = self.registry.create_data_source(definition) {
                tracing::warn!(data_source = %name, "Failed to create data source: {}", e);
            }
        }

        let subscription = self.subscription_for(&name);

        let previous = std::mem::replace(&mut self.subscription, SubscriptionState::Unsubscribed);
        if let SubscriptionState::Subscribed(old) = previous {
            if let Err(e) = self.event_system.unsubscribe(&old) {
                tracing::warn!(subscription = %old, "Failed to unsubscribe: {}", e);
            }
        }

        match self.event_system.subscribe(&subscription) {
            Ok(()) => {
                tracing::debug!(%subscription, "Subscribed to data source");
                self.subscription = SubscriptionState::Subscribed(subscription);
            }
            Err(e) => {
                tracing::error!(%subscription, "Failed to subscribe: {}", e);
            }
        }

        self.data_source = Some(data_source);

        if self.registry.status(&name).is_some_and(|s| s.is_success()) {
            self.fetch_and_render(&name);
        }
    }

    fn subscription_for(&self, data_source: &str) -> Subscription {
        let publisher = self.resolve_publisher();
        match self.settings.subscription {
            SubscriptionStyle::StatusUpdate => Subscription {
                publisher,
                event: DATA_SOURCE_STATUS_UPDATE.to_string(),
                subscriber: self.instance_id.clone(),
                callback: EventCallback::ProcessDataSourceEvent,
                filter: Some(EventFilter::success_of(data_source)),
            },
            SubscriptionStyle::PerSourceUpdate => Subscription {
                publisher,
                event: per_source_event_name(data_source),
                subscriber: self.instance_id.clone(),
                callback: EventCallback::LoadData,
                filter: None,
            },
        }
    }

    /// Publisher identity for a new subscription. Both modes compare the
    /// cached identity with the registry's current one and warn on drift.
    fn resolve_publisher(&self) -> String {
        let live = self.registry.system_id();
        if live != self.publisher_id {
            tracing::warn!(
                cached = %self.publisher_id,
                live = %live,
                "Data source system identity changed since construction"
            );
        }
        match self.settings.publisher_resolution {
            PublisherResolution::Cached => self.publisher_id.clone(),
            PublisherResolution::ResolveEachCall => live,
        }
    }

    fn fetch_and_render(&mut self, data_source: &str) {
        match self.storage.get_record(data_source) {
            Some(records) => self.load_data(records),
            None => {
                tracing::warn!(data_source, "No records in storage for data source");
            }
        }
    }
}
