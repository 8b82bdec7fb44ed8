//! Core types shared between the panel adapter and its host.
//!
//! These describe what crosses the adapter boundary: instance identity,
//! records, data-source status notifications and event-bus subscriptions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Event published by the data-source system when a source changes status.
pub const DATA_SOURCE_STATUS_UPDATE: &str = "DataSourceStatusUpdate";

/// Suffix of the per-source event name (`<name>-UPDATE`).
pub const PER_SOURCE_UPDATE_SUFFIX: &str = "-UPDATE";

/// Build the per-source update event name for a data source.
pub fn per_source_event_name(data_source: &str) -> String {
    format!("{}{}", data_source, PER_SOURCE_UPDATE_SUFFIX)
}

/// Identity of a panel instance, assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// UI slot the renderer is mounted into (a selector in the host's layout).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountTarget(String);

impl MountTarget {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn selector(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single row: column name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Ordered rows produced by storage for one data source.
pub type RecordSet = Vec<Record>;

/// Lifecycle status of a data source, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceStatus {
    Pending,
    Running,
    Success,
    Failed,
    /// Any status string this crate does not know about
    #[serde(other)]
    Unknown,
}

impl DataSourceStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DataSourceStatus::Success)
    }
}

impl fmt::Display for DataSourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataSourceStatus::Pending => "pending",
            DataSourceStatus::Running => "running",
            DataSourceStatus::Success => "success",
            DataSourceStatus::Failed => "failed",
            DataSourceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Notification that a data source changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceEvent {
    pub data_source: String,
    pub status: DataSourceStatus,
}

impl DataSourceEvent {
    pub fn new(data_source: impl Into<String>, status: DataSourceStatus) -> Self {
        Self {
            data_source: data_source.into(),
            status,
        }
    }
}

/// Typed callbacks a panel instance can receive from the event bus.
///
/// The string names are only wire labels for hosts that key their
/// dispatch tables by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCallback {
    #[serde(rename = "processDataSourceEvent")]
    ProcessDataSourceEvent,
    #[serde(rename = "loadData")]
    LoadData,
}

impl EventCallback {
    pub const ALL: [EventCallback; 2] = [
        EventCallback::ProcessDataSourceEvent,
        EventCallback::LoadData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventCallback::ProcessDataSourceEvent => "processDataSourceEvent",
            EventCallback::LoadData => "loadData",
        }
    }
}

impl fmt::Display for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload carried by an event-bus delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Status change of a data source
    DataSourceStatus(DataSourceEvent),
    /// Record set delivered directly (per-source update events)
    Records(Arc<RecordSet>),
}

/// Filter registered with a subscription; only matching payloads are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub data_source: String,
    pub status: DataSourceStatus,
}

impl EventFilter {
    /// Filter for "this data source reached success".
    pub fn success_of(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            status: DataSourceStatus::Success,
        }
    }

    /// Whether a payload passes this filter. Record payloads carry no
    /// status, so they never match a status filter.
    pub fn matches(&self, payload: &EventPayload) -> bool {
        match payload {
            EventPayload::DataSourceStatus(event) => {
                event.data_source == self.data_source && event.status == self.status
            }
            EventPayload::Records(_) => false,
        }
    }
}

/// An event-bus subscription held by a panel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub publisher: String,
    pub event: String,
    pub subscriber: InstanceId,
    pub callback: EventCallback,
    pub filter: Option<EventFilter>,
}

impl Subscription {
    /// Name of the data source this subscription is keyed to, if any.
    pub fn data_source(&self) -> Option<&str> {
        if let Some(filter) = &self.filter {
            return Some(filter.data_source.as_str());
        }
        self.event.strip_suffix(PER_SOURCE_UPDATE_SUFFIX)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}.{}",
            self.publisher, self.event, self.subscriber, self.callback
        )
    }
}
