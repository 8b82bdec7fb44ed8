//! Host collaborator interfaces
//!
//! The panel never owns the event bus, the data-source registry or the
//! storage session; the host hands out shared handles to them. This module
//! defines those handles as traits, plus the [`Host`] trait a panel uses to
//! acquire them at construction.
//!
//! - [`memory`] - in-memory implementations of every collaborator
//! - [`local`] - a local host and dispatch table built on top of them

pub mod local;
pub mod memory;

pub use local::{Dashboard, LocalHost};
pub use memory::{InMemoryDataSourceRegistry, InMemoryEventBus, InMemoryStorage};

use crate::config::DataSourceDefinition;
use crate::error::Result;
use crate::render::Renderer;
use crate::types::{
    DataSourceStatus, EventCallback, InstanceId, MountTarget, RecordSet, Subscription,
};
use std::sync::Arc;

/// Event bus shared by all panels of a dashboard.
#[cfg_attr(test, mockall::automock)]
pub trait EventSystem: Send + Sync {
    /// Make an instance a valid delivery target for the given callbacks.
    fn register_instance(&self, instance: &InstanceId, callbacks: &[EventCallback]) -> Result<()>;

    /// Add a subscription.
    fn subscribe(&self, subscription: &Subscription) -> Result<()>;

    /// Remove a subscription previously added with the same tuple.
    fn unsubscribe(&self, subscription: &Subscription) -> Result<()>;
}

/// Registry of named data sources and their execution status.
#[cfg_attr(test, mockall::automock)]
pub trait DataSourceRegistry: Send + Sync {
    /// Publisher identity the registry's events are sent under.
    fn system_id(&self) -> String;

    /// Current status of a data source, `None` if it is unknown.
    fn status(&self, name: &str) -> Option<DataSourceStatus>;

    /// Define a data source from an inline definition.
    fn create_data_source(&self, definition: &DataSourceDefinition) -> Result<()>;
}

/// Shared storage session holding data-source results.
#[cfg_attr(test, mockall::automock)]
pub trait StorageSession: Send + Sync {
    /// Record set stored for a data source, if any.
    fn get_record(&self, data_source: &str) -> Option<Arc<RecordSet>>;
}

/// Platform a panel is constructed in.
///
/// Each accessor returns `None` when the host cannot provide that
/// collaborator.
pub trait Host {
    fn event_system(&self) -> Option<Arc<dyn EventSystem>>;

    fn data_source_registry(&self) -> Option<Arc<dyn DataSourceRegistry>>;

    fn storage(&self) -> Option<Arc<dyn StorageSession>>;

    /// Create a renderer mounted into `target`.
    fn mount_renderer(&self, target: &MountTarget) -> Option<Box<dyn Renderer>>;
}
