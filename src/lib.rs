//! # FGK Risk Review: dashboard panel adapter
//!
//! A visualization panel for a component-based dashboard host. The panel
//! takes a data-source reference and display settings from the host,
//! subscribes to the host event bus for that data source, and hands the
//! source's records to a renderer once they are available.
//!
//! ## Architecture
//!
//! - **Panel**: [`PanelAdapter`] holds configuration and the single
//!   event-bus subscription, and forwards data to its renderer
//! - **Host seams**: [`host::EventSystem`], [`host::DataSourceRegistry`],
//!   [`host::StorageSession`] and [`render::Renderer`] are traits; the host
//!   owns the implementations and hands out shared handles
//! - **Local host**: [`host::LocalHost`] and [`host::Dashboard`] implement
//!   the seams in memory and route deliveries to panels by instance id
//! - **Configuration**: [`PanelConfig`] is the persisted per-instance JSON;
//!   [`PanelSettings`] (TOML) selects tracked fields and subscription style
//!
//! ## Example
//!
//! ```ignore
//! use fgk_riskreview::{
//!     host::{Dashboard, LocalHost},
//!     InstanceId, MountTarget, PanelConfig, PanelSettings,
//! };
//!
//! let mut dashboard = Dashboard::new(LocalHost::new());
//! let panel = dashboard.add_panel(
//!     InstanceId::new("panel-1"),
//!     &MountTarget::new("#panel-1"),
//!     PanelSettings::default(),
//! )?;
//! panel.set_config(PanelConfig::default().with_data_source("DS-1"));
//!
//! dashboard.host().complete_data_source("DS-1", records);
//! dashboard.pump();
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod panel;
pub mod render;
pub mod sample;
pub mod types;

// Re-export commonly used types
pub use config::{BarPart, DataSourceRef, PanelConfig, PanelSettings};
pub use error::{PanelError, Result};
pub use panel::{PanelAdapter, PluginMeta};
pub use types::{DataSourceEvent, DataSourceStatus, InstanceId, MountTarget, RecordSet};
