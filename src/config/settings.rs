//! Adapter settings for a panel deployment
//!
//! These settings decide how one adapter build behaves, as opposed to
//! [`PanelConfig`](super::PanelConfig), which the host sets per instance.
//!
//! # Main Types
//!
//! - [`PanelSettings`] - Top-level settings, loaded from TOML
//! - [`FieldSchema`] - Which optional configuration fields are tracked
//! - [`SubscriptionStyle`] - Which event the adapter listens to
//! - [`PublisherResolution`] - How the data-source system identity is obtained
//!
//! # Example
//!
//! ```toml
//! subscription = "status_update"
//! publisher_resolution = "cached"
//!
//! [schema]
//! title_column = true
//! bar_parts = false
//! ```

use super::BarPart;
use crate::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the settings directory
pub const APP_ID: &str = "dev.fgk.riskreview";

/// Settings filename
pub const SETTINGS_FILE: &str = "panel.toml";

/// Default settings location under the platform config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(SETTINGS_FILE))
}

/// Optional configuration fields an adapter tracks.
///
/// The data source is always tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default = "default_true")]
    pub title_column: bool,
    #[serde(default = "default_true")]
    pub bar_parts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::full()
    }
}

impl FieldSchema {
    pub fn full() -> Self {
        Self {
            title_column: true,
            bar_parts: true,
        }
    }

    pub fn data_source_only() -> Self {
        Self {
            title_column: false,
            bar_parts: false,
        }
    }
}

/// Event the adapter subscribes to for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStyle {
    /// `DataSourceStatusUpdate`, filtered on `{dataSource, status: success}`
    #[default]
    StatusUpdate,
    /// `<name>-UPDATE`, unfiltered, delivering the records directly
    PerSourceUpdate,
}

/// How the publisher identity of the data-source system is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherResolution {
    /// Captured once at construction
    #[default]
    Cached,
    /// Asked from the registry on every subscription
    ResolveEachCall,
}

/// Per-deployment adapter settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PanelSettings {
    #[serde(default)]
    pub subscription: SubscriptionStyle,

    #[serde(default)]
    pub publisher_resolution: PublisherResolution,

    #[serde(default)]
    pub schema: FieldSchema,

    /// Replaces the built-in default bar parts when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_bar_parts: Option<Vec<BarPart>>,
}

impl PanelSettings {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PanelError::Config(format!("Failed to read settings file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PanelError::Config(format!("Failed to parse settings file {:?}: {}", path, e))
        })
    }

    /// Load settings, returning defaults if the file is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PanelError::Config(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            PanelError::Serialization(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            PanelError::Config(format!("Failed to write settings file {:?}: {}", path, e))
        })
    }

    /// Bar parts the adapter starts with
    pub fn initial_bar_parts(&self) -> Vec<BarPart> {
        self.default_bar_parts
            .clone()
            .unwrap_or_else(super::default_bar_parts)
    }
}
