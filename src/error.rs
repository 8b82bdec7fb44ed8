//! Error handling for the FGK Risk Review panel
//!
//! This module defines the panel error type and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for panel operations
#[derive(Error, Debug)]
pub enum PanelError {
    /// A host collaborator could not be acquired at construction time
    #[error("Dependency unavailable: {dependency}")]
    DependencyUnavailable { dependency: &'static str },

    /// Errors reported by the event bus (subscribe/unsubscribe)
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Errors reported by the data-source registry
    #[error("Registry error: {0}")]
    Registry(String),

    /// An event payload did not match the callback it was delivered to
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Errors related to settings loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PanelError>,
    },
}

impl PanelError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PanelError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a missing host dependency
    pub fn unavailable(dependency: &'static str) -> Self {
        PanelError::DependencyUnavailable { dependency }
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::Serialization(err.to_string())
    }
}

/// Result type alias for panel operations
pub type Result<T> = std::result::Result<T, PanelError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
