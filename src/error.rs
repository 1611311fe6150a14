//! # Error Types
//!
//! Structured error handling for the dispatch core.
//!
//! The taxonomy separates failures that should stop the caller
//! (configuration mistakes, circular resolution, handler failures) from
//! outcomes the dispatcher recovers from locally. A missing dependency is
//! never an error inside the dispatcher: the binding is skipped and the
//! next candidate is tried. Only the outer API surfaces `NotHandled` once
//! no candidate in the whole chain accepted the callback.
//!
//! `DispatchError` is `Clone` so it can travel through shared pending
//! results (`futures::future::Shared` requires a clonable output).

use crate::types::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Invalid policy, malformed parameter, missing constructor argument
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No binding anywhere in the handler chain accepted the callback
    #[error("Not handled: {description}")]
    NotHandled {
        description: String,
        request: Option<Value>,
    },

    /// A dependency settled to nothing after the binding was already committed
    #[error("Dependency unavailable: {key}")]
    DependencyUnavailable { key: String },

    /// A callback would re-enter its own in-progress resolution
    #[error("Circular resolution detected for {key} (depth {depth})")]
    CircularResolution { key: String, depth: usize },

    /// A handler method or filter stage failed
    #[error("Handler failed: {0}")]
    Handler(Arc<anyhow::Error>),

    /// Attempt to remove a binding that is not present in its index
    #[error("Binding '{binding}' is not present in the {policy} index")]
    BindingNotIndexed { binding: String, policy: String },

    /// Configuration source could not be loaded or deserialized
    #[error("Config error: {0}")]
    Config(String),
}

impl DispatchError {
    /// Wrap any handler-side failure
    pub fn handler(error: impl Into<anyhow::Error>) -> Self {
        DispatchError::Handler(Arc::new(error.into()))
    }

    /// Build a `NotHandled` error that carries the original request
    pub fn not_handled(description: impl Into<String>, request: Option<Value>) -> Self {
        DispatchError::NotHandled {
            description: description.into(),
            request,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        DispatchError::Configuration(message.into())
    }

    /// True when the error means "no handler accepted the callback"
    pub fn is_not_handled(&self) -> bool {
        matches!(self, DispatchError::NotHandled { .. })
    }

    /// True when the error was raised by the circularity guard
    pub fn is_circular(&self) -> bool {
        matches!(self, DispatchError::CircularResolution { .. })
    }

    /// The request carried by a `NotHandled` error, if any
    pub fn request(&self) -> Option<&Value> {
        match self {
            DispatchError::NotHandled { request, .. } => request.as_ref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for DispatchError {
    fn from(error: config::ConfigError) -> Self {
        DispatchError::Config(error.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(error: serde_json::Error) -> Self {
        DispatchError::Configuration(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_keeps_message() {
        let error = DispatchError::handler(anyhow::anyhow!("Stock Exchange is down"));
        assert!(error.to_string().contains("Stock Exchange is down"));
        assert!(!error.is_not_handled());
    }

    #[test]
    fn test_not_handled_carries_request() {
        let error = DispatchError::not_handled("Command | Ping", Some(Value::new(42_u32)));
        assert!(error.is_not_handled());
        assert_eq!(error.request().and_then(|v| v.downcast_ref::<u32>()), Some(&42));
    }

    #[test]
    fn test_errors_are_clonable() {
        let error = DispatchError::CircularResolution {
            key: "Repository".to_string(),
            depth: 3,
        };
        let cloned = error.clone();
        assert!(cloned.is_circular());
        assert_eq!(error.to_string(), cloned.to_string());
    }
}
