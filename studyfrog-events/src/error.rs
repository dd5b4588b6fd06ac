//! Error types for dispatcher operations.

use serde::Serialize;
use studyfrog_config::ConfigError;
use thiserror::Error;

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors raised by the dispatcher itself.
///
/// None of these ever escape [`Dispatcher::dispatch`](crate::Dispatcher::dispatch);
/// they are returned by registration, factory and configuration calls.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Event names are dispatch keys and must contain visible characters.
    #[error("Invalid event name: {0:?}")]
    InvalidEventName(String),

    /// Namespaces must contain visible characters.
    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// `unregister` was called without an event, a namespace or a uuid.
    #[error("At least one of event, namespace and uuid must be specified")]
    MissingUnregisterTarget,

    /// A registry lock was poisoned by a panic while it was held.
    #[error("Subscription registry for '{0}' is poisoned")]
    RegistryPoisoned(String),

    /// A single result was requested from a notification holding several.
    #[error("Expected exactly one result, found {0}")]
    AmbiguousResult(usize),

    /// Dispatcher configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::InvalidEventName(_) => "invalid_event_name",
            DispatchError::InvalidNamespace(_) => "invalid_namespace",
            DispatchError::MissingUnregisterTarget => "missing_unregister_target",
            DispatchError::RegistryPoisoned(_) => "registry_poisoned",
            DispatchError::AmbiguousResult(_) => "ambiguous_result",
            DispatchError::Config(_) => "config",
        }
    }
}

/// Errors produced by a subscribed handler.
///
/// Recorded per handler in the notification; never aborts a fan-out.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// The handler could not interpret its arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The handler panicked; the payload message is kept.
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// Shorthand for [`HandlerError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        HandlerError::InvalidArgument(message.into())
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed(_) => "handler_failed",
            HandlerError::InvalidArgument(_) => "invalid_argument",
            HandlerError::Panicked(_) => "handler_panicked",
        }
    }

    /// Builds a handler error from any error, keeping its source chain in the message.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        HandlerError::Failed(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::InvalidArgument(err.to_string())
    }
}
