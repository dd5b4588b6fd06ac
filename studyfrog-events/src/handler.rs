//! Handler abstraction and call arguments.

use crate::error::HandlerError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// What a handler returns: a value on success, a [`HandlerError`] otherwise.
pub type HandlerResult = Result<Value, HandlerError>;

/// Arguments passed unchanged to every handler of a dispatch.
///
/// Mirrors a positional list plus a keyword map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Arguments {
    /// No positional and no keyword arguments.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only positional arguments.
    pub fn positional(args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            args: args.into_iter().collect(),
            kwargs: Map::new(),
        }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Deserialize the positional argument at `index`.
    ///
    /// # Errors
    ///
    /// [`HandlerError::InvalidArgument`] if it is missing or has the wrong shape.
    pub fn arg_as<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        let value = self.arg(index).ok_or_else(|| {
            HandlerError::invalid_argument(format!("missing positional argument {}", index))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Deserialize the keyword argument `key`.
    ///
    /// # Errors
    ///
    /// [`HandlerError::InvalidArgument`] if it is missing or has the wrong shape.
    pub fn kwarg_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, HandlerError> {
        let value = self.kwarg(key).ok_or_else(|| {
            HandlerError::invalid_argument(format!("missing keyword argument '{}'", key))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// A function subscribed to an event.
///
/// The name is the key under which the handler's return value is recorded in
/// the notification, so handlers sharing a name overwrite each other's result.
pub trait Handler: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn call(&self, arguments: &Arguments) -> HandlerResult;
}

/// Wraps a closure as a named [`Handler`].
pub struct FnHandler<F> {
    name: String,
    function: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Arguments) -> HandlerResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, function: F) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Arguments) -> HandlerResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, arguments: &Arguments) -> HandlerResult {
        (self.function)(arguments)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

/// Shorthand for [`FnHandler::new`].
///
/// ```rust
/// use studyfrog_events::{handler_fn, Arguments, Handler};
///
/// let pong = handler_fn("pong", |_| Ok("pong".into()));
/// assert_eq!(pong.name(), "pong");
/// assert_eq!(pong.call(&Arguments::none()).unwrap(), "pong");
/// ```
pub fn handler_fn<F>(name: impl Into<String>, function: F) -> FnHandler<F>
where
    F: Fn(&Arguments) -> HandlerResult + Send + Sync + 'static,
{
    FnHandler::new(name, function)
}
