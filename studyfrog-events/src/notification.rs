//! Dispatch outcome records.
//!
//! A [`Notification`] is produced by every dispatch: timing, one result per
//! invoked handler (keyed by handler name), and the errors and warnings
//! collected on the way. It is assembled through a [`NotificationBuilder`]
//! whose required fields are supplied up front, so building never fails.

use crate::error::{DispatchError, DispatchResult, HandlerError};
use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use studyfrog_log::{error, warn};

/// Result key recorded when nobody was listening.
pub const NO_LISTENERS_KEY: &str = "NaN";

/// One handler failure captured during a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerFailure {
    /// Name of the handler that failed.
    pub function: String,
    pub error: HandlerError,
    /// Error chain or panic location, as text.
    pub traceback: String,
}

/// Immutable outcome of one dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    id: u64,
    event: Event,
    namespace: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration: f64,
    result: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<HandlerFailure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<Value>>,
}

impl Notification {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Seconds between start and end.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// `end - start` as a chrono duration.
    pub fn elapsed(&self) -> chrono::TimeDelta {
        self.end - self.start
    }

    /// The raw result map, handler name to return value.
    pub fn results(&self) -> &Map<String, Value> {
        &self.result
    }

    /// All recorded values, in insertion order.
    pub fn get_all_results(&self) -> Vec<&Value> {
        self.result.values().collect()
    }

    /// The single result of a dispatch that reached exactly one handler.
    ///
    /// A one-element array is unwrapped to its element. Returns `None` when the
    /// map is empty, when the only value is null (including the no-listener
    /// sentinel), and when there is more than one result; the latter is a
    /// contract violation and is logged as an error. Use
    /// [`try_one_and_only_result`](Self::try_one_and_only_result) to tell
    /// these cases apart.
    pub fn get_one_and_only_result(&self) -> Option<&Value> {
        match self.try_one_and_only_result() {
            Ok(value) => value,
            Err(err) => {
                error!(
                    target: "studyfrog::notification",
                    "Notification #{} for '{}' in '{}': {}",
                    self.id, self.event.name(), self.namespace, err
                );
                None
            }
        }
    }

    /// Like [`get_one_and_only_result`](Self::get_one_and_only_result), but
    /// reports several results as [`DispatchError::AmbiguousResult`].
    pub fn try_one_and_only_result(&self) -> DispatchResult<Option<&Value>> {
        match self.result.len() {
            0 => Ok(None),
            1 => Ok(self.result.values().next().and_then(unwrap_single)),
            n => Err(DispatchError::AmbiguousResult(n)),
        }
    }

    /// Value recorded for `key`; logs a warning if the key is absent.
    ///
    /// A null value (a handler that returned nothing or failed) reads as `None`.
    pub fn get_result_by_key(&self, key: &str) -> Option<&Value> {
        match self.result.get(key) {
            Some(value) => non_null(value),
            None => {
                warn!(
                    target: "studyfrog::notification",
                    "Key '{}' not found in result of notification #{} ('{}')",
                    key, self.id, self.event.name()
                );
                None
            }
        }
    }

    /// Whether a result was recorded under `key`, null or not.
    pub fn has(&self, key: &str) -> bool {
        self.result.contains_key(key)
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings.as_ref().is_some_and(|w| !w.is_empty())
    }

    /// Errors or warnings present.
    pub fn has_irregularities(&self) -> bool {
        self.has_errors() || self.has_warnings()
    }

    /// No result entries at all (not even the no-listener sentinel).
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// True if the only entry is the no-listener sentinel.
    pub fn is_unheard(&self) -> bool {
        self.result.len() == 1 && self.result.contains_key(NO_LISTENERS_KEY)
    }

    pub fn get_errors(&self) -> &[HandlerFailure] {
        self.errors.as_deref().unwrap_or_default()
    }

    pub fn get_warnings(&self) -> &[Value] {
        self.warnings.as_deref().unwrap_or_default()
    }

    /// Compact JSON description for logs and toasts.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "event": self.event.name(),
            "namespace": self.namespace,
            "duration": self.duration,
            "results": self.result.keys().collect::<Vec<_>>(),
            "errors": self.get_errors().len(),
            "warnings": self.get_warnings().len(),
        })
    }
}

fn non_null(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

fn unwrap_single(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) if items.len() == 1 => non_null(&items[0]),
        other => non_null(other),
    }
}

/// Accumulates a [`Notification`] during a dispatch.
///
/// Setters take `&mut self` so the builder can be threaded through the
/// fan-out and still be finished if the fan-out is cut short. Values are
/// normalised as they are set: `end` never precedes `start`, `duration` is
/// never negative and follows the latest `start`/`end`.
#[derive(Debug)]
pub struct NotificationBuilder {
    id: u64,
    event: Event,
    namespace: String,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    duration: Option<f64>,
    result: Map<String, Value>,
    errors: Option<Vec<HandlerFailure>>,
    warnings: Option<Vec<Value>>,
}

impl NotificationBuilder {
    /// Start a notification now.
    pub fn new(id: u64, event: Event, namespace: impl Into<String>) -> Self {
        Self {
            id,
            event,
            namespace: namespace.into(),
            start: Utc::now(),
            end: None,
            duration: None,
            result: Map::new(),
            errors: None,
            warnings: None,
        }
    }

    pub fn event(&mut self, value: Event) -> &mut Self {
        self.event = value;
        self
    }

    pub fn namespace(&mut self, value: impl Into<String>) -> &mut Self {
        self.namespace = value.into();
        self
    }

    /// Override the start time; a previously set end is pulled forward to it.
    pub fn start(&mut self, value: DateTime<Utc>) -> &mut Self {
        self.start = value;
        if let Some(end) = self.end {
            self.end = Some(end.max(value));
        }
        self.retime();
        self
    }

    pub fn end(&mut self, value: DateTime<Utc>) -> &mut Self {
        self.end = Some(value.max(self.start));
        self.retime();
        self
    }

    /// Override the duration until the next `start`/`end` change.
    pub fn duration(&mut self, value: f64) -> &mut Self {
        self.duration = Some(if value.is_finite() { value.max(0.0) } else { 0.0 });
        self
    }

    /// Upsert a result; an existing key keeps its position.
    pub fn result(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.result.insert(key.into(), value);
        self
    }

    /// Append a handler failure.
    pub fn errors(
        &mut self,
        error: HandlerError,
        function: impl Into<String>,
        traceback: impl Into<String>,
    ) -> &mut Self {
        self.errors.get_or_insert_with(Vec::new).push(HandlerFailure {
            function: function.into(),
            error,
            traceback: traceback.into(),
        });
        self
    }

    /// Append a free-form warning record.
    pub fn warnings(&mut self, value: Value) -> &mut Self {
        self.warnings.get_or_insert_with(Vec::new).push(value);
        self
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn result_count(&self) -> usize {
        self.result.len()
    }

    /// Stamp `end = now` and `duration = end - start`.
    pub fn finish(&mut self) -> &mut Self {
        let end = Utc::now().max(self.start);
        self.end = Some(end);
        self.duration = Some(seconds_between(self.start, end));
        self
    }

    // Moving either bound invalidates an explicit duration.
    fn retime(&mut self) {
        self.duration = self.end.map(|end| seconds_between(self.start, end));
    }

    /// Materialise the notification.
    ///
    /// A missing end is taken as now and a missing duration is derived from
    /// start and end.
    pub fn build(self) -> Notification {
        let end = self.end.unwrap_or_else(|| Utc::now().max(self.start));
        let duration = self
            .duration
            .unwrap_or_else(|| seconds_between(self.start, end));

        Notification {
            id: self.id,
            event: self.event,
            namespace: self.namespace,
            start: self.start,
            end,
            duration,
            result: self.result,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start)
        .to_std()
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}
