//! Event definitions and the event factory.

use crate::error::{DispatchError, DispatchResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use studyfrog_log::{debug, error};
use uuid::Uuid;

/// First id handed out by every id sequence unless configured otherwise.
pub const DEFAULT_BASE_ID: u64 = 10_000;

/// Monotonically increasing id source.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    /// Sequence whose first [`next`](Self::next) returns `base`.
    pub const fn starting_at(base: u64) -> Self {
        Self {
            next: AtomicU64::new(base),
        }
    }

    /// Take the next id.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(DEFAULT_BASE_ID)
    }
}

/// Immutable descriptor of a kind of occurrence.
///
/// `name` is the only dispatch key: two events with the same name but
/// different ids reach the same subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: u64,
    name: String,
    uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Event {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Payload attached at creation, unused by dispatch.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Copy of this event carrying `data`; identity (id, name, uuid) is kept.
    pub fn with_data(&self, data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..self.clone()
        }
    }

    /// True if both events share id, name and uuid.
    pub fn compare_to(&self, other: &Event) -> bool {
        self.id == other.id && self.name == other.name && self.uuid == other.uuid
    }

    /// True if both events reach the same subscribers.
    pub fn same_target(&self, other: &Event) -> bool {
        self.name == other.name
    }
}

impl AsRef<str> for Event {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// Creates events with ids drawn from its own sequence.
#[derive(Debug, Default)]
pub struct EventFactory {
    ids: IdSequence,
}

static GLOBAL_FACTORY: Lazy<EventFactory> = Lazy::new(EventFactory::default);

impl EventFactory {
    /// Factory whose first event gets `base_id`.
    pub fn new(base_id: u64) -> Self {
        Self {
            ids: IdSequence::starting_at(base_id),
        }
    }

    /// The process-wide factory used by [`create_event`].
    pub fn global() -> &'static EventFactory {
        &GLOBAL_FACTORY
    }

    /// Create a new event named `name`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidEventName`] if the name is empty or blank. No
    /// id is consumed in that case.
    pub fn create_event(&self, name: impl Into<String>) -> DispatchResult<Event> {
        let name = name.into();
        if name.trim().is_empty() {
            error!(target: "studyfrog::event", "Refusing to create an event with a blank name");
            return Err(DispatchError::InvalidEventName(name));
        }
        Ok(self.build(name))
    }

    /// Create an event whose name is known to be valid at compile time.
    pub(crate) fn create_known(&self, name: &'static str) -> Event {
        debug_assert!(!name.trim().is_empty(), "catalog event names are never blank");
        self.build(name.to_string())
    }

    fn build(&self, name: String) -> Event {
        let event = Event {
            id: self.ids.next(),
            name,
            uuid: Uuid::new_v4(),
            data: None,
        };
        debug!(target: "studyfrog::event", "Created event {}", event);
        event
    }
}

/// Create an event through the process-wide [`EventFactory`].
pub fn create_event(name: impl Into<String>) -> DispatchResult<Event> {
    EventFactory::global().create_event(name)
}
