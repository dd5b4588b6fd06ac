//! Per-event subscription registry.
//!
//! One [`EventSubscriptions`] exists per event name. It groups subscriptions
//! by namespace; inside a namespace they are kept in firing order (descending
//! priority, then registration order).
//!
//! ## Locking
//!
//! Namespace buckets sit behind an `RwLock` that is never held while a handler
//! runs: a fan-out takes a snapshot of the bucket, releases the lock, then
//! invokes. Handlers may therefore register, unregister or dispatch from
//! inside a callback. One-shot subscriptions are removed in the same critical
//! section as the snapshot, so each fires at most once.

use crate::error::{DispatchError, DispatchResult, HandlerError};
use crate::event::Event;
use crate::handler::{Arguments, Handler, HandlerResult};
use crate::notification::{NO_LISTENERS_KEY, NotificationBuilder};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use studyfrog_log::{debug, error, info, warn};
use uuid::Uuid;

const TARGET: &str = "studyfrog::subscription";

/// How a handler is subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Keep listening after firing; `false` means one-shot.
    pub persistent: bool,
    /// Higher fires first; equal priorities keep registration order.
    pub priority: i32,
}

impl SubscribeOptions {
    /// Fires on every dispatch until unregistered.
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            priority: 0,
        }
    }

    /// Fires once, then removes itself.
    pub fn once() -> Self {
        Self {
            persistent: false,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl From<bool> for SubscribeOptions {
    fn from(persistent: bool) -> Self {
        if persistent {
            Self::persistent()
        } else {
            Self::once()
        }
    }
}

/// A registered handler.
#[derive(Clone)]
pub struct Subscription {
    uuid: Uuid,
    handler: Arc<dyn Handler>,
    persistent: bool,
    priority: i32,
}

impl Subscription {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn name(&self) -> &str {
        self.handler.name()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("uuid", &self.uuid)
            .field("handler", &self.handler.name())
            .field("persistent", &self.persistent)
            .field("priority", &self.priority)
            .finish()
    }
}

type Buckets = HashMap<String, Vec<Subscription>>;

/// All subscriptions of one event, grouped by namespace.
pub struct EventSubscriptions {
    id: u64,
    event: Event,
    enable_logging: bool,
    namespaces: RwLock<Buckets>,
}

impl EventSubscriptions {
    pub fn new(id: u64, event: Event, enable_logging: bool) -> Self {
        Self {
            id,
            event,
            enable_logging,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The event this registry was created for.
    pub fn event(&self) -> &Event {
        &self.event
    }

    fn read(&self) -> DispatchResult<RwLockReadGuard<'_, Buckets>> {
        self.namespaces
            .read()
            .map_err(|_| DispatchError::RegistryPoisoned(self.event.name().to_string()))
    }

    fn write(&self) -> DispatchResult<RwLockWriteGuard<'_, Buckets>> {
        self.namespaces
            .write()
            .map_err(|_| DispatchError::RegistryPoisoned(self.event.name().to_string()))
    }

    /// Subscribe `handler` under `namespace`, creating the bucket if needed.
    pub fn add_subscription(
        &self,
        handler: Arc<dyn Handler>,
        namespace: &str,
        options: SubscribeOptions,
    ) -> DispatchResult<Uuid> {
        let subscription = Subscription {
            uuid: Uuid::new_v4(),
            handler,
            persistent: options.persistent,
            priority: options.priority,
        };
        let uuid = subscription.uuid;

        let mut buckets = self.write()?;
        let bucket = buckets.entry(namespace.to_string()).or_default();
        let position = bucket
            .iter()
            .position(|existing| existing.priority < subscription.priority)
            .unwrap_or(bucket.len());
        bucket.insert(position, subscription);

        Ok(uuid)
    }

    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.read()
            .map(|buckets| buckets.contains_key(namespace))
            .unwrap_or(false)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.read()
            .map(|buckets| buckets.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscription_count(&self, namespace: &str) -> usize {
        self.read()
            .map(|buckets| buckets.get(namespace).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.read().map(|buckets| buckets.is_empty()).unwrap_or(true)
    }

    /// Snapshot the subscriptions of `namespace` in firing order and remove the
    /// one-shot ones from the registry.
    pub fn claim(&self, namespace: &str) -> DispatchResult<Vec<Subscription>> {
        let mut buckets = self.write()?;
        let Some(bucket) = buckets.get_mut(namespace) else {
            return Ok(Vec::new());
        };

        let snapshot = bucket.clone();
        bucket.retain(|subscription| subscription.persistent);
        if bucket.is_empty() {
            buckets.remove(namespace);
        }

        Ok(snapshot)
    }

    /// Invoke every subscription of `namespace` and record the outcomes.
    ///
    /// An empty namespace records the single `("NaN", null)` result. A failing
    /// or panicking handler records a null result plus an error entry; the
    /// remaining handlers still run.
    pub fn notify_subscriptions(
        &self,
        builder: &mut NotificationBuilder,
        namespace: &str,
        arguments: &Arguments,
    ) -> DispatchResult<()> {
        let subscriptions = self.claim(namespace)?;

        if subscriptions.is_empty() {
            if self.enable_logging {
                debug!(
                    target: TARGET,
                    "No subscriptions for '{}' in namespace '{}'",
                    self.event.name(), namespace
                );
            }
            builder.result(NO_LISTENERS_KEY, Value::Null);
            return Ok(());
        }

        for subscription in &subscriptions {
            if self.enable_logging {
                debug!(
                    target: TARGET,
                    "Calling '{}' for '{}' in namespace '{}' with {} args and {} kwargs",
                    subscription.name(),
                    self.event.name(),
                    namespace,
                    arguments.args.len(),
                    arguments.kwargs.len()
                );
            }
            let outcome = invoke(subscription.handler.as_ref(), arguments);
            record_outcome(builder, subscription, outcome);
        }

        Ok(())
    }

    /// Remove the subscription `uuid` from whichever namespace holds it.
    pub fn remove_subscription(&self, uuid: Uuid) -> DispatchResult<bool> {
        let mut buckets = self.write()?;

        let found = buckets.iter_mut().find_map(|(namespace, bucket)| {
            let index = bucket.iter().position(|s| s.uuid == uuid)?;
            bucket.remove(index);
            Some((namespace.clone(), bucket.is_empty()))
        });

        match found {
            Some((namespace, emptied)) => {
                if emptied {
                    buckets.remove(&namespace);
                }
                if self.enable_logging {
                    info!(
                        target: TARGET,
                        "Removed subscription {} from '{}' in namespace '{}'",
                        uuid, self.event.name(), namespace
                    );
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the whole `namespace` bucket.
    pub fn remove_namespace(&self, namespace: &str) -> DispatchResult<bool> {
        Ok(self.write()?.remove(namespace).is_some())
    }
}

impl fmt::Debug for EventSubscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscriptions")
            .field("id", &self.id)
            .field("event", &self.event.name())
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

/// Call a handler, turning a panic into [`HandlerError::Panicked`].
pub(crate) fn invoke(handler: &dyn Handler, arguments: &Arguments) -> HandlerResult {
    panic::catch_unwind(AssertUnwindSafe(|| handler.call(arguments)))
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))))
}

/// Record one handler outcome on the builder.
pub(crate) fn record_outcome(
    builder: &mut NotificationBuilder,
    subscription: &Subscription,
    outcome: HandlerResult,
) {
    let name = subscription.name();
    match outcome {
        Ok(value) => {
            builder.result(name, value);
        }
        Err(err) => {
            error!(
                target: TARGET,
                "Handler '{}' ({}) failed: {}",
                name, subscription.uuid, err
            );
            let traceback = format!("{} in handler '{}': {}", err.as_label(), name, err);
            builder.result(name, Value::Null).errors(err, name, traceback);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        warn!(target: TARGET, "Panic payload of unknown type");
        "unknown panic payload".to_string()
    }
}
