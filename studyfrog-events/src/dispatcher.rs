//! Namespaced dispatcher

use crate::error::{DispatchError, DispatchResult, HandlerError};
use crate::event::{DEFAULT_BASE_ID, Event, IdSequence};
use crate::handler::{Arguments, Handler};
use crate::notification::{NO_LISTENERS_KEY, Notification, NotificationBuilder};
use crate::subscription::{
    EventSubscriptions, SubscribeOptions, invoke, panic_message, record_outcome,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use studyfrog_config::{ConfigBuilder, ConfigManager, ConfigValidator, Validate};
use studyfrog_log::{debug, error, info, warn};
use uuid::Uuid;

const TARGET: &str = "studyfrog::dispatcher";

/// Namespace used by [`Dispatcher::subscribe`] and [`Dispatcher::publish`].
pub const GLOBAL_NAMESPACE: &str = "GLOBAL";

/// Dispatcher configuration
///
/// Loaded from the `dispatcher` section of a [`ConfigManager`], e.g.
/// `STUDYFROG_DISPATCHER__DEFAULT_NAMESPACE=dashboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// First notification id and first registry id
    pub base_id: u64,

    /// Namespace for `subscribe`/`publish`
    #[serde(deserialize_with = "namespace_from_scalar")]
    pub default_namespace: String,

    /// Log registrations and dispatches
    pub enable_logging: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_id: DEFAULT_BASE_ID,
            default_namespace: GLOBAL_NAMESPACE.to_string(),
            enable_logging: true,
        }
    }
}

/// Environment values that look like numbers or booleans arrive as such, so
/// `DEFAULT_NAMESPACE=2024` is read back as the namespace `"2024"`.
fn namespace_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(namespace) => Ok(namespace),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a namespace, found {}",
            other
        ))),
    }
}

impl Validate for DispatcherConfig {
    fn validate(&self) -> studyfrog_config::Result<()> {
        ConfigValidator::not_empty(&self.default_namespace, "dispatcher.default_namespace")
    }
}

impl DispatcherConfig {
    /// Section name inside the configuration document.
    pub const SECTION: &'static str = "dispatcher";

    /// Read and validate the `dispatcher` section; missing keys keep their defaults.
    pub fn load(manager: &ConfigManager) -> DispatchResult<Self> {
        Ok(manager.load_validated(Self::SECTION)?)
    }

    /// Load from `STUDYFROG_*` environment variables.
    pub fn from_env() -> DispatchResult<Self> {
        Self::load(&ConfigBuilder::new().load_env().build()?)
    }

    /// Load from a TOML, JSON or `.env` file, with the environment on top.
    pub fn from_file(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let manager = ConfigBuilder::new()
            .add_file_auto(path.as_ref())
            .load_env()
            .build()?;
        Self::load(&manager)
    }
}

/// What [`Dispatcher::unregister`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnregisterTarget {
    /// The whole registry of an event name, across namespaces.
    Event(String),
    /// One namespace in every registry.
    Namespace(String),
    /// A single subscription.
    Subscription(Uuid),
}

impl UnregisterTarget {
    pub fn event(event: &Event) -> Self {
        UnregisterTarget::Event(event.name().to_string())
    }

    /// Pick a target from optional parts.
    ///
    /// When several are given the event wins over the namespace, which wins
    /// over the uuid; the others are ignored with a warning.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MissingUnregisterTarget`] if all three are `None`.
    pub fn from_parts(
        event: Option<&Event>,
        namespace: Option<&str>,
        uuid: Option<Uuid>,
    ) -> DispatchResult<Self> {
        let given = [event.is_some(), namespace.is_some(), uuid.is_some()]
            .iter()
            .filter(|&&given| given)
            .count();
        if given > 1 {
            warn!(
                target: TARGET,
                "Several unregister targets given; using the most specific by event > namespace > uuid"
            );
        }

        match (event, namespace, uuid) {
            (Some(event), _, _) => Ok(Self::event(event)),
            (None, Some(namespace), _) => Ok(UnregisterTarget::Namespace(namespace.to_string())),
            (None, None, Some(uuid)) => Ok(UnregisterTarget::Subscription(uuid)),
            (None, None, None) => Err(DispatchError::MissingUnregisterTarget),
        }
    }
}

impl From<Uuid> for UnregisterTarget {
    fn from(uuid: Uuid) -> Self {
        UnregisterTarget::Subscription(uuid)
    }
}

impl From<&Event> for UnregisterTarget {
    fn from(event: &Event) -> Self {
        Self::event(event)
    }
}

/// One entry of [`Dispatcher::register_many`].
#[derive(Clone)]
pub struct Registration {
    pub event: Event,
    pub handler: Arc<dyn Handler>,
    pub namespace: String,
    pub options: SubscribeOptions,
}

impl Registration {
    pub fn new(
        event: &Event,
        handler: impl Handler,
        namespace: impl Into<String>,
        options: impl Into<SubscribeOptions>,
    ) -> Self {
        Self {
            event: event.clone(),
            handler: Arc::new(handler),
            namespace: namespace.into(),
            options: options.into(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("event", &self.event.name())
            .field("handler", &self.handler.name())
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish()
    }
}

/// Namespaced publish/subscribe dispatcher
///
/// Cloning is cheap and every clone shares the same registries.
#[derive(Clone)]
pub struct Dispatcher {
    /// One registry per event name
    registries: Arc<DashMap<String, Arc<EventSubscriptions>>>,

    config: Arc<DispatcherConfig>,

    notification_ids: Arc<IdSequence>,
    registry_ids: Arc<IdSequence>,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with custom config
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registries: Arc::new(DashMap::new()),
            notification_ids: Arc::new(IdSequence::starting_at(config.base_id)),
            registry_ids: Arc::new(IdSequence::starting_at(config.base_id)),
            config: Arc::new(config),
        }
    }

    /// Create a dispatcher from the `dispatcher` section of `manager`.
    pub fn from_config(manager: &ConfigManager) -> DispatchResult<Self> {
        Ok(Self::with_config(DispatcherConfig::load(manager)?))
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn default_namespace(&self) -> &str {
        &self.config.default_namespace
    }

    /// Subscribe `handler` to `event` within `namespace`.
    ///
    /// Returns the subscription uuid, which is what [`unregister`](Self::unregister)
    /// accepts.
    ///
    /// ```rust
    /// use studyfrog_events::{create_event, handler_fn, Arguments, Dispatcher};
    ///
    /// let dispatcher = Dispatcher::new();
    /// let ping = create_event("PING").unwrap();
    /// dispatcher
    ///     .register(&ping, handler_fn("pong", |_| Ok("pong".into())), "GLOBAL", true)
    ///     .unwrap();
    ///
    /// let notification = dispatcher.dispatch(&ping, "GLOBAL", Arguments::none());
    /// assert_eq!(notification.get_result_by_key("pong").unwrap(), "pong");
    /// ```
    pub fn register(
        &self,
        event: &Event,
        handler: impl Handler,
        namespace: &str,
        persistent: bool,
    ) -> DispatchResult<Uuid> {
        self.register_with(event, handler, namespace, SubscribeOptions::from(persistent))
    }

    /// Same as [`register`](Self::register) with an explicit priority.
    pub fn register_with(
        &self,
        event: &Event,
        handler: impl Handler,
        namespace: &str,
        options: SubscribeOptions,
    ) -> DispatchResult<Uuid> {
        self.register_shared(event, Arc::new(handler), namespace, options)
    }

    /// Subscribe within the default namespace.
    pub fn subscribe(
        &self,
        event: &Event,
        handler: impl Handler,
        persistent: bool,
    ) -> DispatchResult<Uuid> {
        let namespace = self.config.default_namespace.clone();
        self.register(event, handler, &namespace, persistent)
    }

    /// Register several handlers; each entry succeeds or fails on its own.
    pub fn register_many(
        &self,
        registrations: impl IntoIterator<Item = Registration>,
    ) -> Vec<DispatchResult<Uuid>> {
        registrations
            .into_iter()
            .map(|r| self.register_shared(&r.event, r.handler, &r.namespace, r.options))
            .collect()
    }

    fn register_shared(
        &self,
        event: &Event,
        handler: Arc<dyn Handler>,
        namespace: &str,
        options: SubscribeOptions,
    ) -> DispatchResult<Uuid> {
        if namespace.trim().is_empty() {
            warn!(
                target: TARGET,
                "Cannot register '{}' for '{}': blank namespace",
                handler.name(), event.name()
            );
            return Err(DispatchError::InvalidNamespace(namespace.to_string()));
        }

        let handler_name = handler.name().to_string();
        // The shard lock is held until the subscription is in, so a concurrent
        // unregister of this event cannot orphan it.
        let registry = self
            .registries
            .entry(event.name().to_string())
            .or_insert_with(|| {
                Arc::new(EventSubscriptions::new(
                    self.registry_ids.next(),
                    event.clone(),
                    self.config.enable_logging,
                ))
            });
        let uuid = registry.add_subscription(handler, namespace, options)?;
        drop(registry);

        if self.config.enable_logging {
            info!(
                target: TARGET,
                "Registered '{}' for '{}' in namespace '{}' ({}, priority {}, uuid {})",
                handler_name,
                event.name(),
                namespace,
                if options.persistent { "persistent" } else { "one-shot" },
                options.priority,
                uuid
            );
        }

        Ok(uuid)
    }

    /// Remove subscriptions.
    ///
    /// Returns `Ok(true)` if anything was removed.
    pub fn unregister(&self, target: impl Into<UnregisterTarget>) -> DispatchResult<bool> {
        let target = target.into();
        let removed = match &target {
            UnregisterTarget::Event(name) => self.registries.remove(name).is_some(),
            UnregisterTarget::Namespace(namespace) => {
                let mut removed = false;
                for registry in self.registries.iter() {
                    removed |= registry.value().remove_namespace(namespace)?;
                }
                removed
            }
            UnregisterTarget::Subscription(uuid) => {
                let mut removed = false;
                for registry in self.registries.iter() {
                    if registry.value().remove_subscription(*uuid)? {
                        removed = true;
                        break;
                    }
                }
                removed
            }
        };

        if removed {
            if self.config.enable_logging {
                info!(target: TARGET, "Unregistered {:?}", target);
            }
        } else {
            warn!(target: TARGET, "Nothing to unregister for {:?}", target);
        }

        Ok(removed)
    }

    /// [`unregister`](Self::unregister) from optional parts.
    pub fn unregister_parts(
        &self,
        event: Option<&Event>,
        namespace: Option<&str>,
        uuid: Option<Uuid>,
    ) -> DispatchResult<bool> {
        self.unregister(UnregisterTarget::from_parts(event, namespace, uuid)?)
    }

    pub fn unregister_event(&self, event: &Event) -> DispatchResult<bool> {
        self.unregister(UnregisterTarget::event(event))
    }

    pub fn unregister_namespace(&self, namespace: &str) -> DispatchResult<bool> {
        self.unregister(UnregisterTarget::Namespace(namespace.to_string()))
    }

    pub fn unregister_uuid(&self, uuid: Uuid) -> DispatchResult<bool> {
        self.unregister(UnregisterTarget::Subscription(uuid))
    }

    /// Remove every subscription in `uuids`.
    ///
    /// All removals are attempted; returns `true` only if each one removed something.
    pub fn unregister_many(&self, uuids: &[Uuid]) -> bool {
        uuids
            .iter()
            .map(|uuid| matches!(self.unregister_uuid(*uuid), Ok(true)))
            .fold(true, |all, removed| all && removed)
    }

    /// Fan `event` out to every subscriber in `namespace`.
    ///
    /// Never fails: unknown events, empty namespaces, failing handlers and
    /// internal faults are all described by the returned notification.
    pub fn dispatch(&self, event: &Event, namespace: &str, arguments: Arguments) -> Notification {
        let mut builder = self.start(event, namespace);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.fan_out(&mut builder, event, namespace, &arguments)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.degrade(&mut builder, event, namespace, err.as_label(), &err.to_string()),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.degrade(&mut builder, event, namespace, "dispatch_panicked", &message)
            }
        }

        self.complete(builder)
    }

    /// Dispatch within the default namespace.
    pub fn publish(&self, event: &Event, arguments: Arguments) -> Notification {
        let namespace = self.config.default_namespace.clone();
        self.dispatch(event, &namespace, arguments)
    }

    /// Dispatch each `(event, namespace)` pair in order with the same arguments.
    pub fn dispatch_many<'a>(
        &self,
        targets: impl IntoIterator<Item = (&'a Event, &'a str)>,
        arguments: &Arguments,
    ) -> Vec<Notification> {
        targets
            .into_iter()
            .map(|(event, namespace)| self.dispatch(event, namespace, arguments.clone()))
            .collect()
    }

    /// Like [`dispatch`](Self::dispatch), but runs the handlers concurrently on
    /// the blocking pool. Results keep firing order.
    ///
    /// Polled outside a tokio runtime there is no blocking pool, so the
    /// handlers run in order on the calling thread instead.
    pub async fn dispatch_async(
        &self,
        event: &Event,
        namespace: &str,
        arguments: Arguments,
    ) -> Notification {
        if tokio::runtime::Handle::try_current().is_err() {
            if self.config.enable_logging {
                debug!(target: TARGET, "No tokio runtime, dispatching {} inline", event.name());
            }
            return self.dispatch(event, namespace, arguments);
        }

        let mut builder = self.start(event, namespace);

        match self.lookup(event.name()) {
            None => self.record_unknown_event(&mut builder, event, namespace),
            Some(registry) => match registry.claim(namespace) {
                Err(err) => {
                    self.degrade(&mut builder, event, namespace, err.as_label(), &err.to_string())
                }
                Ok(subscriptions) if subscriptions.is_empty() => {
                    builder.result(NO_LISTENERS_KEY, Value::Null);
                }
                Ok(subscriptions) => {
                    let arguments = Arc::new(arguments);
                    let tasks = subscriptions.iter().map(|subscription| {
                        let handler = Arc::clone(subscription.handler());
                        let arguments = Arc::clone(&arguments);
                        tokio::task::spawn_blocking(move || invoke(handler.as_ref(), &arguments))
                    });
                    let outcomes = futures::future::join_all(tasks).await;

                    for (subscription, outcome) in subscriptions.iter().zip(outcomes) {
                        let outcome = outcome
                            .unwrap_or_else(|join| Err(HandlerError::Panicked(join.to_string())));
                        record_outcome(&mut builder, subscription, outcome);
                    }
                }
            },
        }

        self.complete(builder)
    }

    pub fn is_event_registered(&self, event: impl AsRef<str>) -> bool {
        self.registries.contains_key(event.as_ref())
    }

    pub fn is_namespace_registered(&self, namespace: &str) -> bool {
        self.registries
            .iter()
            .any(|registry| registry.value().contains_namespace(namespace))
    }

    /// Number of live subscriptions for `event` in `namespace`.
    pub fn handler_count(&self, event: impl AsRef<str>, namespace: &str) -> usize {
        self.lookup(event.as_ref())
            .map_or(0, |registry| registry.subscription_count(namespace))
    }

    /// Names of every event with a registry, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registries.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop every registry.
    pub fn clear(&self) {
        self.registries.clear();
        if self.config.enable_logging {
            info!(target: TARGET, "Cleared all event registries");
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<EventSubscriptions>> {
        self.registries.get(name).map(|r| Arc::clone(r.value()))
    }

    fn start(&self, event: &Event, namespace: &str) -> NotificationBuilder {
        if self.config.enable_logging {
            debug!(target: TARGET, "Dispatching {} in namespace '{}'", event, namespace);
        }
        NotificationBuilder::new(self.notification_ids.next(), event.clone(), namespace)
    }

    fn complete(&self, mut builder: NotificationBuilder) -> Notification {
        builder.finish();
        let notification = builder.build();
        if self.config.enable_logging {
            debug!(target: TARGET, "Dispatch finished: {}", notification.summary());
        }
        notification
    }

    fn fan_out(
        &self,
        builder: &mut NotificationBuilder,
        event: &Event,
        namespace: &str,
        arguments: &Arguments,
    ) -> DispatchResult<()> {
        match self.lookup(event.name()) {
            Some(registry) => registry.notify_subscriptions(builder, namespace, arguments),
            None => {
                self.record_unknown_event(builder, event, namespace);
                Ok(())
            }
        }
    }

    fn record_unknown_event(&self, builder: &mut NotificationBuilder, event: &Event, namespace: &str) {
        let message = format!(
            "Event '{}' not found in namespace '{}'.",
            event.name(),
            namespace
        );
        if self.config.enable_logging {
            warn!(target: TARGET, "{}", message);
        }
        builder.result(NO_LISTENERS_KEY, Value::Null).warnings(json!({
            "message": message,
            "status": "WARNING",
            "event": event.name(),
            "namespace": namespace,
        }));
    }

    fn degrade(
        &self,
        builder: &mut NotificationBuilder,
        event: &Event,
        namespace: &str,
        label: &str,
        message: &str,
    ) {
        error!(
            target: TARGET,
            "Dispatch of '{}' in namespace '{}' failed ({}): {}",
            event.name(), namespace, label, message
        );
        builder.warnings(json!({
            "message": message,
            "status": "ERROR",
            "kind": label,
            "event": event.name(),
            "namespace": namespace,
        }));
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("events", &self.event_names())
            .finish()
    }
}

/// Dispatcher builder
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// First id for notifications and registries
    pub fn base_id(mut self, base_id: u64) -> Self {
        self.config.base_id = base_id;
        self
    }

    /// Namespace used by `subscribe` and `publish`
    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.default_namespace = namespace.into();
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher::with_config(self.config)
    }
}
