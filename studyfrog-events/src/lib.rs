//! Namespaced publish/subscribe dispatcher for StudyFrog.
//!
//! Components talk to each other by dispatching named events instead of
//! calling one another:
//! - 📛 Events identified by name, with ids from a monotonic factory
//! - 🗂️ Subscriptions scoped to a namespace (a view, a service, `GLOBAL`)
//! - 🔁 Persistent and one-shot handlers, fired by priority
//! - 📬 Every dispatch returns a [`Notification`] with per-handler results
//! - 🛡️ Failing or panicking handlers are recorded, never propagated
//!
//! ## Quick Start
//!
//! ```
//! use studyfrog_events::prelude::*;
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::new();
//! let ping = create_event("PING").unwrap();
//!
//! dispatcher
//!     .register(&ping, handler_fn("<lambda>", |_| Ok(json!("pong"))), "GLOBAL", true)
//!     .unwrap();
//!
//! let notification = dispatcher.dispatch(&ping, "GLOBAL", Arguments::none());
//! assert_eq!(notification.get_one_and_only_result(), Some(&json!("pong")));
//! ```
//!
//! ## Catalog Events
//!
//! ```
//! use studyfrog_events::prelude::*;
//! use serde_json::json;
//!
//! let events = Events::global();
//! let dispatcher = Dispatcher::new();
//!
//! dispatcher
//!     .register(
//!         &events.request_stack_load,
//!         handler_fn("load_stack", |args| {
//!             let id: u64 = args.kwarg_as("id")?;
//!             Ok(json!({ "id": id, "name": "Spanish" }))
//!         }),
//!         "backend",
//!         true,
//!     )
//!     .unwrap();
//!
//! let loaded = dispatcher.dispatch(
//!     &events.request_stack_load,
//!     "backend",
//!     Arguments::none().with_kwarg("id", 3),
//! );
//! assert_eq!(loaded.get_result_by_key("load_stack").unwrap()["name"], "Spanish");
//! ```
//!
//! ## Configuration
//!
//! ```
//! use studyfrog_events::{Dispatcher, DispatcherBuilder};
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .base_id(1)                     // First notification id
//!     .default_namespace("dashboard") // Used by subscribe/publish
//!     .enable_logging(false)
//!     .build();
//!
//! assert_eq!(dispatcher.default_namespace(), "dashboard");
//! ```

pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod notification;
pub mod subscription;

pub use catalog::Events;
pub use dispatcher::{
    Dispatcher, DispatcherBuilder, DispatcherConfig, GLOBAL_NAMESPACE, Registration,
    UnregisterTarget,
};
pub use error::{DispatchError, DispatchResult, HandlerError};
pub use event::{DEFAULT_BASE_ID, Event, EventFactory, IdSequence, create_event};
pub use handler::{Arguments, FnHandler, Handler, HandlerResult, handler_fn};
pub use notification::{HandlerFailure, NO_LISTENERS_KEY, Notification, NotificationBuilder};
pub use subscription::{EventSubscriptions, SubscribeOptions, Subscription};
pub use uuid::Uuid;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::Events;
    pub use crate::dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, Registration};
    pub use crate::error::{DispatchError, DispatchResult, HandlerError};
    pub use crate::event::{Event, create_event};
    pub use crate::handler::{Arguments, Handler, HandlerResult, handler_fn};
    pub use crate::notification::Notification;
    pub use crate::subscription::SubscribeOptions;
    pub use uuid::Uuid;
}
