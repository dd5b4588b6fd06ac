// StudyFrog - event dispatching core of the StudyFrog flashcard application
//
// Screens and managers never call each other directly: they register handlers
// for named events and dispatch those events through a shared Dispatcher.

// Re-export the dispatcher
pub use studyfrog_events::*;

// Re-export supporting crates
pub use studyfrog_config;
pub use studyfrog_events;
pub use studyfrog_log;

// Logging macros
pub use studyfrog_log::{debug, error, info, trace, warn};

// Prelude for common imports
pub mod prelude {
    pub use studyfrog_events::prelude::*;

    pub use studyfrog_config::{ConfigBuilder, ConfigManager};
    pub use studyfrog_events::{GLOBAL_NAMESPACE, UnregisterTarget};
    pub use studyfrog_log::Level;

    pub use serde_json::{Value, json};
}
