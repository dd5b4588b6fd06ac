//! Integration tests for common StudyFrog workflows.
//!
//! A backend manager and a UI view talk to each other only through the
//! dispatcher, the way the application wires its screens.

use std::sync::{Arc, Mutex};
use studyfrog::prelude::*;
use studyfrog::studyfrog_log;

// =============================================================================
// Fixtures
// =============================================================================

/// In-memory stand-in for the stack table.
#[derive(Default)]
struct StackStore {
    stacks: Mutex<Vec<Value>>,
}

/// Backend side: answers stack requests and announces changes.
struct StackManager {
    uuids: Vec<Uuid>,
}

impl StackManager {
    fn mount(dispatcher: &Dispatcher, store: Arc<StackStore>) -> Self {
        let events = Events::global();
        let mut uuids = Vec::new();

        let create_store = Arc::clone(&store);
        let announcer = dispatcher.clone();
        uuids.push(
            dispatcher
                .register(
                    &events.request_stack_create,
                    handler_fn("create_stack", move |args| {
                        let name: String = args.kwarg_as("name")?;
                        let mut stacks = create_store
                            .stacks
                            .lock()
                            .map_err(|e| HandlerError::failed(e.to_string()))?;
                        let stack = json!({"id": stacks.len() + 1, "name": name});
                        stacks.push(stack.clone());
                        drop(stacks);

                        announcer.dispatch(
                            &Events::global().stack_created,
                            "ui",
                            Arguments::none().with_arg(stack.clone()),
                        );
                        Ok(stack)
                    }),
                    "backend",
                    true,
                )
                .unwrap(),
        );

        let all_store = Arc::clone(&store);
        uuids.push(
            dispatcher
                .register(
                    &events.request_get_all_stacks,
                    handler_fn("get_all_stacks", move |_| {
                        let stacks = all_store
                            .stacks
                            .lock()
                            .map_err(|e| HandlerError::failed(e.to_string()))?;
                        Ok(Value::Array(stacks.clone()))
                    }),
                    "backend",
                    true,
                )
                .unwrap(),
        );

        Self { uuids }
    }

    fn unmount(self, dispatcher: &Dispatcher) -> bool {
        dispatcher.unregister_many(&self.uuids)
    }
}

// =============================================================================
// Workflows
// =============================================================================

#[test]
fn test_create_stack_notifies_ui() {
    let dispatcher = Dispatcher::new();
    let store = Arc::new(StackStore::default());
    let events = Events::global();
    let toasts = Arc::new(Mutex::new(Vec::<String>::new()));

    let _manager = StackManager::mount(&dispatcher, Arc::clone(&store));

    let sink = Arc::clone(&toasts);
    dispatcher
        .register(
            &events.stack_created,
            handler_fn("show_toast", move |args| {
                let stack = args.arg(0).cloned().unwrap_or(Value::Null);
                sink.lock().unwrap().push(format!("Created {}", stack["name"]));
                Ok(Value::Null)
            }),
            "ui",
            true,
        )
        .unwrap();

    let created = dispatcher.dispatch(
        &events.request_stack_create,
        "backend",
        Arguments::none().with_kwarg("name", "Spanish verbs"),
    );

    assert!(!created.has_irregularities());
    assert_eq!(
        created.get_one_and_only_result(),
        Some(&json!({"id": 1, "name": "Spanish verbs"}))
    );
    assert_eq!(*toasts.lock().unwrap(), vec!["Created \"Spanish verbs\"".to_string()]);
}

#[test]
fn test_get_all_returns_list() {
    let dispatcher = Dispatcher::new();
    let store = Arc::new(StackStore::default());
    let events = Events::global();
    let _manager = StackManager::mount(&dispatcher, Arc::clone(&store));

    for name in ["Latin", "Physics"] {
        dispatcher.dispatch(
            &events.request_stack_create,
            "backend",
            Arguments::none().with_kwarg("name", name),
        );
    }

    let all = dispatcher.dispatch(&events.request_get_all_stacks, "backend", Arguments::none());
    let stacks = all.get_result_by_key("get_all_stacks").unwrap();

    assert_eq!(stacks.as_array().map(Vec::len), Some(2));
    assert_eq!(stacks[1]["name"], "Physics");
}

#[test]
fn test_invalid_request_reports_error() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();
    let _manager = StackManager::mount(&dispatcher, Arc::new(StackStore::default()));

    let notification = dispatcher.dispatch(&events.request_stack_create, "backend", Arguments::none());

    assert!(notification.has_errors());
    assert_eq!(notification.get_one_and_only_result(), None);
    assert!(matches!(
        notification.get_errors()[0].error,
        HandlerError::InvalidArgument(_)
    ));
}

#[test]
fn test_teardown_releases_subscriptions() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();
    let manager = StackManager::mount(&dispatcher, Arc::new(StackStore::default()));

    assert_eq!(dispatcher.handler_count(&events.request_stack_create, "backend"), 1);
    assert!(manager.unmount(&dispatcher));
    assert!(!dispatcher.is_namespace_registered("backend"));

    let after = dispatcher.dispatch(&events.request_get_all_stacks, "backend", Arguments::none());
    assert!(after.is_unheard());
}

#[test]
fn test_navigation_one_shot_guard() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();

    dispatcher
        .register(
            &events.request_validate_navigation,
            handler_fn("confirm_leave", |_| Ok(json!(true))),
            GLOBAL_NAMESPACE,
            false,
        )
        .unwrap();

    let first = dispatcher.publish(&events.request_validate_navigation, Arguments::none());
    let second = dispatcher.publish(&events.request_validate_navigation, Arguments::none());

    assert_eq!(first.get_one_and_only_result(), Some(&json!(true)));
    assert!(second.is_unheard());
}

#[test]
fn test_dispatch_logs_are_captured() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();

    let (notification, records) = studyfrog_log::capture(|| {
        dispatcher.dispatch(&events.application_stopped, "GLOBAL", Arguments::none())
    });

    assert!(notification.has_warnings());
    assert!(records.iter().any(|record| {
        record.level == Level::Warn
            && record.target == "studyfrog::dispatcher"
            && record.message.contains("global:application:stopped")
    }));
}

#[test]
fn test_dispatcher_from_configuration() {
    let manager = ConfigManager::new();
    manager.set("dispatcher.default_namespace", "review").unwrap();
    manager.set("dispatcher.enable_logging", false).unwrap();

    let dispatcher = Dispatcher::from_config(&manager).unwrap();
    let events = Events::global();
    dispatcher
        .subscribe(&events.timer_started, handler_fn("tick", |_| Ok(json!("tick"))), true)
        .unwrap();

    assert!(dispatcher.is_namespace_registered("review"));
    assert_eq!(
        dispatcher.publish(&events.timer_started, Arguments::none()).get_one_and_only_result(),
        Some(&json!("tick"))
    );
}

#[test]
fn test_async_dispatch_from_runtime() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();
    let _manager = StackManager::mount(&dispatcher, Arc::new(StackStore::default()));

    let created = tokio_test::block_on(dispatcher.dispatch_async(
        &events.request_stack_create,
        "backend",
        Arguments::none().with_kwarg("name", "Async"),
    ));

    assert_eq!(created.get_result_by_key("create_stack").unwrap()["name"], "Async");
}
