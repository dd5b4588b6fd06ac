//! Integration tests for studyfrog-events

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use studyfrog_events::*;

fn counting(name: &'static str, calls: &Arc<AtomicUsize>) -> impl Handler {
    let calls = Arc::clone(calls);
    handler_fn(name, move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(name))
    })
}

#[test]
fn test_ping_pong() {
    let dispatcher = Dispatcher::new();
    let ping = create_event("PING").unwrap();

    let uuid = dispatcher
        .register(&ping, handler_fn("<lambda>", |_| Ok(json!("pong"))), "ns1", true)
        .unwrap();
    assert!(!uuid.is_nil());

    let notification = dispatcher.dispatch(&ping, "ns1", Arguments::none());
    assert_eq!(notification.results(), json!({"<lambda>": "pong"}).as_object().unwrap());
    assert_eq!(notification.get_one_and_only_result(), Some(&json!("pong")));
    assert!(!notification.has_errors());
}

#[test]
fn test_registration_round_trip() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:flashcard:created").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    dispatcher
        .register(
            &event,
            handler_fn("sum", move |args| {
                counter.fetch_add(1, Ordering::SeqCst);
                let a: i64 = args.arg_as(0)?;
                let b: i64 = args.kwarg_as("b")?;
                Ok(json!(a + b))
            }),
            "dashboard",
            true,
        )
        .unwrap();

    let notification = dispatcher.dispatch(
        &event,
        "dashboard",
        Arguments::none().with_arg(2).with_kwarg("b", 3),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(notification.get_result_by_key("sum"), Some(&json!(5)));
    assert_eq!(notification.event().name(), "backend:flashcard:created");
    assert_eq!(notification.namespace(), "dashboard");
}

#[test]
fn test_one_shot_fires_once() {
    let dispatcher = Dispatcher::new();
    let event = create_event("ui:toast:clicked").unwrap();
    let once = Arc::new(AtomicUsize::new(0));
    let always = Arc::new(AtomicUsize::new(0));

    dispatcher.register(&event, counting("once", &once), "ns", false).unwrap();
    dispatcher.register(&event, counting("always", &always), "ns", true).unwrap();

    let first = dispatcher.dispatch(&event, "ns", Arguments::none());
    let second = dispatcher.dispatch(&event, "ns", Arguments::none());
    dispatcher.dispatch(&event, "ns", Arguments::none());

    assert_eq!(once.load(Ordering::SeqCst), 1);
    assert_eq!(always.load(Ordering::SeqCst), 3);
    assert!(first.has("once"));
    assert!(!second.has("once"));
}

#[test]
fn test_one_shot_alone_leaves_sentinel() {
    let dispatcher = Dispatcher::new();
    let event = create_event("ui:navigate").unwrap();

    dispatcher
        .register(&event, handler_fn("go", |_| Ok(json!("home"))), "ns", false)
        .unwrap();

    assert_eq!(
        dispatcher.dispatch(&event, "ns", Arguments::none()).get_one_and_only_result(),
        Some(&json!("home"))
    );
    let second = dispatcher.dispatch(&event, "ns", Arguments::none());
    assert!(second.is_unheard());
    assert!(!dispatcher.is_namespace_registered("ns"));
    assert!(dispatcher.is_event_registered(&event));
}

#[test]
fn test_no_listener_sentinel() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:tag:loaded").unwrap();
    dispatcher
        .register(&event, handler_fn("elsewhere", |_| Ok(Value::Null)), "other", true)
        .unwrap();

    let notification = dispatcher.dispatch(&event, "empty", Arguments::none());

    assert_eq!(notification.results(), json!({"NaN": null}).as_object().unwrap());
    assert_eq!(notification.get_one_and_only_result(), None);
    assert!(!notification.is_empty());
}

#[test]
fn test_unknown_event_sentinel() {
    let dispatcher = Dispatcher::new();
    let event = create_event("global:never:registered").unwrap();

    let notification = dispatcher.dispatch(&event, "GLOBAL", Arguments::none());

    assert!(notification.has_warnings());
    assert!(notification.has_irregularities());
    assert!(!notification.is_empty());
    assert!(notification.has(NO_LISTENERS_KEY));
    assert!(!dispatcher.is_event_registered("global:never:registered"));
}

#[test]
fn test_handler_isolation() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:note:updated").unwrap();

    dispatcher
        .register(
            &event,
            handler_fn("a_raises", |_| Err(HandlerError::failed("database locked"))),
            "ns",
            true,
        )
        .unwrap();
    dispatcher
        .register(&event, handler_fn("b_ok", |_| Ok(json!("ok"))), "ns", true)
        .unwrap();

    let notification = dispatcher.dispatch(&event, "ns", Arguments::none());

    assert!(notification.has_errors());
    assert_eq!(notification.get_result_by_key("b_ok"), Some(&json!("ok")));
    assert_eq!(notification.get_result_by_key("a_raises"), None);
    assert!(notification.has("a_raises"));

    let failure = &notification.get_errors()[0];
    assert_eq!(failure.function, "a_raises");
    assert_eq!(failure.error, HandlerError::failed("database locked"));
    assert!(failure.traceback.contains("database locked"));
}

#[test]
fn test_panicking_handler_is_isolated() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:user:loaded").unwrap();

    dispatcher
        .register(&event, handler_fn("explodes", |_| panic!("index out of range")), "ns", true)
        .unwrap();
    dispatcher
        .register(&event, handler_fn("survivor", |_| Ok(json!(1))), "ns", true)
        .unwrap();

    let notification = dispatcher.dispatch(&event, "ns", Arguments::none());

    assert_eq!(notification.get_result_by_key("survivor"), Some(&json!(1)));
    assert!(matches!(
        notification.get_errors()[0].error,
        HandlerError::Panicked(ref message) if message == "index out of range"
    ));
}

#[test]
fn test_single_result_unwrap() {
    let dispatcher = Dispatcher::new();
    let event = create_event("global:request:get:all:stacks").unwrap();

    dispatcher
        .register(&event, handler_fn("f", |_| Ok(json!(["only_item"]))), "ns", true)
        .unwrap();
    assert_eq!(
        dispatcher.dispatch(&event, "ns", Arguments::none()).get_one_and_only_result(),
        Some(&json!("only_item"))
    );

    dispatcher
        .register(&event, handler_fn("g", |_| Ok(json!("x"))), "ns", true)
        .unwrap();
    let ambiguous = dispatcher.dispatch(&event, "ns", Arguments::none());
    assert_eq!(ambiguous.get_one_and_only_result(), None);
    assert!(matches!(
        ambiguous.try_one_and_only_result(),
        Err(DispatchError::AmbiguousResult(2))
    ));
}

#[test]
fn test_duration_monotonicity() {
    let dispatcher = Dispatcher::new();
    let event = create_event("ui:timer:started").unwrap();
    dispatcher
        .register(
            &event,
            handler_fn("slow", |_| {
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(Value::Null)
            }),
            "ns",
            true,
        )
        .unwrap();

    for namespace in ["ns", "missing"] {
        let notification = dispatcher.dispatch(&event, namespace, Arguments::none());
        let expected = (notification.end() - notification.start())
            .to_std()
            .unwrap()
            .as_secs_f64();

        assert!(notification.end() >= notification.start());
        assert!((notification.duration() - expected).abs() < 1e-6);
    }
}

#[test]
fn test_namespace_isolation() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:stack:created").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    dispatcher.register(&event, counting("h", &calls), "A", true).unwrap();

    let notification = dispatcher.dispatch(&event, "B", Arguments::none());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(notification.is_unheard());
    assert!(dispatcher.is_namespace_registered("A"));
    assert!(!dispatcher.is_namespace_registered("B"));
}

#[test]
fn test_unregister_by_uuid() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:answer:deleted").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let uuid = dispatcher.register(&event, counting("h", &calls), "ns", true).unwrap();

    assert!(dispatcher.unregister(uuid).unwrap());
    dispatcher.dispatch(&event, "ns", Arguments::none());

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!dispatcher.unregister(uuid).unwrap());
}

#[test]
fn test_unregister_by_event_and_namespace() {
    let dispatcher = Dispatcher::new();
    let created = create_event("backend:priority:created").unwrap();
    let deleted = create_event("backend:priority:deleted").unwrap();

    for event in [&created, &deleted] {
        dispatcher.register(event, handler_fn("a", |_| Ok(Value::Null)), "A", true).unwrap();
        dispatcher.register(event, handler_fn("b", |_| Ok(Value::Null)), "B", true).unwrap();
    }

    assert!(dispatcher.unregister_namespace("A").unwrap());
    assert!(!dispatcher.is_namespace_registered("A"));
    assert_eq!(dispatcher.handler_count(&created, "B"), 1);

    assert!(dispatcher.unregister_parts(Some(&created), None, None).unwrap());
    assert!(!dispatcher.is_event_registered(&created));
    assert!(dispatcher.is_event_registered(&deleted));

    assert!(matches!(
        dispatcher.unregister_parts(None, None, None),
        Err(DispatchError::MissingUnregisterTarget)
    ));
}

#[test]
fn test_same_name_reaches_same_subscribers() {
    let dispatcher = Dispatcher::new();
    let original = create_event("global:generic:event").unwrap();
    let twin = create_event("global:generic:event").unwrap();

    dispatcher
        .register(&original, handler_fn("h", |_| Ok(json!("heard"))), "ns", true)
        .unwrap();

    assert!(!original.compare_to(&twin));
    assert_eq!(
        dispatcher.dispatch(&twin, "ns", Arguments::none()).get_result_by_key("h"),
        Some(&json!("heard"))
    );
}

#[test]
fn test_priority_order() {
    let dispatcher = Dispatcher::new();
    let event = create_event("ui:button:clicked").unwrap();

    dispatcher.register(&event, handler_fn("first", |_| Ok(json!(1))), "ns", true).unwrap();
    dispatcher.register(&event, handler_fn("second", |_| Ok(json!(2))), "ns", true).unwrap();
    dispatcher
        .register_with(
            &event,
            handler_fn("urgent", |_| Ok(json!(0))),
            "ns",
            SubscribeOptions::persistent().with_priority(10),
        )
        .unwrap();

    let notification = dispatcher.dispatch(&event, "ns", Arguments::none());
    let keys: Vec<&String> = notification.results().keys().collect();
    assert_eq!(keys, ["urgent", "first", "second"]);
}

#[test]
fn test_default_namespace_helpers() {
    let dispatcher = Dispatcher::builder().default_namespace("main").build();
    let event = create_event("global:application:started").unwrap();

    dispatcher
        .subscribe(&event, handler_fn("boot", |_| Ok(json!(true))), true)
        .unwrap();

    assert!(dispatcher.is_namespace_registered("main"));
    assert_eq!(
        dispatcher.publish(&event, Arguments::none()).get_one_and_only_result(),
        Some(&json!(true))
    );
}

#[test]
fn test_bulk_operations() {
    let dispatcher = Dispatcher::new();
    let created = create_event("backend:subject:created").unwrap();
    let updated = create_event("backend:subject:updated").unwrap();

    let results = dispatcher.register_many(vec![
        Registration::new(&created, handler_fn("c", |_| Ok(json!("c"))), "ns", true),
        Registration::new(&updated, handler_fn("u", |_| Ok(json!("u"))), "ns", true),
        Registration::new(&updated, handler_fn("bad", |_| Ok(json!("x"))), "", true),
    ]);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(DispatchError::InvalidNamespace(_))));

    let notifications =
        dispatcher.dispatch_many([(&created, "ns"), (&updated, "ns")], &Arguments::none());
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].get_one_and_only_result(), Some(&json!("c")));
    assert_eq!(notifications[1].get_one_and_only_result(), Some(&json!("u")));
    assert!(notifications[1].id() > notifications[0].id());

    let uuids: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    assert!(dispatcher.unregister_many(&uuids));
    assert_eq!(dispatcher.handler_count(&created, "ns"), 0);
}

#[test]
fn test_catalog_events_dispatch() {
    let dispatcher = Dispatcher::new();
    let events = Events::global();

    dispatcher
        .register(
            &events.request_flashcard_create,
            handler_fn("create_flashcard", |args| {
                let front: String = args.kwarg_as("front")?;
                Ok(json!({"id": 1, "front": front}))
            }),
            "backend",
            true,
        )
        .unwrap();

    let looked_up = events.by_name("global:request:flashcard:create").unwrap();
    let notification = dispatcher.dispatch(
        looked_up,
        "backend",
        Arguments::none().with_kwarg("front", "hola"),
    );

    assert_eq!(
        notification.get_one_and_only_result(),
        Some(&json!({"id": 1, "front": "hola"}))
    );
}

#[test]
fn test_concurrent_dispatch_and_register() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:image:loaded").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    dispatcher.register(&event, counting("base", &calls), "ns", true).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..25 {
                    let notification = dispatcher.dispatch(&event, "ns", Arguments::none());
                    assert!(notification.has("base"));
                }
            });
        }
        scope.spawn(|| {
            for i in 0..25 {
                let uuid = dispatcher
                    .register(&event, handler_fn("extra", |_| Ok(Value::Null)), "ns", true)
                    .unwrap();
                if i % 2 == 0 {
                    dispatcher.unregister(uuid).unwrap();
                }
            }
        });
    });

    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert_eq!(dispatcher.handler_count(&event, "ns"), 13);
}

#[tokio::test]
async fn test_dispatch_async_keeps_order() {
    let dispatcher = Dispatcher::new();
    let event = create_event("global:request:get:all:notes").unwrap();

    dispatcher
        .register(
            &event,
            handler_fn("slow", |_| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(json!("slow"))
            }),
            "ns",
            true,
        )
        .unwrap();
    dispatcher
        .register(&event, handler_fn("fast", |_| Ok(json!("fast"))), "ns", true)
        .unwrap();
    dispatcher
        .register(&event, handler_fn("broken", |_| panic!("no notes")), "ns", true)
        .unwrap();

    let notification = dispatcher.dispatch_async(&event, "ns", Arguments::none()).await;

    let keys: Vec<&String> = notification.results().keys().collect();
    assert_eq!(keys, ["slow", "fast", "broken"]);
    assert_eq!(notification.get_result_by_key("fast"), Some(&json!("fast")));
    assert_eq!(notification.get_errors().len(), 1);
}

#[tokio::test]
async fn test_dispatch_async_sentinels() {
    let dispatcher = Dispatcher::new();
    let event = create_event("ui:search:query:changed").unwrap();

    let unknown = dispatcher.dispatch_async(&event, "ns", Arguments::none()).await;
    assert!(unknown.is_unheard());
    assert!(unknown.has_warnings());

    dispatcher
        .register(&event, handler_fn("once", |_| Ok(json!(1))), "ns", false)
        .unwrap();
    let first = dispatcher.dispatch_async(&event, "ns", Arguments::none()).await;
    let second = dispatcher.dispatch_async(&event, "ns", Arguments::none()).await;

    assert_eq!(first.get_one_and_only_result(), Some(&json!(1)));
    assert!(second.is_unheard());
    assert!(!second.has_warnings());
}

#[test]
fn test_notification_serializes() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:question:created").unwrap();
    dispatcher
        .register(&event, handler_fn("fails", |_| Err(HandlerError::invalid_argument("id"))), "ns", true)
        .unwrap();

    let notification = dispatcher.dispatch(&event, "ns", Arguments::none());
    let value = serde_json::to_value(&notification).unwrap();

    assert_eq!(value["namespace"], "ns");
    assert_eq!(value["result"]["fails"], Value::Null);
    assert_eq!(value["errors"][0]["error"]["kind"], "invalid_argument");
    assert_eq!(notification.summary()["errors"], 1);
}

#[test]
fn test_dispatcher_from_config_file() {
    use std::io::Write;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[dispatcher]\nbase_id = 1\ndefault_namespace = \"review\"\nenable_logging = false").unwrap();
    file.flush().unwrap();

    let config = DispatcherConfig::from_file(file.path()).unwrap();
    assert_eq!(
        config,
        DispatcherConfig {
            base_id: 1,
            default_namespace: "review".to_string(),
            enable_logging: false,
        }
    );

    let dispatcher = Dispatcher::with_config(config);
    let event = create_event("ui:timer:stopped").unwrap();
    dispatcher.subscribe(&event, handler_fn("h", |_| Ok(Value::Null)), true).unwrap();

    let notification = dispatcher.publish(&event, Arguments::none());
    assert_eq!(notification.id(), 1);
    assert_eq!(notification.namespace(), "review");
}

#[test]
fn test_dispatch_async_with_test_runtime() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:difficulty:loaded").unwrap();
    dispatcher
        .register(&event, handler_fn("load", |_| Ok(json!("easy"))), "ns", true)
        .unwrap();

    let notification = tokio_test::block_on(dispatcher.dispatch_async(&event, "ns", Arguments::none()));
    assert_eq!(notification.get_one_and_only_result(), Some(&json!("easy")));
}

#[test]
fn test_dispatch_async_on_foreign_executor_fires_one_shot() {
    let dispatcher = Dispatcher::new();
    let event = create_event("backend:setting:updated").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    dispatcher
        .register(
            &event,
            handler_fn("apply_setting", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("applied"))
            }),
            "ns",
            false,
        )
        .unwrap();

    let first = futures::executor::block_on(dispatcher.dispatch_async(&event, "ns", Arguments::none()));
    let second = futures::executor::block_on(dispatcher.dispatch_async(&event, "ns", Arguments::none()));

    assert_eq!(first.get_one_and_only_result(), Some(&json!("applied")));
    assert!(!first.has_irregularities());
    assert!(second.is_unheard());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.handler_count(&event, "ns"), 0);
}
