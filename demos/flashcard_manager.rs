//! Flashcard Manager Example
//!
//! A backend manager and two views wired together through the dispatcher.
//!
//! Run with: cargo run --example flashcard_manager

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use studyfrog::prelude::*;
use studyfrog::studyfrog_log;

/// Struct-based handler: owns its state instead of capturing it.
struct FlashcardStore {
    next_id: AtomicU64,
    cards: Mutex<Vec<Value>>,
}

impl FlashcardStore {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            cards: Mutex::new(Vec::new()),
        }
    }
}

struct CreateFlashcard(Arc<FlashcardStore>);

impl Handler for CreateFlashcard {
    fn name(&self) -> &str {
        "create_flashcard"
    }

    fn call(&self, arguments: &Arguments) -> HandlerResult {
        let front: String = arguments.kwarg_as("front")?;
        let back: String = arguments.kwarg_as("back")?;
        if front.trim().is_empty() {
            return Err(HandlerError::invalid_argument("front must not be blank"));
        }

        let card = json!({
            "id": self.0.next_id.fetch_add(1, Ordering::SeqCst),
            "front": front,
            "back": back,
        });
        self.0
            .cards
            .lock()
            .map_err(|e| HandlerError::failed(e.to_string()))?
            .push(card.clone());
        Ok(card)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    studyfrog_log::init();
    println!("\n=== Flashcard Manager Example ===\n");

    // 1. Create dispatcher
    println!("1. Creating Dispatcher:");
    let dispatcher = Dispatcher::builder()
        .default_namespace("backend")
        .enable_logging(false)
        .build();
    let events = Events::global();
    println!("   ✅ Dispatcher created ({} catalog events)\n", Events::LEN);

    // 2. Register handlers
    println!("2. Registering Handlers:");
    let store = Arc::new(FlashcardStore::new());
    let mut uuids = vec![dispatcher.subscribe(
        &events.request_flashcard_create,
        CreateFlashcard(Arc::clone(&store)),
        true,
    )?];

    let listing = Arc::clone(&store);
    uuids.push(dispatcher.subscribe(
        &events.request_get_all_flashcards,
        handler_fn("get_all_flashcards", move |_| {
            let cards = listing
                .cards
                .lock()
                .map_err(|e| HandlerError::failed(e.to_string()))?;
            Ok(Value::Array(cards.clone()))
        }),
        true,
    )?);

    uuids.push(dispatcher.register_with(
        &events.flashcard_created,
        handler_fn("refresh_list", |args| {
            println!("   🔄 List view refreshed for {}", args.arg(0).cloned().unwrap_or_default());
            Ok(Value::Null)
        }),
        "ui",
        SubscribeOptions::persistent(),
    )?);
    uuids.push(dispatcher.register_with(
        &events.flashcard_created,
        handler_fn("show_toast", |_| {
            println!("   🍞 Toast: flashcard saved");
            Ok(Value::Null)
        }),
        "ui",
        SubscribeOptions::persistent().with_priority(10),
    )?);
    println!("   ✅ {} handlers registered\n", uuids.len());

    // 3. Create flashcards
    println!("3. Creating Flashcards:");
    for (front, back) in [("la biblioteca", "the library"), ("el perro", "the dog"), ("", "blank")] {
        let created = dispatcher.publish(
            &events.request_flashcard_create,
            Arguments::none().with_kwarg("front", front).with_kwarg("back", back),
        );

        if created.has_errors() {
            for failure in created.get_errors() {
                println!("   ❌ {} failed: {}", failure.function, failure.error);
            }
            continue;
        }

        if let Some(card) = created.get_one_and_only_result() {
            println!("   ✅ Created {}", card);
            dispatcher.dispatch(&events.flashcard_created, "ui", Arguments::none().with_arg(card.clone()));
        }
    }
    println!();

    // 4. Query
    println!("4. Listing Flashcards:");
    let all = dispatcher
        .dispatch_async(&events.request_get_all_flashcards, "backend", Arguments::none())
        .await;
    println!("   {}\n", all.summary());

    // 5. Nobody listening
    println!("5. Dispatching Without Listeners:");
    let unheard = dispatcher.publish(&events.request_stack_load, Arguments::none());
    println!("   unheard: {}, warnings: {:?}\n", unheard.is_unheard(), unheard.get_warnings());

    // 6. Teardown
    println!("6. Tearing Down:");
    println!("   all removed: {}", dispatcher.unregister_many(&uuids));
    println!("   events still known: {:?}", dispatcher.event_names());

    println!("\n=== Example Complete ===\n");
    Ok(())
}
