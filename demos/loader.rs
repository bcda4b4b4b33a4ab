//! Async Loader
//!
//! This example drives a data loader through `new -> loading -> ready` with a
//! multi-step action, and shows what a failing action looks like.
//!
//! Key concepts:
//! - Sequence actions that suspend between steps
//! - `init` / `step` / `complete` notifications
//! - Failures reject the invocation without committing an error field
//! - Trace output via `log(true)`
//!
//! Run with: RUST_LOG=arbor=info cargo run --example loader

use arbor::{patch, Action, ActionFailure, Emit, EventKind, Machine};
use async_stream::stream;
use serde_json::Value;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn loader() -> Machine {
    Machine::builder()
        .label("loader")
        .initial(patch! { "loadState" => "new", "data" => null })
        .action(Action::sequence("start", |_machine, args| {
            stream! {
                yield Ok(Emit::Patch(patch! { "loadState" => "loading" }));
                tokio::time::sleep(Duration::from_millis(50)).await;
                yield Ok(Emit::Return(patch! { "loadState" => "ready", "data" => args }));
            }
        }))
        .action(Action::sequence("flaky", |_machine, _args| {
            stream! {
                yield Ok(Emit::Patch(patch! { "loadState" => "loading" }));
                yield Err(ActionFailure::new("upstream timed out"));
            }
        }))
        .build()
        .expect("loader declaration is valid")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    println!("=== Async Loader ===\n");

    let machine = loader();
    machine.log(true);

    let _subscription = machine.listen_all(|event| {
        println!(
            "  [{} {}] {} -> {}",
            event.action, event.kind, event.old_state, event.new_state
        );
    });

    println!("Running 'start':");
    match machine.actions().call("start", Value::from(42)).await {
        Ok(state) => println!("  resolved with {state}\n"),
        Err(e) => println!("  failed: {e}\n"),
    }

    println!("Running 'flaky':");
    match machine.actions().call("flaky", Value::Null).await {
        Ok(state) => println!("  resolved with {state}\n"),
        Err(e) => println!("  failed: {e}\n"),
    }

    println!(
        "Listeners: {} step, final state {}",
        machine.listener_count(EventKind::Step),
        machine.get_state()
    );
}
