//! Composed Machines
//!
//! This example nests a counter and a settings machine under one root and
//! watches the whole tree from the top.
//!
//! Key concepts:
//! - Sub-machine state mirrored read-only into the parent
//! - Forwarded events with qualified paths
//! - Selectors that only fire when their slice changes
//! - `connect` for re-rendering a consumer
//!
//! Run with: cargo run --example composition

use arbor::{connect, patch, patch_action, Action, EventKind, Machine, Path};
use serde_json::Value;

fn counter() -> Machine {
    let machine = Machine::new(patch! { "count" => 0 });
    machine
        .add_action(Action::sync_fn("increment", |machine, _args| {
            let count = machine
                .get_state()
                .get("count")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Ok(patch! { "count" => (count + 1) })
        }))
        .expect("increment is a valid action");
    machine
}

#[tokio::main]
async fn main() {
    println!("=== Composed Machines ===\n");

    let root = Machine::new(patch! { "title" => "dashboard" });
    let counter = counter();
    let settings = Machine::new(patch! { "theme" => "light" });
    settings
        .add_action(patch_action("dark", patch! { "theme" => "dark" }))
        .expect("dark is a valid action");
    root.add_sub_machines(vec![("counter", counter.clone()), ("settings", settings.clone())])
        .expect("children attach");

    let _events = root.listen(EventKind::Step, |event| {
        println!("  root saw '{}' at {}", event.action, event.path);
        if let Some((new, old)) = event.origin() {
            println!("    origin: {old} -> {new}");
        }
    });

    let _theme = root.use_selector(
        |state| state.lookup(&Path::from(["settings", "theme"])),
        |theme| println!("  theme changed to {theme:?}"),
    );

    let badge = connect(|state| state.lookup(&Path::from(["counter", "count"])))
        .wrap(&root, |label: &String, count: &Option<Value>| {
            format!("{label}: {}", count.clone().unwrap_or(Value::Null))
        });
    println!("Initial badge: {}\n", badge.render("clicks".to_string()));

    for _ in 0..2 {
        counter
            .actions()
            .call("increment", Value::Null)
            .await
            .expect("increment succeeds");
    }
    root.actions()
        .child("settings")
        .expect("settings is attached")
        .call("dark", Value::Null)
        .await
        .expect("dark succeeds");

    println!("\nBadge after {} renders: {:?}", badge.render_count(), badge.output());
    println!("Root state: {}", root.get_state());
}
