//! Builder API for ergonomic machine and action construction.
//!
//! This module provides fluent builders, the [`patch!`](crate::patch) macro
//! and helpers for the common "fixed patch" action shapes.

pub mod action;
pub mod error;
pub mod machine;
pub mod macros;

pub use action::ActionBuilder;
pub use error::ConfigurationError;
pub use machine::MachineBuilder;

use crate::action::{Action, Emit};
use crate::core::Patch;
use futures::stream;
use stillwater::prelude::*;

/// Create an action that always commits `patch`.
///
/// # Example
///
/// ```
/// use arbor::builder::patch_action;
/// use arbor::{patch, Machine};
/// use serde_json::Value;
///
/// # futures::executor::block_on(async {
/// let machine = Machine::new(patch! { "loadState" => "ready" });
/// machine.add_action(patch_action("reset", patch! { "loadState" => "new" })).unwrap();
///
/// let state = machine.actions().call("reset", Value::Null).await.unwrap();
/// assert_eq!(state.get("loadState").unwrap(), "new");
/// # });
/// ```
pub fn patch_action(name: impl Into<String>, patch: Patch) -> Action {
    Action::sync(name, move |_args| pure(patch.clone()).boxed())
}

/// Create an action that commits `patches` one step at a time.
pub fn steps_action(name: impl Into<String>, patches: Vec<Patch>) -> Action {
    Action::sequence(name, move |_machine, _args| {
        stream::iter(patches.clone().into_iter().map(|p| Ok(Emit::Patch(p))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventKind;
    use crate::machine::Machine;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[tokio::test]
    async fn patch_action_commits_its_patch_once() {
        let machine = Machine::new(Patch::new().set("n", 0));
        machine
            .add_action(patch_action("set", Patch::new().set("n", 5)))
            .unwrap();

        let state = machine.actions().call("set", Value::Null).await.unwrap();
        assert_eq!(state.get("n"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn steps_action_emits_one_step_per_patch() {
        let machine = Machine::new(Patch::new().set("n", 0));
        machine
            .add_action(steps_action(
                "count",
                vec![
                    Patch::new().set("n", 1),
                    Patch::new().set("n", 2),
                    Patch::new().set("n", 3),
                ],
            ))
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = machine.listen(EventKind::Step, move |e| {
            sink.lock().push(e.new_state.get("n").cloned())
        });

        machine.actions().call("count", Value::Null).await.unwrap();
        assert_eq!(
            *seen.lock(),
            vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]
        );
    }
}
