//! Property-based tests for snapshots, action runs and selectors.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use arbor::{steps_action, EventKind, Machine, Patch, Snapshot};
use futures::executor::block_on;
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

prop_compose! {
    fn arbitrary_patch()(entries in prop::collection::vec(("[a-e]", 0..4i64), 0..6)) -> Patch {
        entries.into_iter().collect()
    }
}

prop_compose! {
    fn arbitrary_steps()(values in prop::collection::vec(0..3i64, 0..12)) -> Vec<Patch> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Patch::new().set("step", i as i64).set("mode", v))
            .collect()
    }
}

proptest! {
    #[test]
    fn merge_keeps_untouched_fields_shared(base in arbitrary_patch(), patch in arbitrary_patch()) {
        let before = Snapshot::from(base);
        let after = before.merge(&patch);

        for key in before.keys() {
            if patch.contains_key(key) {
                prop_assert_eq!(after.get(key), patch.get(key));
            } else {
                prop_assert!(before.same_field(&after, key));
            }
        }
        for (key, value) in patch.iter() {
            prop_assert_eq!(after.get(key), Some(value));
        }
        prop_assert!(after.len() <= before.len() + patch.len());
    }

    #[test]
    fn merge_never_changes_the_original(base in arbitrary_patch(), patch in arbitrary_patch()) {
        let before = Snapshot::from(base.clone());
        let _ = before.merge(&patch);
        prop_assert_eq!(before, Snapshot::from(base));
    }

    #[test]
    fn last_write_wins_within_a_patch(key in "[a-e]", first in 0..4i64, second in 0..4i64) {
        let patch = Patch::new().set(key.clone(), first).set(key.clone(), second);
        prop_assert_eq!(patch.len(), 1);
        prop_assert_eq!(patch.get(&key), Some(&json!(second)));
    }

    #[test]
    fn one_step_per_patch_between_init_and_complete(steps in arbitrary_steps()) {
        let machine = Machine::new(Patch::new().set("step", -1).set("mode", 0));
        machine.add_action(steps_action("run", steps.clone())).unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _subscription = machine.listen_all(move |event| sink.lock().push(event.clone()));

        let final_state = block_on(machine.actions().call("run", Value::Null)).unwrap();

        let events = events.lock();
        prop_assert_eq!(events.len(), steps.len() + 2);
        prop_assert_eq!(events[0].kind, EventKind::Init);
        prop_assert_eq!(events[events.len() - 1].kind, EventKind::Complete);

        let mut previous = events[0].new_state.clone();
        for (event, patch) in events[1..events.len() - 1].iter().zip(&steps) {
            prop_assert_eq!(event.kind, EventKind::Step);
            prop_assert!(event.old_state.ptr_eq(&previous));
            prop_assert_eq!(event.new_state.get("step"), patch.get("step"));
            previous = event.new_state.clone();
        }
        prop_assert_eq!(&final_state, &previous);
        prop_assert!(events[events.len() - 1].old_state.ptr_eq(&events[0].new_state));
    }

    #[test]
    fn selector_fires_once_per_projected_change(steps in arbitrary_steps()) {
        let machine = Machine::new(Patch::new().set("step", -1).set("mode", 0));
        machine.add_action(steps_action("run", steps.clone())).unwrap();

        let calls = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&calls);
        let selection = machine.use_selector(
            |state| state.get("mode").cloned(),
            move |_| *sink.lock() += 1,
        );

        block_on(machine.actions().call("run", Value::Null)).unwrap();

        let mut expected = 0;
        let mut mode = 0;
        for patch in &steps {
            let next = patch.get("mode").and_then(Value::as_i64).unwrap_or(mode);
            if next != mode {
                expected += 1;
            }
            mode = next;
        }
        prop_assert_eq!(*calls.lock(), expected);
        prop_assert_eq!(selection.get(), Some(json!(mode)));
    }
}
