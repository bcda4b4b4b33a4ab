//! Sub-machine attachment and the live action registry view.

use super::container::propagate;
use super::runner::ActionHandle;
use super::{check_name, Machine, ParentLink};
use crate::action::ActionError;
use crate::builder::ConfigurationError;
use crate::core::Snapshot;
use serde_json::Value;
use std::sync::Arc;

impl Machine {
    /// Attach `child` under `name`.
    ///
    /// The child's state appears, read-only, under `name` in this machine's
    /// state (and in every ancestor's), and every child event is re-announced
    /// here with `name` prefixed to its path. Attaching is structural: it
    /// updates the mirrors but announces nothing.
    pub fn add_sub_machine(
        &self,
        name: impl Into<String>,
        child: Machine,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        check_name(&name)?;

        if self.lineage().iter().any(|level| level.machine.ptr_eq(&child)) {
            return Err(ConfigurationError::Cycle(name));
        }

        let _child = child.inner.dispatch.lock();
        self.with_lineage_locked(|lineage| {
            if lineage.iter().any(|level| level.machine.ptr_eq(&child)) {
                return Err(ConfigurationError::Cycle(name.clone()));
            }
            if self.has_child(&name) {
                return Err(ConfigurationError::DuplicateChild(name.clone()));
            }
            if self.has_action(&name) {
                return Err(ConfigurationError::NameConflict(name.clone()));
            }
            if let Some(existing) = child.attached_as() {
                return Err(ConfigurationError::AlreadyAttached(existing.to_string()));
            }
            child
                .inner
                .parent
                .set(ParentLink {
                    machine: Arc::downgrade(&self.inner),
                    name: name.clone(),
                })
                .map_err(|_| ConfigurationError::AlreadyAttached(name.clone()))?;
            self.inner
                .children
                .write()
                .push((name.clone(), child.clone()));

            let (_, mirrored) = self.mirror(&name, &child.get_state());
            propagate(lineage, mirrored);
            Ok(())
        })?;

        tracing::debug!(
            parent = %self.display_name(),
            child = %name,
            "attached sub-machine"
        );
        Ok(())
    }

    /// Attach several sub-machines, in order. Stops at the first error.
    pub fn add_sub_machines<I, N>(&self, children: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = (N, Machine)>,
        N: Into<String>,
    {
        children
            .into_iter()
            .try_for_each(|(name, child)| self.add_sub_machine(name, child))
    }

    pub fn child(&self, name: &str) -> Option<Machine> {
        self.inner
            .children
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.clone())
    }

    /// Sub-machine names in attachment order.
    pub fn child_names(&self) -> Vec<String> {
        self.inner
            .children
            .read()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Live view of this machine's actions and, through `child`, of every
    /// sub-machine's actions.
    pub fn actions(&self) -> Actions {
        Actions {
            machine: self.clone(),
        }
    }
}

/// Read-only, always-current view of a machine's action registry.
#[derive(Clone, Debug)]
pub struct Actions {
    machine: Machine,
}

impl Actions {
    pub fn get(&self, name: &str) -> Option<ActionHandle> {
        self.machine.action(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.machine.has_action(name)
    }

    /// Action names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.machine.action_names()
    }

    /// Actions of sub-machine `name`.
    pub fn child(&self, name: &str) -> Option<Actions> {
        self.machine.child(name).map(|machine| machine.actions())
    }

    /// Invoke action `name` with `args`.
    pub async fn call(&self, name: &str, args: Value) -> Result<Snapshot, ActionError> {
        let handle = self
            .get(name)
            .ok_or_else(|| ActionError::Unknown(name.to_string()))?;
        handle.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::core::{EventKind, Patch, Path};
    use parking_lot::Mutex;
    use serde_json::json;

    fn counter() -> Machine {
        let machine = Machine::new(Patch::new().set("count", 0));
        machine
            .add_action(Action::sync_fn("increment", |m, _args| {
                let count = m.get_state().get("count").and_then(Value::as_i64).unwrap_or(0);
                Ok(Patch::new().set("count", count + 1))
            }))
            .unwrap();
        machine
    }

    #[test]
    fn attach_mirrors_child_state() {
        let root = Machine::new(Patch::new().set("count", 0));
        let child = counter();
        root.add_sub_machine("counter", child).unwrap();

        let state = root.get_state();
        assert_eq!(state.get("counter"), Some(&json!({ "count": 0 })));
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["count", "counter"]);
    }

    #[test]
    fn attaching_into_a_subtree_updates_every_ancestor() {
        let root = Machine::new(Patch::new());
        let kid = Machine::new(Patch::new().set("k", 1));
        root.add_sub_machine("kid", kid.clone()).unwrap();
        kid.add_sub_machine("gc", Machine::new(Patch::new().set("g", 2)))
            .unwrap();

        assert_eq!(
            root.get_state().get("kid"),
            Some(&json!({ "k": 1, "gc": { "g": 2 } }))
        );
    }

    #[test]
    fn attach_announces_nothing() {
        let root = Machine::new(Patch::new());
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let _sub = root.listen_all(move |_| *sink.lock() += 1);

        root.add_sub_machine("kid", Machine::new(Patch::new())).unwrap();
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn machine_can_only_be_attached_once() {
        let child = Machine::new(Patch::new());
        let first = Machine::new(Patch::new());
        let second = Machine::new(Patch::new());
        first.add_sub_machine("a", child.clone()).unwrap();

        let err = second.add_sub_machine("b", child.clone()).unwrap_err();
        assert_eq!(err, ConfigurationError::AlreadyAttached("a".to_string()));
        assert!(!second.has_child("b"));
        assert_eq!(child.path(), Path::from(["a"]));
    }

    #[test]
    fn attaching_an_ancestor_is_a_cycle() {
        let root = Machine::new(Patch::new());
        let kid = Machine::new(Patch::new());
        root.add_sub_machine("kid", kid.clone()).unwrap();

        assert_eq!(
            kid.add_sub_machine("up", root.clone()),
            Err(ConfigurationError::Cycle("up".to_string()))
        );
        assert_eq!(
            root.add_sub_machine("me", root.clone()),
            Err(ConfigurationError::Cycle("me".to_string()))
        );
    }

    #[test]
    fn child_names_must_be_unique_and_free() {
        let root = counter();
        root.add_sub_machine("a", Machine::new(Patch::new())).unwrap();

        assert_eq!(
            root.add_sub_machine("a", Machine::new(Patch::new())),
            Err(ConfigurationError::DuplicateChild("a".to_string()))
        );
        assert_eq!(
            root.add_sub_machine("increment", Machine::new(Patch::new())),
            Err(ConfigurationError::NameConflict("increment".to_string()))
        );
        assert_eq!(
            root.add_sub_machine("listen", Machine::new(Patch::new())),
            Err(ConfigurationError::ReservedName("listen".to_string()))
        );
    }

    #[test]
    fn add_sub_machines_keeps_declaration_order() {
        let root = Machine::new(Patch::new());
        root.add_sub_machines(vec![
            ("zeta", Machine::new(Patch::new())),
            ("alpha", Machine::new(Patch::new())),
        ])
        .unwrap();

        assert_eq!(root.child_names(), vec!["zeta", "alpha"]);
        assert_eq!(root.get_state().keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn actions_view_reaches_child_actions() {
        let root = Machine::new(Patch::new());
        let child = counter();
        root.add_sub_machine("counter", child.clone()).unwrap();

        let child_actions = root.actions().child("counter").unwrap();
        assert_eq!(child_actions.names(), vec!["increment"]);

        child_actions.call("increment", Value::Null).await.unwrap();
        assert_eq!(root.get_state().get("counter"), Some(&json!({ "count": 1 })));

        // The view is live: actions added later show up.
        child
            .add_action(Action::sync_fn("reset", |_m, _a| Ok(Patch::new().set("count", 0))))
            .unwrap();
        assert!(child_actions.contains("reset"));
    }

    #[tokio::test]
    async fn unknown_action_is_reported() {
        let machine = Machine::new(Patch::new());
        let err = machine.actions().call("nope", Value::Null).await.unwrap_err();
        assert_eq!(err, ActionError::Unknown("nope".to_string()));
    }

    #[tokio::test]
    async fn child_step_reaches_root_with_path() {
        let root = Machine::new(Patch::new());
        let child = counter();
        root.add_sub_machine("counter", child.clone()).unwrap();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&paths);
        let _sub = root.listen(EventKind::Step, move |e| sink.lock().push(e.path.clone()));

        child.actions().call("increment", Value::Null).await.unwrap();
        assert_eq!(*paths.lock(), vec![Path::from(["counter"])]);
    }
}
