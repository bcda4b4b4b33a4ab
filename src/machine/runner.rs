//! Action registration and execution.
//!
//! Running an action follows a fixed protocol:
//!
//! 1. announce `init` with the state at invocation,
//! 2. commit each produced patch in order, announcing one `step` per patch,
//! 3. announce exactly one `complete`, whatever happened in between.
//!
//! A body that fails (or panics) is never turned into committed state; the
//! caller receives the error instead. Dropping the returned future stops the
//! action at its current suspension point and still announces `complete`.

use super::container::InitMarker;
use super::{check_name, Machine};
use crate::action::{Action, ActionError, ActionKind, Emit};
use crate::builder::ConfigurationError;
use crate::core::Snapshot;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use stillwater::effect::Effect;

impl Machine {
    /// Register `action`, replacing any earlier action of the same name.
    pub fn add_action(&self, action: Action) -> Result<ActionHandle, ConfigurationError> {
        let (name, kind) = action.into_parts();
        check_name(&name)?;
        if self.has_child(&name) {
            return Err(ConfigurationError::NameConflict(name));
        }

        let mut actions = self.inner.actions.write();
        match actions.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                tracing::debug!(machine = %self.display_name(), action = %name, "replacing action");
                entry.1 = kind.clone();
            }
            None => actions.push((name.clone(), kind.clone())),
        }
        Ok(ActionHandle {
            machine: self.clone(),
            name,
            kind,
        })
    }

    /// Register several actions, in order. Stops at the first error.
    pub fn add_actions<I>(&self, actions: I) -> Result<Vec<ActionHandle>, ConfigurationError>
    where
        I: IntoIterator<Item = Action>,
    {
        actions
            .into_iter()
            .map(|action| self.add_action(action))
            .collect()
    }

    /// Handle for the action currently registered as `name`.
    pub fn action(&self, name: &str) -> Option<ActionHandle> {
        self.inner
            .actions
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, kind)| ActionHandle {
                machine: self.clone(),
                name: n.clone(),
                kind: kind.clone(),
            })
    }

    pub(crate) fn action_names(&self) -> Vec<String> {
        self.inner
            .actions
            .read()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

/// A registered action bound to its machine.
///
/// The handle keeps the body it was created with, even if the action is
/// later replaced on the machine.
#[derive(Clone)]
pub struct ActionHandle {
    machine: Machine,
    name: String,
    kind: ActionKind,
}

impl ActionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Run the action and resolve to the machine's state once it completes.
    pub async fn invoke(&self, args: Value) -> Result<Snapshot, ActionError> {
        run(&self.machine, &self.name, &self.kind, args).await
    }

    /// Run the action without arguments.
    pub async fn call(&self) -> Result<Snapshot, ActionError> {
        self.invoke(Value::Null).await
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Announces `complete` exactly once, even if the action future is dropped
/// or a listener panics.
struct Completion<'a> {
    machine: &'a Machine,
    action: &'a str,
    marker: Option<InitMarker>,
}

impl<'a> Completion<'a> {
    fn new(machine: &'a Machine, action: &'a str) -> Self {
        Self {
            machine,
            action,
            marker: None,
        }
    }

    fn begin(&mut self) {
        self.machine.begin(self.action, &mut self.marker);
    }

    fn finish(mut self) -> Snapshot {
        match self.marker.take() {
            Some(marker) => self.machine.finish(self.action, &marker),
            None => self.machine.get_state(),
        }
    }
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if let Some(marker) = self.marker.take() {
            tracing::debug!(action = self.action, "action dropped before completion");
            self.machine.finish(self.action, &marker);
        }
    }
}

/// Drive one invocation through `init`, its steps and `complete`.
///
/// Panics raised by the body or by any listener along the way are reported
/// as [`ActionError::Panicked`]; the first one wins.
async fn run(
    machine: &Machine,
    name: &str,
    kind: &ActionKind,
    args: Value,
) -> Result<Snapshot, ActionError> {
    let mut completion = Completion::new(machine, name);
    let outcome = AssertUnwindSafe(async {
        completion.begin();
        drive(machine, name, kind, args).await
    })
    .catch_unwind()
    .await;
    let finished = panic::catch_unwind(AssertUnwindSafe(move || completion.finish()));

    let panicked = |payload: Box<dyn Any + Send>| ActionError::Panicked {
        action: name.to_string(),
        message: panic_message(payload.as_ref()),
    };
    let error = match (outcome, finished) {
        (Ok(Ok(())), Ok(final_state)) => return Ok(final_state),
        (Ok(Err(error)), _) => error,
        (Err(payload), _) | (Ok(Ok(())), Err(payload)) => panicked(payload),
    };
    tracing::warn!(
        machine = %machine.display_name(),
        action = name,
        error = %error,
        "action failed"
    );
    Err(error)
}

async fn drive(
    machine: &Machine,
    name: &str,
    kind: &ActionKind,
    args: Value,
) -> Result<(), ActionError> {
    let failed = |failure| ActionError::Failed {
        action: name.to_string(),
        failure,
    };

    match kind {
        ActionKind::Sync(factory) => {
            let patch = factory(args).run(machine).await.map_err(failed)?;
            machine.commit(name, &patch)?;
        }
        ActionKind::Sequence(factory) => {
            let mut steps = factory(machine.clone(), args);
            while let Some(item) = steps.next().await {
                match item.map_err(failed)? {
                    Emit::Patch(patch) => {
                        machine.commit(name, &patch)?;
                    }
                    Emit::Return(patch) => {
                        machine.commit(name, &patch)?;
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
