//! State access, commits and lifecycle announcements.
//!
//! Every state change goes through [`Machine::commit`]. A commit holds the
//! dispatch lock of the acting machine and of each ancestor, merges the
//! patch, mirrors the new state up through the ancestors and only then
//! notifies listeners, child first. Listeners therefore always observe a
//! tree in which every parent agrees with its sub-machines.

use super::Machine;
use crate::action::ActionError;
use crate::core::{Event, EventKind, Patch, Path, Snapshot};
use chrono::Utc;
use parking_lot::ReentrantMutexGuard;
use std::sync::Arc;
use thiserror::Error;

/// Returned when `get_state_up` climbs past the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No such ancestor: requested {requested} level(s) up, but only {available} exist")]
pub struct OutOfRangeError {
    pub requested: usize,
    pub available: usize,
}

/// One machine on the way from an acting machine to its root.
pub(super) struct Level {
    pub(super) machine: Machine,
    /// Where the acting machine sits, seen from this level.
    pub(super) path: Path,
    /// Name this machine is attached under in the next level.
    pub(super) attached_as: Option<String>,
}

/// States of a lineage captured when an action starts.
pub(super) struct InitMarker {
    states: Vec<(super::MachineId, Snapshot)>,
}

impl InitMarker {
    fn state_of(&self, machine: &Machine) -> Option<&Snapshot> {
        self.states
            .iter()
            .find(|(id, _)| *id == machine.id())
            .map(|(_, s)| s)
    }
}

impl Machine {
    /// Current snapshot of this machine.
    pub fn get_state(&self) -> Snapshot {
        self.inner.state.read().clone()
    }

    /// Snapshot of the ancestor `up` levels above this machine.
    ///
    /// `get_state_up(0)` is this machine's own state.
    pub fn get_state_up(&self, up: usize) -> Result<Snapshot, OutOfRangeError> {
        let mut current = self.clone();
        for climbed in 0..up {
            current = current.parent().ok_or(OutOfRangeError {
                requested: up,
                available: climbed,
            })?;
        }
        Ok(current.get_state())
    }

    /// The machine this one is attached to, if any.
    pub fn parent(&self) -> Option<Machine> {
        self.inner
            .parent
            .get()
            .and_then(|link| link.machine.upgrade())
            .map(|inner| Machine { inner })
    }

    /// Name this machine is attached under, if any.
    pub fn attached_as(&self) -> Option<&str> {
        self.inner.parent.get().map(|link| link.name.as_str())
    }

    /// Qualified path of this machine, from its root.
    pub fn path(&self) -> Path {
        self.lineage()
            .pop()
            .map(|level| level.path)
            .unwrap_or_default()
    }

    pub fn root(&self) -> Machine {
        self.lineage()
            .pop()
            .map(|level| level.machine)
            .unwrap_or_else(|| self.clone())
    }

    /// This machine followed by each live ancestor, nearest first.
    pub(super) fn lineage(&self) -> Vec<Level> {
        let mut levels = Vec::new();
        let mut current = self.clone();
        let mut path = Path::root();
        loop {
            let link = current.inner.parent.get();
            let parent = link.and_then(|l| l.machine.upgrade()).map(|inner| Machine { inner });
            let attached_as = parent.as_ref().and(link).map(|l| l.name.clone());
            levels.push(Level {
                machine: current.clone(),
                path: path.clone(),
                attached_as: attached_as.clone(),
            });
            match (parent, attached_as) {
                (Some(parent), Some(name)) => {
                    path = path.prefixed(&name);
                    current = parent;
                }
                _ => break,
            }
        }
        levels
    }

    /// Swap in the mirrored state of sub-machine `name`.
    pub(super) fn mirror(&self, name: &str, child_state: &Snapshot) -> (Snapshot, Snapshot) {
        let mut state = self.inner.state.write();
        let old = state.clone();
        let new = old.with_field(name, Arc::new(child_state.to_value()));
        *state = new.clone();
        (old, new)
    }

    /// Run `f` while holding the dispatch lock of this machine and of every
    /// ancestor, child first.
    ///
    /// An ancestor can gain a parent while this call waits for its lock, so
    /// the lineage is walked again once every lock is held. If it grew, the
    /// locks are released and taken again along the new lineage.
    pub(super) fn with_lineage_locked<R>(&self, f: impl FnOnce(&[Level]) -> R) -> R {
        loop {
            let lineage = self.lineage();
            let held = lock_all(&lineage);
            if same_lineage(&lineage, &self.lineage()) {
                let result = f(&lineage);
                drop(held);
                return result;
            }
            drop(held);
            tracing::trace!(machine = %self.display_name(), "lineage changed while locking; retrying");
        }
    }

    /// Merge `patch` into this machine and announce one `step` per level.
    pub(crate) fn commit(&self, action: &str, patch: &Patch) -> Result<Snapshot, ActionError> {
        self.with_lineage_locked(|lineage| {
            if let Some(field) = patch.keys().find(|key| self.has_child(key)) {
                return Err(ActionError::ReadOnlyField {
                    action: action.to_string(),
                    field: field.to_string(),
                });
            }

            let (old, new) = {
                let mut state = self.inner.state.write();
                let old = state.clone();
                let new = old.merge(patch);
                *state = new.clone();
                (old, new)
            };
            self.trace(action, EventKind::Step, &old, &new);

            let mut changes = vec![(new.clone(), old)];
            changes.extend(propagate(lineage, new.clone()));
            for (level, (new_state, old_state)) in lineage.iter().zip(changes) {
                level.announce(EventKind::Step, action, new_state, old_state);
            }
            Ok(new)
        })
    }

    /// Announce `init` on this machine and its ancestors.
    ///
    /// `marker` is filled in before any listener runs, so `complete` can
    /// still be announced if an `init` listener panics.
    pub(super) fn begin(&self, action: &str, marker: &mut Option<InitMarker>) {
        self.with_lineage_locked(|lineage| {
            let states: Vec<_> = lineage
                .iter()
                .map(|level| (level.machine.id(), level.machine.get_state()))
                .collect();
            *marker = Some(InitMarker {
                states: states.clone(),
            });

            if let Some((_, state)) = states.first() {
                self.trace(action, EventKind::Init, state, state);
            }
            for (level, (_, state)) in lineage.iter().zip(states) {
                level.announce(EventKind::Init, action, state.clone(), state);
            }
        })
    }

    /// Announce `complete` on this machine and its ancestors.
    ///
    /// Each level pairs its current state with its state at `init`. Levels
    /// attached while the action ran pair their current state with itself.
    pub(super) fn finish(&self, action: &str, marker: &InitMarker) -> Snapshot {
        self.with_lineage_locked(|lineage| {
            let final_state = self.get_state();
            let initial = marker
                .state_of(self)
                .cloned()
                .unwrap_or_else(|| final_state.clone());
            self.trace(action, EventKind::Complete, &initial, &final_state);

            for level in lineage {
                let current = level.machine.get_state();
                let at_init = marker
                    .state_of(&level.machine)
                    .cloned()
                    .unwrap_or_else(|| current.clone());
                level.announce(EventKind::Complete, action, current, at_init);
            }
            final_state
        })
    }

    fn trace(&self, action: &str, kind: EventKind, before: &Snapshot, after: &Snapshot) {
        if self.is_logging() {
            tracing::info!(
                target: "arbor::trace",
                machine = %self.display_name(),
                action,
                phase = %kind,
                before = %before,
                after = %after,
                "[{action} {kind}]"
            );
        }
    }
}

impl Level {
    fn announce(&self, kind: EventKind, action: &str, new_state: Snapshot, old_state: Snapshot) {
        self.machine.inner.bus.announce(&Event {
            kind,
            action: action.to_string(),
            path: self.path.clone(),
            new_state,
            old_state,
            timestamp: Utc::now(),
        });
    }
}

fn same_lineage(a: &[Level], b: &[Level]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.machine.ptr_eq(&y.machine) && x.attached_as == y.attached_as
        })
}

fn lock_all(lineage: &[Level]) -> Vec<ReentrantMutexGuard<'_, ()>> {
    lineage
        .iter()
        .map(|level| level.machine.inner.dispatch.lock())
        .collect()
}

/// Mirror `state` of `lineage[0]` into each ancestor in turn.
///
/// Returns the `(new, old)` pair of every ancestor, nearest first.
pub(super) fn propagate(lineage: &[Level], state: Snapshot) -> Vec<(Snapshot, Snapshot)> {
    let mut changes = Vec::with_capacity(lineage.len().saturating_sub(1));
    let mut child_state = state;
    for pair in lineage.windows(2) {
        let Some(name) = pair[0].attached_as.as_deref() else {
            break;
        };
        let (old, new) = pair[1].machine.mirror(name, &child_state);
        changes.push((new.clone(), old));
        child_state = new;
    }
    changes
}
