//! The hierarchical reactive state container.
//!
//! A [`Machine`] owns an immutable state snapshot, a registry of named
//! actions, a set of sub-machines and three listener sets (`init`, `step`,
//! `complete`). It is a cheap, clonable handle; clones share the same
//! machine.
//!
//! # Key Concepts
//!
//! - **State Container**: `get_state` hands out snapshots; only the action
//!   runner commits new ones.
//! - **Action Runner**: drives declared actions and announces their lifecycle.
//! - **Event Bus**: per-machine listeners, delivered in registration order.
//! - **Composition**: sub-machines are mirrored read-only into the parent's
//!   state and their events are re-announced with a qualified path.
//!
//! # Example
//!
//! ```rust
//! use arbor::{patch, Action, Machine};
//! use serde_json::Value;
//!
//! # futures::executor::block_on(async {
//! let counter = Machine::new(patch! { "count" => 0 });
//! let increment = counter
//!     .add_action(Action::sync_fn("increment", |machine, _args| {
//!         let count = machine.get_state().get("count").and_then(Value::as_i64).unwrap_or(0);
//!         Ok(patch! { "count" => (count + 1) })
//!     }))
//!     .unwrap();
//!
//! let root = Machine::new(patch! { "title" => "demo" });
//! root.add_sub_machine("counter", counter.clone()).unwrap();
//!
//! increment.invoke(Value::Null).await.unwrap();
//! assert_eq!(root.get_state().get("counter").unwrap()["count"], 1);
//! # });
//! ```

mod bus;
mod compose;
mod container;
mod runner;

pub use bus::{Listener, Unsubscribe};
pub use compose::Actions;
pub use container::OutOfRangeError;
pub use runner::ActionHandle;

use crate::action::ActionKind;
use crate::builder::ConfigurationError;
use crate::core::{Event, EventKind, Patch, Snapshot};
use bus::EventBus;
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use uuid::Uuid;

/// Names that actions and sub-machines may not use.
pub const RESERVED_NAMES: &[&str] = &[
    "get_state",
    "get_state_up",
    "listen",
    "listen_all",
    "action",
    "actions",
    "add_action",
    "add_actions",
    "add_sub_machine",
    "add_sub_machines",
    "child",
    "children",
    "parent",
    "path",
    "log",
    "select",
    "use_selector",
    "connect",
    "state",
];

/// Unique identity of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId(Uuid);

impl MachineId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Non-owning link from a sub-machine to the machine it is attached to.
struct ParentLink {
    machine: Weak<Inner>,
    name: String,
}

struct Inner {
    id: MachineId,
    label: Option<String>,
    state: RwLock<Snapshot>,
    actions: RwLock<Vec<(String, ActionKind)>>,
    children: RwLock<Vec<(String, Machine)>>,
    parent: OnceLock<ParentLink>,
    bus: Arc<EventBus>,
    /// Held while committing and notifying, so deliveries never interleave.
    dispatch: ReentrantMutex<()>,
    logging: AtomicBool,
}

/// Handle to a reactive state container.
#[derive(Clone)]
pub struct Machine {
    inner: Arc<Inner>,
}

impl Machine {
    /// Create a root machine holding `initial` as its state.
    pub fn new(initial: Patch) -> Self {
        Self::with_parts(Snapshot::from(initial), None, false)
    }

    /// Create a machine from a JSON object.
    pub fn from_value(initial: Value) -> Result<Self, ConfigurationError> {
        let snapshot = Snapshot::try_from(initial)
            .map_err(|e| ConfigurationError::NotAnObject(e.found))?;
        Ok(Self::with_parts(snapshot, None, false))
    }

    pub fn builder() -> crate::builder::MachineBuilder {
        crate::builder::MachineBuilder::new()
    }

    pub(crate) fn with_parts(state: Snapshot, label: Option<String>, logging: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: MachineId::new(),
                label,
                state: RwLock::new(state),
                actions: RwLock::new(Vec::new()),
                children: RwLock::new(Vec::new()),
                parent: OnceLock::new(),
                bus: Arc::new(EventBus::default()),
                dispatch: ReentrantMutex::new(()),
                logging: AtomicBool::new(logging),
            }),
        }
    }

    pub fn id(&self) -> MachineId {
        self.inner.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// True if both handles refer to the same machine.
    pub fn ptr_eq(&self, other: &Machine) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register `listener` for one event kind.
    pub fn listen<F>(&self, kind: EventKind, listener: F) -> Unsubscribe
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(&[kind], Arc::new(listener))
    }

    /// Register `listener` for `init`, `step` and `complete` at once.
    pub fn listen_all<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(&EventKind::ALL, Arc::new(listener))
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.bus.listener_count(kind)
    }

    /// Toggle diagnostic trace lines for actions run on this machine.
    pub fn log(&self, enabled: bool) {
        self.inner.logging.store(enabled, Ordering::Relaxed);
    }

    pub fn is_logging(&self) -> bool {
        self.inner.logging.load(Ordering::Relaxed)
    }

    /// Name used in trace output: the label, else the path from the root.
    pub(crate) fn display_name(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => {
                let path = self.path();
                if path.is_root() {
                    format!("machine-{}", self.id())
                } else {
                    path.to_string()
                }
            }
        }
    }

    pub(crate) fn has_child(&self, name: &str) -> bool {
        self.inner.children.read().iter().any(|(n, _)| n == name)
    }

    pub(crate) fn has_action(&self, name: &str) -> bool {
        self.inner.actions.read().iter().any(|(n, _)| n == name)
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("state", &self.get_state())
            .field("children", &self.child_names())
            .finish()
    }
}

/// Names must be non-empty and must not shadow a machine operation.
pub(crate) fn check_name(name: &str) -> Result<(), ConfigurationError> {
    if name.is_empty() {
        return Err(ConfigurationError::EmptyName);
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(ConfigurationError::ReservedName(name.to_string()));
    }
    Ok(())
}
