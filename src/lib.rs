//! Arbor: a hierarchical reactive state container
//!
//! Arbor keeps application state in immutable snapshots that only change
//! through named, possibly asynchronous actions. Following Stillwater's
//! "pure core, imperative shell" split, the value types in [`core`] are plain
//! data with pure operations, while [`machine`] owns the locks, listeners
//! and action runner.
//!
//! # Core Concepts
//!
//! - **Snapshot / Patch**: immutable state and the shallow updates merged into it
//! - **Action**: a sync effect or a stream of patches, committed one step at a time
//! - **Events**: `init`, `step` and `complete`, announced to listeners in order
//! - **Composition**: sub-machines mirrored read-only into their parent's state
//! - **Selectors**: derived values that notify only when they change
//!
//! # Example
//!
//! ```rust
//! use arbor::{patch, Action, Emit, EventKind, Machine};
//! use futures::stream;
//! use serde_json::Value;
//! use std::sync::{Arc, Mutex};
//!
//! # futures::executor::block_on(async {
//! let loader = Machine::new(patch! { "loadState" => "new", "data" => null });
//! loader
//!     .add_action(Action::sequence("start", |_machine, _args| {
//!         stream::iter(vec![
//!             Ok(Emit::Patch(patch! { "loadState" => "loading" })),
//!             Ok(Emit::Patch(patch! { "loadState" => "ready", "data" => 42 })),
//!         ])
//!     }))
//!     .unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _subscription = loader.listen(EventKind::Step, move |event| {
//!     sink.lock().unwrap().push(event.new_state.get("loadState").cloned());
//! });
//!
//! let state = loader.actions().call("start", Value::Null).await.unwrap();
//! assert_eq!(state.get("data").unwrap(), 42);
//! assert_eq!(seen.lock().unwrap().len(), 2);
//! # });
//! ```

pub mod action;
pub mod builder;
pub mod config;
pub mod core;
pub mod machine;
pub mod select;

#[doc(hidden)]
pub use serde_json as __serde_json;

// Re-export commonly used types
pub use crate::action::{Action, ActionError, ActionFailure, ActionKind, Emit, PatchStream};
pub use crate::builder::{
    patch_action, steps_action, ActionBuilder, ConfigurationError, MachineBuilder,
};
pub use crate::config::MachineConfig;
pub use crate::core::{Event, EventKind, Patch, Path, Snapshot};
pub use crate::machine::{
    ActionHandle, Actions, Machine, MachineId, OutOfRangeError, Unsubscribe, RESERVED_NAMES,
};
pub use crate::select::{connect, BoundSelector, Connected, Connector, Selection, Selector};
