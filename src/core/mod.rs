//! Core value types of the state container.
//!
//! This module holds the pure data the rest of the crate moves around:
//! - Immutable state snapshots and the patches merged into them
//! - Paths addressing machines inside a tree
//! - Lifecycle events announced to listeners
//!
//! Nothing here performs I/O or holds locks.

mod event;
mod patch;
mod path;
mod snapshot;

pub use event::{Event, EventKind};
pub use patch::{Patch, PatchError};
pub use path::Path;
pub use snapshot::Snapshot;
