//! Action declarations.
//!
//! An action is a named unit of work that produces state patches. The shape
//! of the work is declared explicitly with [`ActionKind`] so the runner never
//! has to guess how to drive it:
//!
//! - [`ActionKind::Sync`] wraps a Stillwater effect that yields one patch,
//!   run with the owning machine as its environment.
//! - [`ActionKind::Sequence`] wraps a stream of patches that may suspend
//!   between steps.
//!
//! # Example
//!
//! ```rust
//! use arbor::action::{Action, Emit};
//! use arbor::patch;
//! use futures::stream;
//!
//! let reset = Action::sync_fn("reset", |_machine, _args| Ok(patch! { "loadState" => "new" }));
//!
//! let start = Action::sequence("start", |_machine, _args| {
//!     stream::iter(vec![
//!         Ok(Emit::Patch(patch! { "loadState" => "loading" })),
//!         Ok(Emit::Patch(patch! { "loadState" => "ready", "data" => 42 })),
//!     ])
//! });
//!
//! assert_eq!(reset.name(), "reset");
//! assert!(start.is_sequence());
//! ```

mod error;

pub use error::{ActionError, ActionFailure};

use crate::core::Patch;
use crate::machine::Machine;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;
use stillwater::prelude::*;

/// One item produced by a sequence action.
#[derive(Clone, Debug, PartialEq)]
pub enum Emit {
    /// Commit this patch and keep going.
    Patch(Patch),
    /// Commit this patch and finish; the stream is not polled again.
    Return(Patch),
}

/// Stream driven by the runner for sequence actions.
pub type PatchStream = BoxStream<'static, Result<Emit, ActionFailure>>;

/// Factory for one-shot actions. Called once per invocation.
pub type SyncAction =
    Arc<dyn Fn(Value) -> BoxedEffect<Patch, ActionFailure, Machine> + Send + Sync>;

/// Factory for multi-step actions. Called once per invocation.
pub type SequenceAction = Arc<dyn Fn(Machine, Value) -> PatchStream + Send + Sync>;

/// How an action produces its patches.
#[derive(Clone)]
pub enum ActionKind {
    Sync(SyncAction),
    Sequence(SequenceAction),
}

impl ActionKind {
    pub fn sync<F>(factory: F) -> Self
    where
        F: Fn(Value) -> BoxedEffect<Patch, ActionFailure, Machine> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(factory))
    }

    /// Wrap a plain function as an effect that reads the machine it runs on.
    pub fn sync_fn<F>(body: F) -> Self
    where
        F: Fn(&Machine, &Value) -> Result<Patch, ActionFailure> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        Self::sync(move |args: Value| {
            let body = Arc::clone(&body);
            from_fn(move |machine: &Machine| body(machine, &args)).boxed()
        })
    }

    pub fn sequence<F, S>(factory: F) -> Self
    where
        F: Fn(Machine, Value) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Emit, ActionFailure>> + Send + 'static,
    {
        Self::Sequence(Arc::new(
            move |machine: Machine, args: Value| -> PatchStream { factory(machine, args).boxed() },
        ))
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Sync"),
            Self::Sequence(_) => f.write_str("Sequence"),
        }
    }
}

/// A named action declaration, ready to be registered on a machine.
#[derive(Clone, Debug)]
pub struct Action {
    name: String,
    kind: ActionKind,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// One-shot action from an effect factory.
    pub fn sync<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Value) -> BoxedEffect<Patch, ActionFailure, Machine> + Send + Sync + 'static,
    {
        Self::new(name, ActionKind::sync(factory))
    }

    /// One-shot action from a plain function of the machine and arguments.
    pub fn sync_fn<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Machine, &Value) -> Result<Patch, ActionFailure> + Send + Sync + 'static,
    {
        Self::new(name, ActionKind::sync_fn(body))
    }

    /// Multi-step action from a stream factory.
    pub fn sequence<F, S>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Machine, Value) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Emit, ActionFailure>> + Send + 'static,
    {
        Self::new(name, ActionKind::sequence(factory))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, ActionKind::Sequence(_))
    }

    pub(crate) fn into_parts(self) -> (String, ActionKind) {
        (self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn constructors_tag_the_kind() {
        let sync = Action::sync_fn("reset", |_m, _a| Ok(Patch::new()));
        let seq = Action::sequence("start", |_m, _a| stream::empty());

        assert!(!sync.is_sequence());
        assert!(seq.is_sequence());
        assert_eq!(format!("{:?}", seq.kind()), "Sequence");
    }

    #[test]
    fn sync_accepts_effect_factories() {
        let action = Action::sync("fixed", |_args| pure(Patch::new().set("a", 1)).boxed());
        assert_eq!(action.name(), "fixed");
        assert!(matches!(action.kind(), ActionKind::Sync(_)));
    }
}
