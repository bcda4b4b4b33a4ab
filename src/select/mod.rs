//! Selectors: derived values that notify only when they change.
//!
//! A [`Selector`] pairs a pure projection of a machine's state with an
//! equality rule. Subscribing it to a machine yields a [`Selection`] that
//! tracks the projected value and invokes a consumer once per `step` whose
//! projected new and old values differ. [`connect`] builds on the same
//! mechanism to keep a consumer's output in sync with a slice of state.

mod connect;
mod selector;

pub use connect::{connect, Connected, Connector};
pub use selector::{BoundSelector, Selection, Selector};
