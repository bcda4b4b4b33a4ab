//! Lifecycle events announced by machines.

use super::path::Path;
use super::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Phase of an action that an event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The action started; both states are the state at invocation.
    Init,
    /// One patch was committed.
    Step,
    /// The action finished, successfully or not.
    Complete,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Init, EventKind::Step, EventKind::Complete];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Step => "step",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification delivered to listeners.
///
/// `new_state` and `old_state` always belong to the machine whose listener
/// receives the event. For an event forwarded from a sub-machine, `path`
/// names the originating machine relative to the receiver and
/// [`Event::origin`] recovers that machine's own pair.
///
/// For `step`, `old_state` is the state just before the patch. For
/// `complete`, it is the state when the action started.
#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
    pub action: String,
    pub path: Path,
    pub new_state: Snapshot,
    pub old_state: Snapshot,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// True if the event was raised by the receiving machine itself.
    pub fn is_local(&self) -> bool {
        self.path.is_root()
    }

    /// The originating machine's `(new, old)` state pair.
    pub fn origin(&self) -> Option<(Value, Value)> {
        Some((
            self.new_state.lookup(&self.path)?,
            self.old_state.lookup(&self.path)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Patch;
    use serde_json::json;

    #[test]
    fn kind_names_match_protocol() {
        let names: Vec<_> = EventKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["init", "step", "complete"]);
        assert_eq!(serde_json::to_value(EventKind::Step).unwrap(), json!("step"));
    }

    #[test]
    fn origin_descends_into_mirrored_child_state() {
        let old = Snapshot::from(Patch::new().set("counter", json!({ "count": 0 })));
        let new = old.merge(&Patch::new().set("counter", json!({ "count": 1 })));
        let event = Event {
            kind: EventKind::Step,
            action: "increment".to_string(),
            path: Path::from(["counter"]),
            new_state: new,
            old_state: old,
            timestamp: Utc::now(),
        };

        assert!(!event.is_local());
        let (child_new, child_old) = event.origin().unwrap();
        assert_eq!(child_new, json!({ "count": 1 }));
        assert_eq!(child_old, json!({ "count": 0 }));
    }
}
