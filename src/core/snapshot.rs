//! Immutable state snapshots.
//!
//! A snapshot is the committed state of one machine at one point in time.
//! Every field value lives behind its own `Arc`, so a merge only allocates
//! for the fields it actually touches and everything else stays
//! reference-identical to the previous snapshot.

use super::patch::{kind_of, Patch, PatchError};
use super::path::Path;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Immutable, insertion-ordered mapping of field name to value.
///
/// Cloning a snapshot is cheap and is the only way consumers ever obtain
/// state; there is no way to mutate one in place.
///
/// # Example
///
/// ```rust
/// use arbor::core::{Patch, Snapshot};
/// use serde_json::json;
///
/// let before = Snapshot::from(Patch::new().set("loadState", "new").set("data", json!(null)));
/// let after = before.merge(&Patch::new().set("loadState", "loading"));
///
/// assert_eq!(after.get("loadState"), Some(&json!("loading")));
/// assert!(before.same_field(&after, "data"));
/// assert!(!before.same_field(&after, "loadState"));
/// ```
#[derive(Clone, Default)]
pub struct Snapshot {
    fields: Arc<Vec<(String, Arc<Value>)>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.field(key).map(|value| value.as_ref())
    }

    /// Shared handle to a field value, for identity comparisons.
    pub fn field(&self, key: &str) -> Option<&Arc<Value>> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow, key-wise merge. Returns a new snapshot and leaves `self` untouched.
    pub fn merge(&self, patch: &Patch) -> Snapshot {
        let mut fields: Vec<(String, Arc<Value>)> = self.fields.as_ref().clone();
        for (key, value) in patch.iter() {
            let value = Arc::new(value.clone());
            match fields.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => fields.push((key.to_string(), value)),
            }
        }
        Snapshot {
            fields: Arc::new(fields),
        }
    }

    /// Replace (or append) a single field with an already shared value.
    pub(crate) fn with_field(&self, key: &str, value: Arc<Value>) -> Snapshot {
        let mut fields: Vec<(String, Arc<Value>)> = self.fields.as_ref().clone();
        match fields.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => fields.push((key.to_string(), value)),
        }
        Snapshot {
            fields: Arc::new(fields),
        }
    }

    /// True when both snapshots hold the very same allocation for `key`.
    pub fn same_field(&self, other: &Snapshot, key: &str) -> bool {
        match (self.field(key), other.field(key)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// True when both handles point at the same snapshot.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    /// Owned JSON copy of the whole snapshot.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref().clone()))
                .collect(),
        )
    }

    /// Look up the value addressed by `path`, starting at this snapshot.
    ///
    /// The first segment names a field; later segments walk into nested
    /// objects. The root path yields the whole snapshot.
    pub fn lookup(&self, path: &Path) -> Option<Value> {
        let mut segments = path.segments().iter();
        let Some(first) = segments.next() else {
            return Some(self.to_value());
        };
        let mut current = self.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self
                    .iter()
                    .all(|(key, value)| other.get(key) == Some(value)))
    }
}

impl From<Patch> for Snapshot {
    fn from(patch: Patch) -> Self {
        Snapshot::new().merge(&patch)
    }
}

impl TryFrom<Value> for Snapshot {
    type Error = PatchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Snapshot {
                fields: Arc::new(map.into_iter().map(|(k, v)| (k, Arc::new(v))).collect()),
            }),
            other => Err(PatchError {
                found: kind_of(&other).to_string(),
            }),
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value().to_string())
    }
}
