//! Partial state updates produced by actions.

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Error returned when a JSON value cannot be used as a patch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("a patch must be a JSON object, got {found}")]
pub struct PatchError {
    pub found: String,
}

/// An ordered set of field updates to merge into a snapshot.
///
/// Setting a field that is already present replaces its value but keeps
/// its original position.
///
/// # Example
///
/// ```rust
/// use arbor::core::Patch;
/// use serde_json::json;
///
/// let patch = Patch::new()
///     .set("loadState", "loading")
///     .set("data", json!({ "guid": "abc" }));
///
/// assert_eq!(patch.len(), 2);
/// assert_eq!(patch.get("loadState"), Some(&json!("loading")));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    entries: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Patch {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Patch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut patch = Patch::new();
        for (key, value) in iter {
            patch.insert(key, value);
        }
        patch
    }
}

impl TryFrom<Value> for Patch {
    type Error = PatchError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(PatchError {
                found: kind_of(&other).to_string(),
            }),
        }
    }
}

impl From<Patch> for Value {
    fn from(patch: Patch) -> Self {
        Value::Object(patch.entries.into_iter().collect())
    }
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
