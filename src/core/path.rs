//! Addresses of machines inside a machine tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered list of child names, relative to the machine that observes it.
///
/// An empty path means "this machine". An event raised by a grandchild
/// reaches the root with the path `[child, grandchild]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New path with `name` in front.
    pub fn prefixed(&self, name: &str) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(name.to_string());
        segments.extend(self.0.iter().cloned());
        Path(segments)
    }

    /// New path with `name` at the end.
    pub fn child(&self, name: &str) -> Path {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Path(segments)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}
