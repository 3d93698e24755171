//! Hierarchical node paths.
//!
//! Every configuration node is addressed by a colon-separated path such as
//! `rules:items:0`. Children always live strictly below their parent's path,
//! which is what placeholder targeting relies on. Comparison ignores ASCII case,
//! matching hierarchical configuration-key semantics.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// Segment separator.
pub const SEPARATOR: char = ':';

/// Colon-separated node address. Cheap to clone.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodePath(Arc<str>);

impl NodePath {
    /// Build a path, dropping leading/trailing separators and empty segments.
    pub fn new(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref();
        if raw.split(SEPARATOR).all(|s| !s.is_empty()) {
            return Self(Arc::from(raw));
        }
        let joined = raw
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(":");
        Self(Arc::from(joined))
    }

    /// The empty path: an ancestor of every other path.
    pub fn root() -> Self {
        Self(Arc::from(""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one segment.
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        if self.is_root() {
            Self::new(segment.to_string())
        } else {
            Self::new(format!("{}{}{}", self.0, SEPARATOR, segment))
        }
    }

    /// The enclosing path; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => Some(Self(Arc::from(&self.0[..idx]))),
            None => Some(Self::root()),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Final segment; `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments().last()
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &NodePath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        let (own, prefix) = (self.0.as_bytes(), ancestor.0.as_bytes());
        own.len() > prefix.len()
            && own[..prefix.len()].eq_ignore_ascii_case(prefix)
            && own[prefix.len()] == SEPARATOR as u8
    }

    /// Equal to `ancestor` or strictly below it.
    pub fn is_self_or_descendant_of(&self, ancestor: &NodePath) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }
}

impl PartialEq for NodePath {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for NodePath {}

impl Hash for NodePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({})", self)
    }
}

impl FromStr for NodePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for NodePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodePath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<NodePath> for String {
    fn from(value: NodePath) -> Self {
        value.0.to_string()
    }
}
