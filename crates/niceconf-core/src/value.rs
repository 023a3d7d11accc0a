//! Configuration value types
//!
//! The parsed tree is made of dictionaries, lists, text, unsigned integers
//! and booleans. `Unresolved` stands in wherever a reference could not be
//! matched against the environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A node of a parsed configuration tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// A reference that did not match anything (serialized as `null`)
    #[default]
    Unresolved,
    /// Boolean value
    Bool(bool),
    /// Unsigned integer value
    Integer(u64),
    /// Quoted text
    String(String),
    /// Ordered list of values
    Sequence(Vec<Value>),
    /// Dictionary of keys to values, in insertion order
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Create an empty dictionary
    pub fn mapping() -> Self {
        Value::Mapping(IndexMap::new())
    }

    /// Check if this value is unresolved
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved)
    }

    /// Check if this value is a boolean
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Check if this value is an integer
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as u64 if this is an Integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a dotted path (e.g., "database.host", "servers.0" or "servers[0]")
    ///
    /// An empty path addresses `self`. A numeric segment indexes into a
    /// sequence. Returns `None` as soon as a segment is missing.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let segments = parse_path(path)?;
        let mut current = self;

        for segment in &segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Mapping(map)) => map.get(key.as_str())?,
                (PathSegment::Key(key), Value::Sequence(seq)) => {
                    seq.get(key.parse::<usize>().ok()?)?
                }
                (PathSegment::Index(idx), Value::Sequence(seq)) => seq.get(*idx)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Look up a dotted path, falling back to `default` when it is missing
    pub fn lookup_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.lookup(path).unwrap_or(default)
    }

    /// Get a value by path, failing with `PathNotFound` when it is missing
    pub fn get_path(&self, path: &str) -> Result<&Value> {
        self.lookup(path).ok_or_else(|| Error::path_not_found(path))
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unresolved => "unresolved",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

/// Write `value` at `segments` below `map`, creating dictionaries on the way
///
/// An intermediate node that exists but is not a dictionary is replaced by
/// an empty one, so the later entry wins. An empty path writes nothing.
pub fn insert_path(map: &mut IndexMap<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        log::debug!("Dropping value with an empty key path");
        return;
    };

    let mut current = map;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(Value::mapping);
        if !slot.is_mapping() {
            log::debug!(
                "Replacing {} at '{}' with a dictionary",
                slot.type_name(),
                segment
            );
            *slot = Value::mapping();
        }
        let Value::Mapping(next) = slot else {
            unreachable!("slot was just made a mapping")
        };
        current = next;
    }

    current.insert(last.clone(), value);
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unresolved => write!(f, "unresolved"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Integer(i)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

/// A segment in a path expression
#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    /// A key in a mapping (e.g., "database" in "database.host")
    Key(String),
    /// An index in a sequence (e.g., 0 in "servers[0]")
    Index(usize),
}

/// Parse a path string into segments
/// Supports: "key", "key.subkey", "key[0]", "key[0].subkey"
///
/// Empty segments are kept so that "a..b" does not silently match "a.b".
fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    if path.is_empty() {
        return Some(Vec::new());
    }

    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut after_index = false;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !after_index {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                after_index = false;
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                let index_str: String = chars.by_ref().take_while(|&c| c != ']').collect();
                segments.push(PathSegment::Index(index_str.parse().ok()?));
                after_index = true;
            }
            ']' => return None,
            _ => {
                after_index = false;
                current_key.push(c);
            }
        }
    }

    if !current_key.is_empty() || (!after_index && path.ends_with('.')) {
        segments.push(PathSegment::Key(current_key));
    }

    Some(segments)
}
