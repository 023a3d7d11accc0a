//! Environment map for `$path` references
//!
//! The environment is a read-only tree supplied by the caller before a parse
//! starts. References are resolved against it the moment their path ends;
//! a path that matches nothing resolves to [`Value::Unresolved`].

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Read-only lookup tree for environment references
///
/// Cloning is cheap; clones share the same tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    root: Arc<Value>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Value::mapping())
    }
}

impl Environment {
    /// Wrap an existing tree
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Decode an environment from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::environment(e.to_string()))?;
        Self::from_document(value)
    }

    /// Decode an environment from a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_yaml::from_str(yaml).map_err(|e| Error::environment(e.to_string()))?;
        Self::from_document(value)
    }

    /// Load an environment from a file, choosing the decoder by extension
    ///
    /// `.json` files are read as JSON; everything else is read as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), &e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    fn from_document(value: Value) -> Result<Self> {
        match value {
            Value::Mapping(_) => Ok(Self::new(value)),
            Value::Unresolved => Ok(Self::default()),
            other => Err(Error::environment(format!(
                "expected a mapping at the top level, got {}",
                other.type_name()
            ))),
        }
    }

    /// Resolve a dotted reference path
    ///
    /// Lookup is by presence: a stored `false` or `0` is returned as is.
    pub fn resolve(&self, path: &str) -> Value {
        if path.is_empty() {
            log::debug!("Empty environment reference; leaving it unresolved");
            return Value::Unresolved;
        }
        match self.root.lookup(path) {
            Some(value) => value.clone(),
            None => {
                log::debug!("Environment reference ${} did not match anything", path);
                Value::Unresolved
            }
        }
    }
}

impl From<Value> for Environment {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
