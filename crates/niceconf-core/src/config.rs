//! Main Config type for niceconf
//!
//! The Config type is the primary interface for loading niceconf documents
//! and reading values out of the parsed tree.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::engine::{ParseOptions, ParseState};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::value::Value;

/// Configuration options for loading configs
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Tree that `$path` references resolve against
    pub environment: Environment,
    /// Engine tuning
    pub parse: ParseOptions,
}

impl ConfigOptions {
    /// Options with the given environment and default engine settings
    pub fn with_environment(environment: impl Into<Environment>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }
}

/// A parsed configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The root dictionary
    data: Arc<Value>,
}

impl Config {
    /// Wrap an already parsed tree
    pub fn new(value: Value) -> Self {
        Self {
            data: Arc::new(value),
        }
    }

    /// Parse a document held in memory, with an empty environment
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_text_with_options(text, &ConfigOptions::default())
    }

    /// Parse a document held in memory
    pub fn from_text_with_options(text: &str, options: &ConfigOptions) -> Result<Self> {
        let mut state = ParseState::new(options.environment.clone(), options.parse.clone());
        state.feed_str(text)?;
        Ok(Self::new(state.finish()?))
    }

    /// Read a whole file and parse it, with an empty environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, &ConfigOptions::default())
    }

    /// Read a whole file and parse it
    pub fn load_with_options(path: impl AsRef<Path>, options: &ConfigOptions) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(name.clone(), &e))?;

        log::debug!("Parsing {} ({} bytes)", name, content.len());
        Self::from_text_with_options(&content, options).map_err(|e| e.in_file(name))
    }

    /// Parse from a buffered reader, one line at a time
    ///
    /// Lines are fed to the engine as they are read, so the whole document
    /// never has to be held in memory.
    pub fn from_reader<R: BufRead>(reader: R, options: &ConfigOptions) -> Result<Self> {
        parse_lines(reader.lines(), options, "<reader>").map(Self::new)
    }

    /// Parse a file line by line as it is read
    ///
    /// Produces the same tree as [`Config::load_with_options`].
    pub fn load_streaming(path: impl AsRef<Path>, options: &ConfigOptions) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::io(name.clone(), &e))?;

        log::debug!("Streaming {}", name);
        parse_lines(BufReader::new(file).lines(), options, &name)
            .map(Self::new)
            .map_err(|e| e.in_file(name))
    }

    /// Get the value at a dotted path
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.data.get_path(path)
    }

    /// Get the value at a dotted path, or `default` when nothing is there
    ///
    /// Presence decides: a stored `false`, `0` or empty string is returned,
    /// not the default.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.data.lookup_or(path, default)
    }

    /// Get a string value
    pub fn get_str(&self, path: &str) -> Result<&str> {
        let value = self.get(path)?;
        value
            .as_str()
            .ok_or_else(|| Error::type_coercion(path, "string", value.type_name()))
    }

    /// Get an integer value
    pub fn get_u64(&self, path: &str) -> Result<u64> {
        let value = self.get(path)?;
        match value {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "integer", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "integer", value.type_name())),
        }
    }

    /// Get a boolean value
    ///
    /// Only a real boolean is accepted; strings and integers are not coerced.
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.get(path)?;
        value
            .as_bool()
            .ok_or_else(|| Error::type_coercion(path, "boolean", value.type_name()))
    }

    /// The root dictionary
    pub fn value(&self) -> &Value {
        &self.data
    }

    /// Take the root dictionary
    pub fn into_value(self) -> Value {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Export the tree as pretty-printed JSON
    ///
    /// Unresolved values are written as `null`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self.value()).map_err(|e| Error::export("JSON", e))
    }

    /// Export the tree as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self.value()).map_err(|e| Error::export("YAML", e))
    }
}

fn parse_lines<I>(lines: I, options: &ConfigOptions, source: &str) -> Result<Value>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut state = ParseState::new(options.environment.clone(), options.parse.clone());
    for line in lines {
        let line = line.map_err(|e| Error::io(source, &e))?;
        state.feed_line(&line)?;
    }
    state.finish()
}
