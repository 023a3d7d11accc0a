//! niceconf-core: incremental parser for niceconf configuration documents
//!
//! A niceconf document is a sequence of `key.path = value` entries. Values
//! are quoted strings, unsigned integers, `true`/`false`, lists in `[...]`,
//! nested dictionaries in `{...}`, or `$path` references into a caller
//! supplied environment. `#` starts a comment that runs to the end of the
//! line.
//!
//! # Example
//!
//! ```rust
//! use niceconf_core::Config;
//!
//! let text = "
//! database.host = 'localhost'
//! database.port = 5432
//! ";
//!
//! let config = Config::from_text(text).unwrap();
//! assert_eq!(config.get("database.host").unwrap().as_str(), Some("localhost"));
//! assert_eq!(config.get_u64("database.port").unwrap(), 5432);
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod handler;
pub mod value;

mod config;

pub use config::{Config, ConfigOptions};
pub use engine::{begin_parse, ParseOptions, ParseState};
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
pub use value::Value;
