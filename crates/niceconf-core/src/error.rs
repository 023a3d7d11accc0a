//! Error types for niceconf
//!
//! Fatal parse errors abort the whole parse and come back to the caller as
//! a typed [`Error`]. Malformed literals and unmatched references are not
//! errors; they degrade to fallback values inside the engine.

use std::fmt;

/// Result type alias for niceconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for niceconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Dotted path in the config the error relates to (e.g., "database.port")
    pub path: Option<String>,
    /// Source location (file, line, column) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File name, or `None` for in-memory documents
    pub file: Option<String>,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "line {}, column {}", self.line, self.column),
        }
    }
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The handler stack was emptied mid-parse (e.g. a stray `}` at top level)
    #[error("Unexpected end of handler stack")]
    UnexpectedEndOfStack,
    /// A single character was redelivered more often than allowed
    #[error("Redelivery limit of {limit} exceeded for one character")]
    RedeliveryLoopExceeded { limit: usize },
    /// More constructs were open at once than allowed
    #[error("Nesting depth limit of {limit} exceeded")]
    NestingTooDeep { limit: usize },
    /// Error accessing a path that doesn't exist
    #[error("Path not found")]
    PathNotFound,
    /// A value exists but has the wrong type for the typed getter
    #[error("Type coercion failed")]
    TypeCoercion,
    /// An environment map could not be decoded
    #[error("Invalid environment")]
    Environment,
    /// I/O error (file not found, etc.)
    #[error("I/O error")]
    Io,
    /// A parsed tree could not be written out as JSON or YAML
    #[error("Export failed")]
    Export,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            source_location: None,
            help: None,
            cause: None,
        }
    }

    /// Create a stack underflow error
    pub fn unexpected_end_of_stack() -> Self {
        Self::new(ErrorKind::UnexpectedEndOfStack)
            .with_help("Check for a '}' that has no matching '{'")
    }

    /// Create a redelivery guard error
    pub fn redelivery_loop_exceeded(limit: usize) -> Self {
        Self::new(ErrorKind::RedeliveryLoopExceeded { limit })
            .with_help("The document drives the parser into a redelivery loop")
    }

    /// Create a nesting limit error
    pub fn nesting_too_deep(limit: usize) -> Self {
        Self::new(ErrorKind::NestingTooDeep { limit })
            .with_help("Flatten the document or raise max_depth for trusted input")
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            path: Some(path_str),
            ..Self::new(ErrorKind::PathNotFound)
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            help: Some(format!(
                "Ensure the value at this path is a {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
            ..Self::new(ErrorKind::TypeCoercion)
        }
    }

    /// Create an environment decoding error
    pub fn environment(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            help: Some("The environment must be a JSON or YAML mapping".into()),
            ..Self::new(ErrorKind::Environment)
        }
    }

    /// Create an I/O error for a file
    pub fn io(file: impl Into<String>, err: &std::io::Error) -> Self {
        let file = file.into();
        Self {
            cause: Some(format!("Failed to read '{}': {}", file, err)),
            ..Self::new(ErrorKind::Io)
        }
    }

    /// Create an export error
    pub fn export(format: &str, message: impl fmt::Display) -> Self {
        Self {
            cause: Some(format!("Could not write {}: {}", format, message)),
            ..Self::new(ErrorKind::Export)
        }
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Attach a file name to an existing source location
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        if let Some(loc) = &mut self.source_location {
            loc.file = Some(file.into());
        }
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this error aborted a parse (as opposed to a lookup or I/O failure)
    pub fn is_fatal_parse_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnexpectedEndOfStack
                | ErrorKind::RedeliveryLoopExceeded { .. }
                | ErrorKind::NestingTooDeep { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  At: {}", loc)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_end_of_stack_display() {
        let err = Error::unexpected_end_of_stack().with_source_location(SourceLocation {
            file: None,
            line: 3,
            column: 1,
        });
        let display = format!("{}", err);

        assert!(display.contains("Unexpected end of handler stack"));
        assert!(display.contains("At: line 3, column 1"));
        assert!(display.contains("Help:"));
        assert!(err.is_fatal_parse_error());
    }

    #[test]
    fn test_redelivery_display_includes_limit() {
        let err = Error::redelivery_loop_exceeded(8);
        assert!(err.to_string().contains("Redelivery limit of 8 exceeded"));
        assert_eq!(err.kind, ErrorKind::RedeliveryLoopExceeded { limit: 8 });
    }

    #[test]
    fn test_nesting_too_deep_is_fatal() {
        let err = Error::nesting_too_deep(128);
        let display = err.to_string();
        assert!(display.contains("Nesting depth limit of 128 exceeded"));
        assert!(display.contains("max_depth"));
        assert!(err.is_fatal_parse_error());
    }

    #[test]
    fn test_path_not_found_error() {
        let err = Error::path_not_found("database.host");

        assert_eq!(err.kind, ErrorKind::PathNotFound);
        assert_eq!(err.path, Some("database.host".into()));
        assert!(!err.is_fatal_parse_error());
    }

    #[test]
    fn test_type_coercion_error() {
        let err = Error::type_coercion("server.port", "integer", "string");
        let display = format!("{}", err);

        assert!(display.contains("Type coercion failed"));
        assert!(display.contains("Path: server.port"));
        assert!(display.contains("Got: string"));
    }

    #[test]
    fn test_in_file_only_touches_existing_location() {
        let located = Error::unexpected_end_of_stack()
            .with_source_location(SourceLocation {
                file: None,
                line: 2,
                column: 5,
            })
            .in_file("app.conf");
        assert!(located.to_string().contains("At: app.conf:2:5"));

        let unlocated = Error::path_not_found("a").in_file("app.conf");
        assert!(unlocated.source_location.is_none());
    }

    #[test]
    fn test_environment_error() {
        let err = Error::environment("expected a mapping");
        let display = format!("{}", err);

        assert!(display.contains("Invalid environment"));
        assert!(display.contains("expected a mapping"));
    }
}
