//! Validation error types
//!
//! Error codes:
//! - TYPEA_SHAPE_MISMATCH (data kind does not match the expression kind)
//! - TYPEA_CONSTRAINT_VIOLATION (a registered check rejected the value)
//! - TYPEA_CONFIGURATION (the expression itself is broken)
//! - TYPEA_FORBIDDEN_EMPTY (value missing where presence is required)
//!
//! There is one error channel. The path is kept structured while the
//! evaluator unwinds and is only rendered to a string at the boundary.

use std::fmt;

use thiserror::Error;

/// Failure categories reported through the single error channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural kind of the data does not match the expression
    ShapeMismatch,
    /// A registered check rejected an otherwise well-typed value
    Constraint,
    /// Expression references an unknown type or carries a malformed option
    Configuration,
    /// Value is empty where `allowNull: false` or strict mode demands presence
    ForbiddenEmpty,
}

impl ErrorKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ShapeMismatch => "TYPEA_SHAPE_MISMATCH",
            ErrorKind::Constraint => "TYPEA_CONSTRAINT_VIOLATION",
            ErrorKind::Configuration => "TYPEA_CONFIGURATION",
            ErrorKind::ForbiddenEmpty => "TYPEA_FORBIDDEN_EMPTY",
        }
    }

    /// Configuration errors point at a bug in the expression, not the input
    pub fn is_expression_bug(&self) -> bool {
        matches!(self, ErrorKind::Configuration)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One step from the root of the data tree towards the failing leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key
    Field(String),
    /// Array index
    Index(usize),
}

/// Structured location of a failure, root first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPath {
    segments: Vec<PathSegment>,
}

impl ErrorPath {
    /// Creates an empty (root) path
    pub fn root() -> Self {
        Self::default()
    }

    /// Prepends a segment. Called while the recursion unwinds.
    pub fn push_front(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ErrorPath {
    /// Renders `field`, `.field` and `[index]` segments, e.g. `c.d[1].e`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Validation failure with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    kind: ErrorKind,
    path: ErrorPath,
    message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: ErrorPath::root(),
            message: message.into(),
        }
    }

    /// Value missing where it must be present
    pub fn forbidden_empty() -> Self {
        Self::new(ErrorKind::ForbiddenEmpty, "value not allowed to be empty")
    }

    /// Data is not an object where a field map expects one
    pub fn not_an_object() -> Self {
        Self::new(ErrorKind::ShapeMismatch, "value must be an object")
    }

    /// Data is not an array where an array expression expects one
    pub fn not_an_array() -> Self {
        Self::new(ErrorKind::ShapeMismatch, "value must be an array")
    }

    /// Exact-value expression did not match
    pub fn literal_mismatch(expected: &serde_json::Value) -> Self {
        Self::new(
            ErrorKind::ShapeMismatch,
            format!("value must equal {}", expected),
        )
    }

    /// Positional array data carries more elements than the expression
    pub fn unexpected_element() -> Self {
        Self::new(ErrorKind::ShapeMismatch, "unexpected element")
    }

    /// Typed field references a type the registry does not know
    pub fn unsupported_type(field: &str, type_name: &str) -> Self {
        Self::new(
            ErrorKind::Configuration,
            format!(
                "{} configuration error, unsupported type {}",
                field, type_name
            ),
        )
    }

    /// Adds a path segment while unwinding
    pub fn within(mut self, segment: PathSegment) -> Self {
        self.path.push_front(segment);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn path(&self) -> &ErrorPath {
        &self.path
    }

    /// Message of the deepest failure, without the path
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<CheckError> for ValidationError {
    fn from(err: CheckError) -> Self {
        Self::new(err.kind(), err.message)
    }
}

/// Result of validating a data tree
pub type ValidationResult<T = serde_json::Value> = Result<T, ValidationError>;

/// Rejection returned by a single check function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    message: String,
    configuration: bool,
}

impl CheckError {
    /// The value violates the check
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            configuration: false,
        }
    }

    /// The check option itself is malformed (e.g. `minLength: "x"`)
    pub fn bad_option(check: &str, reason: impl fmt::Display) -> Self {
        Self {
            message: format!("invalid option for {}: {}", check, reason),
            configuration: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_configuration(&self) -> bool {
        self.configuration
    }

    /// Category this rejection is reported under
    pub fn kind(&self) -> ErrorKind {
        if self.configuration {
            ErrorKind::Configuration
        } else {
            ErrorKind::Constraint
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CheckError {}

/// Errors raised while turning JSON into expressions
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to read expression file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed expression at '{at}': {reason}")]
    Malformed { at: String, reason: String },

    #[error("Expression '{0}' is already registered")]
    Duplicate(String),
}

impl LoaderError {
    pub fn malformed(at: impl Into<String>, reason: impl Into<String>) -> Self {
        LoaderError::Malformed {
            at: at.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;
