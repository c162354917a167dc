//! Error types for template compilation.

use crate::ast::TagNode;
use std::fmt;
use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// A fatal compilation error.
///
/// `directive` holds the offending directive written back in template
/// syntax, so the failure can be located without source positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} in `{directive}`")]
pub struct CompileError {
    /// The error message.
    pub message: String,
    /// The error code.
    pub code: CompileErrorCode,
    /// Reconstructed source of the offending directive.
    pub directive: String,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(message: impl Into<String>, code: CompileErrorCode, node: &TagNode) -> Self {
        Self {
            message: message.into(),
            code,
            directive: node.to_string(),
        }
    }

    /// Create an invalid `each` header error.
    pub fn invalid_each(reason: &str, node: &TagNode) -> Self {
        Self::new(
            format!("Invalid each: {}", reason),
            CompileErrorCode::InvalidEach,
            node,
        )
    }

    /// Create an invalid `tmpl` header error.
    pub fn invalid_tmpl(reason: &str, node: &TagNode) -> Self {
        Self::new(
            format!("Invalid tmpl: {}", reason),
            CompileErrorCode::InvalidTmpl,
            node,
        )
    }

    /// Create an invalid expression error.
    pub fn invalid_expression(reason: impl fmt::Display, node: &TagNode) -> Self {
        Self::new(
            format!("Invalid expression: {}", reason),
            CompileErrorCode::InvalidExpression,
            node,
        )
    }

    /// Create an unknown kind error.
    pub fn unknown_kind(node: &TagNode) -> Self {
        Self::new(
            format!("Unknown directive kind `{}`", node.kind),
            CompileErrorCode::UnknownKind,
            node,
        )
    }
}

/// Error codes for template compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorCode {
    /// Malformed `each` header.
    InvalidEach,
    /// Malformed `tmpl` header.
    InvalidTmpl,
    /// `if` or `else` branch with a blank condition where one is required.
    MissingCondition,
    /// Conditionless `else` that is not the last branch, or `else` outside `if`.
    MisplacedElse,
    /// Unrecognized directive kind.
    UnknownKind,
    /// Expression that does not parse.
    InvalidExpression,
}

impl CompileErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidEach => "invalid-each",
            Self::InvalidTmpl => "invalid-tmpl",
            Self::MissingCondition => "missing-condition",
            Self::MisplacedElse => "misplaced-else",
            Self::UnknownKind => "unknown-kind",
            Self::InvalidExpression => "invalid-expression",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
