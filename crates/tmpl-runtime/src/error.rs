//! Errors raised while evaluating a compiled template.

use smol_str::SmolStr;
use thiserror::Error;

/// Result type for evaluation.
pub type RenderResult<T> = Result<T, RenderError>;

/// An error raised while evaluating a compiled template.
///
/// These are never produced by the compiler; they surface from `apply`
/// exactly as the failing expression, function or registry raised them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Property access on `undefined` or `null`.
    #[error("Cannot read properties of {target} (reading '{property}')")]
    PropertyOfNothing {
        target: &'static str,
        property: SmolStr,
    },
    /// A call on a value that is not a function.
    #[error("{callee} is not a function")]
    NotCallable { callee: String },
    /// The registry has no template for the selector.
    #[error("Unknown template: {selector}")]
    UnknownTemplate { selector: String },
    /// An error raised by a native function.
    #[error("{0}")]
    Custom(String),
}

impl RenderError {
    /// Create an error for a native function to return.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a not-callable error.
    pub fn not_callable(callee: impl Into<String>) -> Self {
        Self::NotCallable {
            callee: callee.into(),
        }
    }

    /// Create an unknown template error.
    pub fn unknown_template(selector: impl Into<String>) -> Self {
        Self::UnknownTemplate {
            selector: selector.into(),
        }
    }
}
