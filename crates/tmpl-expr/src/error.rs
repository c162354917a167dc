//! Error types for expression parsing.

use std::fmt;
use thiserror::Error;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred while parsing an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// Byte offset into the expression source.
    pub offset: u32,
    /// The error code.
    pub code: ErrorCode,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, offset: usize, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            offset: offset as u32,
            code,
        }
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &str, offset: usize) -> Self {
        Self::new(
            format!("Expected {}, found {}", expected, found),
            offset,
            ErrorCode::UnexpectedToken,
        )
    }

    /// Create an unexpected character error.
    pub fn unexpected_char(c: char, offset: usize) -> Self {
        Self::new(
            format!("Unexpected character {:?}", c),
            offset,
            ErrorCode::UnexpectedChar,
        )
    }

    /// Create an unterminated string error.
    pub fn unterminated_string(offset: usize) -> Self {
        Self::new(
            "Unterminated string literal",
            offset,
            ErrorCode::UnterminatedString,
        )
    }

    /// Create an invalid number error.
    pub fn invalid_number(text: &str, offset: usize) -> Self {
        Self::new(
            format!("Invalid number literal: {}", text),
            offset,
            ErrorCode::InvalidNumber,
        )
    }

    /// Create an empty expression error.
    pub fn empty(offset: usize) -> Self {
        Self::new("Empty expression", offset, ErrorCode::UnexpectedEnd)
    }
}

/// Error codes for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A token other than the expected one.
    UnexpectedToken,
    /// A character that starts no token.
    UnexpectedChar,
    /// A string literal without its closing quote.
    UnterminatedString,
    /// A malformed numeric literal.
    InvalidNumber,
    /// Input ended where more was required.
    UnexpectedEnd,
    /// Tokens left over after a complete expression.
    TrailingInput,
}

impl ErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnexpectedToken => "unexpected-token",
            ErrorCode::UnexpectedChar => "unexpected-char",
            ErrorCode::UnterminatedString => "unterminated-string",
            ErrorCode::InvalidNumber => "invalid-number",
            ErrorCode::UnexpectedEnd => "unexpected-end",
            ErrorCode::TrailingInput => "trailing-input",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
