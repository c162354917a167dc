//! Expression language for tmpl directives.
//!
//! Directive content such as `${user.name}`, `{if count > 1}` or
//! `{each (i, row) rows}` carries JavaScript-like expressions. This crate
//! tokenizes and parses them into an [`Expr`] tree and offers the
//! structural scanning helpers used to split directive headers before
//! parsing.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scan;

pub use ast::*;
pub use error::{ErrorCode, ParseError, ParseResult};
pub use lexer::is_identifier;
pub use parser::parse_expression;
pub use scan::{matching_paren, split_top_level};

/// Parse an expression.
pub fn parse(source: &str) -> ParseResult<Expr> {
    parse_expression(source)
}
