//! Recursive-descent parser for directive expressions.

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::error::{ErrorCode, ParseError, ParseResult};
use crate::lexer::{tokenize, Token, TokenKind};
use smol_str::SmolStr;

/// Parse a complete expression.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    if source.trim().is_empty() {
        return Err(ParseError::empty(0));
    }
    let tokens = tokenize(source)?;
    let mut parser = ExprParser::new(tokens);
    let expr = parser.parse_conditional()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(ParseError::new(
            format!("Unexpected {} after expression", trailing.kind.describe()),
            trailing.offset,
            ErrorCode::TrailingInput,
        ));
    }
    Ok(expr)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Peek at the current token. The stream always ends with `Eof`.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Consume the token if it matches.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::unexpected_token(
                expected,
                &token.kind.describe(),
                token.offset,
            ))
        }
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_conditional()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let alternate = self.parse_conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op(&self.peek().kind) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    let property = match token.kind {
                        TokenKind::Ident(property) => property,
                        other => {
                            return Err(ParseError::unexpected_token(
                                "property name",
                                &other.describe(),
                                token.offset,
                            ))
                        }
                    };
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_conditional()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_list(TokenKind::RParen, "`)`")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                _ => Expr::Ident(name),
            }),
            TokenKind::LParen => {
                let inner = self.parse_conditional()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => Ok(Expr::Array(
                self.parse_list(TokenKind::RBracket, "`]`")?,
            )),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Eof => Err(ParseError::new(
                "Unexpected end of expression",
                token.offset,
                ErrorCode::UnexpectedEnd,
            )),
            other => Err(ParseError::unexpected_token(
                "expression",
                &other.describe(),
                token.offset,
            )),
        }
    }

    /// Parse comma-separated expressions up to `close`; allows a trailing comma.
    fn parse_list(&mut self, close: TokenKind, expected: &str) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.eat(&close) {
            items.push(self.parse_conditional()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(close.clone(), expected)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let token = self.advance();
            let key: SmolStr = match token.kind {
                TokenKind::Ident(name) | TokenKind::String(name) => name,
                TokenKind::Number(n) => format_key(n).into(),
                other => {
                    return Err(ParseError::unexpected_token(
                        "property key",
                        &other.describe(),
                        token.offset,
                    ))
                }
            };
            let value = if self.eat(&TokenKind::Colon) {
                self.parse_conditional()?
            } else {
                // shorthand `{ a }`
                Expr::Ident(key.clone())
            };
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RBrace, "`}`")?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::EqEqEq => BinaryOp::StrictEq,
        TokenKind::NotEqEq => BinaryOp::StrictNotEq,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::OrOr => BinaryOp::Or,
        _ => return None,
    })
}

fn format_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.into()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: ident("a"),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: ident("b"),
                    rhs: ident("c"),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expression("a - b - c").unwrap();
        match expr {
            Expr::Binary { op, lhs, rhs } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Sub, .. }));
                assert_eq!(rhs, ident("c"));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse_expression("user.names[0](x)").unwrap();
        let Expr::Call { callee, args } = expr else {
            panic!("Expected call");
        };
        assert_eq!(args, vec![Expr::Ident("x".into())]);
        assert!(matches!(*callee, Expr::Index { .. }));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_expression("[10, 20]").unwrap(),
            Expr::Array(vec![
                Expr::Literal(Literal::Number(10.0)),
                Expr::Literal(Literal::Number(20.0)),
            ])
        );
        assert_eq!(
            parse_expression("false").unwrap(),
            Expr::Literal(Literal::Bool(false))
        );
        assert_eq!(
            parse_expression("{ a: 1, 'b c': x, y }").unwrap(),
            Expr::Object(vec![
                ("a".into(), Expr::Literal(Literal::Number(1.0))),
                ("b c".into(), Expr::Ident("x".into())),
                ("y".into(), Expr::Ident("y".into())),
            ])
        );
    }

    #[test]
    fn test_conditional_is_right_associative() {
        let expr = parse_expression("a ? b : c ? d : e").unwrap();
        let Expr::Conditional { alternate, .. } = expr else {
            panic!("Expected conditional");
        };
        assert!(matches!(*alternate, Expr::Conditional { .. }));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_expression("  ").unwrap_err().code, ErrorCode::UnexpectedEnd);
        assert_eq!(parse_expression("a b").unwrap_err().code, ErrorCode::TrailingInput);
        assert_eq!(parse_expression("(a").unwrap_err().code, ErrorCode::UnexpectedToken);
        assert_eq!(parse_expression("a +").unwrap_err().code, ErrorCode::UnexpectedEnd);
        assert_eq!(parse_expression("a => f").unwrap_err().code, ErrorCode::TrailingInput);
    }
}
