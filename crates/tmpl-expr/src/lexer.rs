//! Lexer for directive expressions.

use crate::error::{ParseError, ParseResult};
use smol_str::SmolStr;

/// A token kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(SmolStr),
    Ident(SmolStr),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    AndAnd,
    OrOr,
    /// `=>`, only meaningful as an accessor separator.
    Arrow,
    Eof,
}

impl TokenKind {
    /// A short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {}", n),
            Self::String(s) => format!("string {:?}", s.as_str()),
            Self::Ident(name) => format!("identifier `{}`", name),
            Self::Eof => "end of expression".to_string(),
            other => format!("`{}`", other.punct()),
        }
    }

    fn punct(&self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Colon => ":",
            Self::Question => "?",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::EqEqEq => "===",
            Self::NotEqEq => "!==",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Arrow => "=>",
            Self::Number(_) | Self::String(_) | Self::Ident(_) | Self::Eof => "",
        }
    }
}

/// A token with its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Longest-first punctuator table.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    ("===", TokenKind::EqEqEq),
    ("!==", TokenKind::NotEqEq),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("=>", TokenKind::Arrow),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
    ("?", TokenKind::Question),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
];

/// A lexer over one expression.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Get the remaining source.
    fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Peek at the next character.
    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at the character after the next one.
    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    /// Consume and return the next character.
    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Consume characters while the predicate is true.
    fn consume_while<F>(&mut self, pred: F) -> &'a str
    where
        F: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if pred(c) {
                self.next_char();
            } else {
                break;
            }
        }
        &self.source[start..self.pos]
    }

    /// Tokenize the whole source, ending with [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let Some(c) = self.peek_char() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset,
                });
                return Ok(tokens);
            };

            let kind = if c.is_ascii_digit()
                || (c == '.' && self.peek_second().is_some_and(|n| n.is_ascii_digit()))
            {
                self.read_number()?
            } else if c == '"' || c == '\'' {
                TokenKind::String(self.read_string(c)?)
            } else if is_ident_start(c) {
                TokenKind::Ident(self.consume_while(is_ident_continue).into())
            } else {
                self.read_punctuator(c)?
            };

            tokens.push(Token { kind, offset });
        }
    }

    fn read_number(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.next_char();
            self.consume_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.next_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.next_char();
            }
            self.consume_while(|c| c.is_ascii_digit());
        }
        // `1a` is not a number followed by an identifier
        if self.peek_char().is_some_and(is_ident_start) {
            self.consume_while(is_ident_continue);
        }

        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ParseError::invalid_number(text, start))
    }

    fn read_string(&mut self, quote: char) -> ParseResult<SmolStr> {
        let start = self.pos;
        self.next_char();
        let mut value = String::new();

        loop {
            match self.next_char() {
                None => return Err(ParseError::unterminated_string(start)),
                Some(c) if c == quote => return Ok(value.into()),
                Some('\\') => {
                    let escape_offset = self.pos;
                    match self.next_char() {
                        None => return Err(ParseError::unterminated_string(start)),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('b') => value.push('\u{8}'),
                        Some('f') => value.push('\u{c}'),
                        Some('v') => value.push('\u{b}'),
                        Some('0') => value.push('\0'),
                        Some('x') => value.push(self.read_hex_escape(2, escape_offset)?),
                        Some('u') => value.push(self.read_hex_escape(4, escape_offset)?),
                        // line continuation
                        Some('\n') => {}
                        Some(other) => value.push(other),
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn read_hex_escape(&mut self, digits: usize, offset: usize) -> ParseResult<char> {
        let start = self.pos;
        for _ in 0..digits {
            match self.peek_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.next_char();
                }
                _ => return Err(ParseError::unexpected_token("hex digit", "escape end", offset)),
            }
        }
        u32::from_str_radix(&self.source[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ParseError::unexpected_token("valid code point", "escape", offset))
    }

    fn read_punctuator(&mut self, c: char) -> ParseResult<TokenKind> {
        for (text, kind) in PUNCTUATORS {
            if self.remaining().starts_with(text) {
                self.pos += text.len();
                return Ok(kind.clone());
            }
        }
        Err(ParseError::unexpected_char(c, self.pos))
    }
}

/// Check if a character can start an identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

/// Check if a character can continue an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Check if a string is a simple identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_ident_continue)
}

/// Tokenize an expression.
pub fn tokenize(source: &str) -> ParseResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_longest_first() {
        assert_eq!(
            kinds("a === b !== c <= d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqEqEq,
                TokenKind::Ident("b".into()),
                TokenKind::NotEqEq,
                TokenKind::Ident("c".into()),
                TokenKind::Le,
                TokenKind::Ident("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("10 2.5 .5 1e3"),
            vec![
                TokenKind::Number(10.0),
                TokenKind::Number(2.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            tokenize("1a").unwrap_err().code,
            ErrorCode::InvalidNumber
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\nb" 'A\x42'"#),
            vec![
                TokenKind::String("it's".into()),
                TokenKind::String("a\nb".into()),
                TokenKind::String("AB".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnterminatedString);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_unexpected_char() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedChar);
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("$index"));
        assert!(is_identifier("_bar1"));
        assert!(!is_identifier("1foo"));
        assert!(!is_identifier("foo.bar"));
        assert!(!is_identifier(""));
    }
}
