//! Structural scanning of raw directive content.
//!
//! Directive headers (`each (k, v) items`, `tmpl (data) name`) and
//! accessor chains (`expr=>f=>g`) are split before any expression is
//! parsed. These helpers walk the source once, skipping string literals
//! and tracking bracket depth, so separators inside `f(a, b)` or `'=>'`
//! are left alone.

/// Bracket and quote state while walking a source string.
#[derive(Debug, Default)]
struct Nesting {
    quote: Option<char>,
    escaped: bool,
    depth: usize,
}

impl Nesting {
    /// Check if the walk is outside every bracket and string.
    fn is_top(&self) -> bool {
        self.depth == 0 && self.quote.is_none()
    }

    fn feed(&mut self, c: char) {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.quote = None;
            }
            return;
        }
        match c {
            '\'' | '"' => self.quote = Some(c),
            '(' | '[' | '{' => self.depth += 1,
            ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
    }
}

/// Find the byte offset of the `)` matching the `(` at `open`.
///
/// Returns `None` when `open` is not a `(` or the parenthesis is never closed.
pub fn matching_paren(source: &str, open: usize) -> Option<usize> {
    let rest = source.get(open..)?;
    if !rest.starts_with('(') {
        return None;
    }
    let mut nesting = Nesting::default();
    for (i, c) in rest.char_indices() {
        nesting.feed(c);
        if nesting.is_top() {
            return Some(open + i);
        }
    }
    None
}

/// Split `source` on every top-level occurrence of `separator`.
///
/// Always returns at least one piece; pieces are not trimmed.
pub fn split_top_level<'a>(source: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut nesting = Nesting::default();
    let mut piece_start = 0;
    let mut skip_until = 0;

    for (i, c) in source.char_indices() {
        if i < skip_until {
            continue;
        }
        if !separator.is_empty() && nesting.is_top() && source[i..].starts_with(separator) {
            pieces.push(&source[piece_start..i]);
            piece_start = i + separator.len();
            skip_until = piece_start;
            continue;
        }
        nesting.feed(c);
    }
    pieces.push(&source[piece_start..]);
    pieces
}
