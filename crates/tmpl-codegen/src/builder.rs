//! Builder for generated source text.

/// Appends code and tracks the indentation of new lines.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    /// The generated code.
    code: String,
    /// Current indentation level.
    indent: usize,
}

impl CodeBuilder {
    /// Create a new code builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current offset in the generated code.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Append code.
    pub fn push_str(&mut self, code: &str) {
        self.code.push_str(code);
    }

    /// Append a character.
    pub fn push(&mut self, c: char) {
        self.code.push(c);
    }

    /// Start a new line at the current indentation.
    pub fn newline(&mut self) {
        self.code.push('\n');
        for _ in 0..self.indent {
            self.code.push_str("  ");
        }
    }

    /// Increase the indentation of following lines.
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decrease the indentation of following lines.
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Get the generated code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consume the builder and return the code.
    pub fn finish(self) -> String {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_builder() {
        let mut builder = CodeBuilder::new();
        builder.push_str("f(x, {");
        builder.indent();
        builder.newline();
        builder.push_str("y");
        builder.dedent();
        builder.newline();
        builder.push_str("})");
        assert_eq!(builder.offset(), 13);
        assert_eq!(builder.finish(), "f(x, {\n  y\n})");
    }
}
