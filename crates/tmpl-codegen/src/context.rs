//! Code generation context.

use smol_str::SmolStr;
use tmpl_runtime::Escape;

/// State shared while generating one program.
pub struct CodegenContext<'a> {
    /// Turns literal text into source literals.
    pub escaper: &'a dyn Escape,
    /// Loop variable names, indexed by local slot.
    pub locals: Vec<SmolStr>,
}

impl<'a> CodegenContext<'a> {
    /// Create a new code generation context.
    pub fn new(escaper: &'a dyn Escape) -> Self {
        Self {
            escaper,
            locals: Vec::new(),
        }
    }

    /// Bind a loop's names, returning a marker for [`Self::unbind`].
    pub fn bind(&mut self, key: &SmolStr, value: &SmolStr) -> usize {
        let marker = self.locals.len();
        self.locals.push(key.clone());
        self.locals.push(value.clone());
        marker
    }

    /// Remove names bound since the marker.
    pub fn unbind(&mut self, marker: usize) {
        self.locals.truncate(marker);
    }

    /// Name of a local slot.
    pub fn local(&self, slot: usize) -> String {
        match self.locals.get(slot) {
            Some(name) => name.to_string(),
            None => format!("$l{}", slot),
        }
    }

    /// Escape a literal string.
    pub fn literal(&self, text: &str) -> String {
        self.escaper.escape(text)
    }
}
