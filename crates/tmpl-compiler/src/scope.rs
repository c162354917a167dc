//! Loop-variable scope and nesting depth tracking.

use crate::ir::{Temp, TempKind};
use smol_str::SmolStr;

/// Names bound by one `each`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopBinding {
    pub key: SmolStr,
    pub value: SmolStr,
}

/// Compile-time scope: the loop variables in view and the nesting depth.
///
/// Every binding occupies two consecutive local slots (key, then value),
/// assigned in push order. The evaluator keeps its locals in the same
/// layout, so a slot resolved here is valid at run time.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Vec<LoopBinding>,
    depth: usize,
    max_depth: usize,
}

impl Scope {
    /// Create an empty scope at depth zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring a loop's key and value names into scope, returning the first slot.
    pub fn push(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> usize {
        let slot = self.slot_count();
        self.bindings.push(LoopBinding {
            key: key.into(),
            value: value.into(),
        });
        slot
    }

    /// Remove the innermost loop's names.
    pub fn pop(&mut self) -> Option<LoopBinding> {
        self.bindings.pop()
    }

    /// Every in-scope name with its slot, outermost first.
    pub fn vars(&self) -> impl Iterator<Item = (&SmolStr, usize)> + '_ {
        self.bindings.iter().enumerate().flat_map(|(i, binding)| {
            [(&binding.key, i * 2), (&binding.value, i * 2 + 1)]
        })
    }

    /// Check if no loop variable is in scope.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of local slots in use.
    pub fn slot_count(&self) -> usize {
        self.bindings.len() * 2
    }

    /// Find the innermost slot bound to `name`.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.bindings
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, binding)| {
                // value shadows key when both use the same name
                if binding.value == name {
                    Some(i * 2 + 1)
                } else if binding.key == name {
                    Some(i * 2)
                } else {
                    None
                }
            })
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Deepest nesting reached so far.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Enter a loop body.
    pub fn enter(&mut self) -> usize {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.depth
    }

    /// Leave a loop body, restoring the previous depth.
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Temporary holding a substitution value at the current depth.
    pub fn value_temp(&self) -> Temp {
        Temp::new(TempKind::Value, self.depth)
    }

    /// Accumulator for a loop opened at the current depth.
    pub fn buffer_temp(&self) -> Temp {
        Temp::new(TempKind::Buffer, self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_pop_and_resolve() {
        let mut scope = Scope::new();
        assert_eq!(scope.push("i", "row"), 0);
        assert_eq!(scope.push("j", "cell"), 2);

        assert_eq!(scope.resolve("row"), Some(1));
        assert_eq!(scope.resolve("j"), Some(2));
        assert_eq!(scope.resolve("missing"), None);

        let names: Vec<_> = scope.vars().map(|(name, slot)| (name.as_str(), slot)).collect();
        assert_eq!(names, vec![("i", 0), ("row", 1), ("j", 2), ("cell", 3)]);

        scope.pop();
        assert_eq!(scope.resolve("cell"), None);
        assert_eq!(scope.slot_count(), 2);
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let mut scope = Scope::new();
        scope.push("$index", "$value");
        scope.push("$index", "$value");
        assert_eq!(scope.resolve("$value"), Some(3));
    }

    #[test]
    fn test_temps_follow_depth() {
        let mut scope = Scope::new();
        assert_eq!(scope.buffer_temp().to_string(), "$a0");
        scope.enter();
        assert_eq!(scope.value_temp().to_string(), "$v1");
        scope.exit();

        // sibling loop at the same depth reuses the same names
        assert_eq!(scope.buffer_temp().to_string(), "$a0");
        scope.enter();
        scope.enter();
        scope.exit();
        scope.exit();
        assert_eq!(scope.depth(), 0);
        assert_eq!(scope.max_depth(), 2);
    }
}
