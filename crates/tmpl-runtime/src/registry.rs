//! Template lookup for sub-template invocation.

use crate::error::{RenderError, RenderResult};
use crate::value::Value;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::sync::{Arc, RwLock};

/// Anything that renders `(data, options)` into a string.
pub trait Template: Send + Sync {
    fn apply(&self, data: &Value, options: &Value) -> RenderResult<String>;
}

/// Resolves a name or selector to a template.
pub trait TemplateRegistry: Send + Sync {
    fn resolve(&self, selector: &Value) -> RenderResult<Arc<dyn Template>>;
}

/// In-memory registry keyed by template name.
///
/// Selectors are matched verbatim first, then with a leading `#` removed,
/// so `"#row"` finds a template registered as `"row"`.
#[derive(Default)]
pub struct TemplateMap {
    templates: RwLock<FxHashMap<SmolStr, Arc<dyn Template>>>,
}

impl TemplateMap {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with the same name.
    pub fn insert(&self, name: impl Into<SmolStr>, template: Arc<dyn Template>) {
        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        templates.insert(name.into(), template);
    }

    /// Remove a template.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Template>> {
        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        templates.remove(name)
    }

    /// Remove every template.
    ///
    /// Compiled templates usually hold the registry they are stored in,
    /// so clearing is what releases both.
    pub fn clear(&self) {
        self.templates.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a template by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Template>> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        templates.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<SmolStr> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<SmolStr> = templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TemplateMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateMap")
            .field("names", &self.names())
            .finish()
    }
}

impl TemplateRegistry for TemplateMap {
    fn resolve(&self, selector: &Value) -> RenderResult<Arc<dyn Template>> {
        let name = selector.to_js_string();
        tracing::trace!(selector = %name, "resolving template");
        self.get(&name)
            .or_else(|| name.strip_prefix('#').and_then(|bare| self.get(bare)))
            .ok_or_else(|| RenderError::unknown_template(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixed(&'static str);

    impl Template for Fixed {
        fn apply(&self, _data: &Value, _options: &Value) -> RenderResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_resolve_by_name_and_selector() {
        let registry = TemplateMap::new();
        registry.insert("row", Arc::new(Fixed("<tr/>")));

        let by_name = registry.resolve(&Value::from("row")).unwrap();
        assert_eq!(by_name.apply(&Value::Undefined, &Value::Undefined).unwrap(), "<tr/>");

        let by_selector = registry.resolve(&Value::from("#row")).unwrap();
        assert_eq!(
            by_selector.apply(&Value::Undefined, &Value::Undefined).unwrap(),
            "<tr/>"
        );
    }

    #[test]
    fn test_unknown_template() {
        let registry = TemplateMap::new();
        let err = registry.resolve(&Value::from("missing")).err().unwrap();
        assert_eq!(err, RenderError::unknown_template("missing"));
    }

    #[test]
    fn test_insert_replaces() {
        let registry = TemplateMap::new();
        registry.insert("a", Arc::new(Fixed("1")));
        registry.insert("a", Arc::new(Fixed("2")));
        assert_eq!(registry.len(), 1);
        let template = registry.get("a").unwrap();
        assert_eq!(template.apply(&Value::Undefined, &Value::Undefined).unwrap(), "2");
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear() {
        let registry = TemplateMap::new();
        registry.insert("a", Arc::new(Fixed("1")));
        registry.insert("b", Arc::new(Fixed("2")));
        assert_eq!(registry.names(), vec![SmolStr::new("a"), SmolStr::new("b")]);
        registry.clear();
        assert!(!registry.contains("a"));
        assert!(registry.is_empty());
    }
}
