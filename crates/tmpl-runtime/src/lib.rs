//! Runtime support for compiled tmpl templates.
//!
//! This crate defines the dynamic [`Value`] model that template
//! expressions operate on, the [`RenderError`] raised during evaluation,
//! and the collaborators a compiled template relies on:
//!
//! - [`Iterate`]: walks array-like and mapping-like containers for `each`.
//! - [`TemplateRegistry`]: resolves the selector of a `tmpl` directive.
//! - [`Merge`]: builds the data object handed to sub-templates.
//! - [`Escape`]: turns literal text into source literals for generated code.
//!
//! Each has a default implementation; [`Collaborators`] bundles the ones
//! needed at evaluation time.

pub mod error;
pub mod escape;
pub mod iterate;
pub mod merge;
pub mod registry;
pub mod value;

use std::fmt;
use std::sync::Arc;

pub use error::{RenderError, RenderResult};
pub use escape::{Escape, JsonEscaper};
pub use iterate::{GenericIterator, Iterate, Visit};
pub use merge::{Merge, MergeAll};
pub use registry::{Template, TemplateMap, TemplateRegistry};
pub use value::{format_number, Function, Map, Value};

/// The collaborators a compiled template calls while evaluating.
#[derive(Clone)]
pub struct Collaborators {
    /// Iteration primitive for `each`.
    pub iterator: Arc<dyn Iterate>,
    /// Registry for `tmpl`.
    pub registry: Arc<dyn TemplateRegistry>,
    /// Merge primitive for loop-variable propagation.
    pub merge: Arc<dyn Merge>,
}

impl Collaborators {
    /// Use the given registry.
    pub fn with_registry(mut self, registry: Arc<dyn TemplateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use the given iteration primitive.
    pub fn with_iterator(mut self, iterator: Arc<dyn Iterate>) -> Self {
        self.iterator = iterator;
        self
    }

    /// Use the given merge primitive.
    pub fn with_merge(mut self, merge: Arc<dyn Merge>) -> Self {
        self.merge = merge;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            iterator: Arc::new(GenericIterator),
            registry: Arc::new(TemplateMap::new()),
            merge: Arc::new(MergeAll),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
