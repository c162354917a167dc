//! The compiled, callable template.

use crate::eval::Frame;
use crate::ir::Program;
use std::fmt;
use std::sync::Arc;
use tmpl_runtime::{Collaborators, RenderResult, Template, Value};

/// A compiled template.
///
/// Immutable and cheap to clone. Each call evaluates in a fresh frame,
/// so one instance can be applied from many threads at once.
#[derive(Clone)]
pub struct CompiledTemplate {
    program: Arc<Program>,
    collaborators: Collaborators,
}

impl CompiledTemplate {
    /// Create a template from a compiled program.
    pub fn new(program: Program, collaborators: Collaborators) -> Self {
        Self {
            program: Arc::new(program),
            collaborators,
        }
    }

    /// Get the compiled program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Get the collaborators used during evaluation.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Render with the given data and options.
    ///
    /// `undefined` and `null` arguments are treated as empty objects.
    pub fn apply(&self, data: &Value, options: &Value) -> RenderResult<String> {
        self.evaluate(data, options)
    }

    /// Render with anything convertible into values.
    pub fn render(&self, data: impl Into<Value>, options: impl Into<Value>) -> RenderResult<String> {
        self.evaluate(&data.into(), &options.into())
    }

    fn evaluate(&self, data: &Value, options: &Value) -> RenderResult<String> {
        let data = or_empty(data);
        let options = or_empty(options);
        let mut frame = Frame::new(&self.program, &data, &options, &self.collaborators);
        Ok(match frame.eval(&self.program.body)? {
            Value::String(output) => output.to_string(),
            other => other.to_js_string(),
        })
    }
}

impl Template for CompiledTemplate {
    fn apply(&self, data: &Value, options: &Value) -> RenderResult<String> {
        self.evaluate(data, options)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("max_depth", &self.program.max_depth)
            .finish_non_exhaustive()
    }
}

fn or_empty(value: &Value) -> Value {
    if value.is_nullish() {
        Value::empty_object()
    } else {
        value.clone()
    }
}
