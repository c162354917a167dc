//! Source output for compiled tmpl templates.
//!
//! Renders a [`Program`] as a JavaScript-like function, the form a
//! string-building template compiler would emit. Literal text runs go
//! through the [`Escape`] collaborator. The output is a debugging view of
//! what the evaluator runs and relies on four runtime helpers:
//!
//! - `$lookup(name)`: a bare name resolved against data, then options;
//! - `$each(container, fn)`: the iteration primitive;
//! - `$merge(target, ...sources)`: the merge primitive;
//! - `$tmpl(data, options, selector)`: registry lookup and apply.

pub mod builder;
pub mod context;
pub mod template;

use std::fmt;
use std::sync::Arc;
use tmpl_compiler::Program;
use tmpl_runtime::{Escape, JsonEscaper};

pub use builder::CodeBuilder;
pub use context::CodegenContext;
pub use template::generate_code;

/// Options for code generation.
#[derive(Clone)]
pub struct CodegenOptions {
    /// Name of the generated function; anonymous when unset.
    pub name: Option<String>,
    /// Escaper for literal text.
    pub escaper: Arc<dyn Escape>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            name: None,
            escaper: Arc::new(JsonEscaper),
        }
    }
}

impl fmt::Debug for CodegenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodegenOptions")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Generate the source of a compiled program.
pub fn generate(program: &Program, options: &CodegenOptions) -> String {
    let mut ctx = CodegenContext::new(options.escaper.as_ref());
    let mut builder = CodeBuilder::new();

    builder.push_str("function ");
    if let Some(name) = &options.name {
        builder.push_str(name);
    }
    builder.push_str("($data, $options) {");
    builder.indent();

    let temps = program.body.temps();
    if !temps.is_empty() {
        builder.newline();
        builder.push_str("var ");
        let names: Vec<String> = temps.iter().map(ToString::to_string).collect();
        builder.push_str(&names.join(", "));
        builder.push(';');
    }

    builder.newline();
    builder.push_str("return ");
    generate_code(&mut builder, &program.body, &mut ctx);
    builder.push(';');
    builder.dedent();
    builder.newline();
    builder.push('}');
    builder.newline();

    builder.finish()
}
