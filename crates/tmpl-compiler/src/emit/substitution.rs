//! `${expr=>f1=>f2}` substitutions.

use crate::ast::TagNode;
use crate::compile::{compile_expression, CompileContext};
use crate::error::{CompileError, CompileResult};
use crate::ir::Code;
use tmpl_expr::split_top_level;

/// Compile a substitution into a dethunked value wrapped by its accessors.
///
/// `x=>f=>g` becomes `g(f(dethunk(x)))`; the base is evaluated once.
pub(crate) fn emit(ctx: &mut CompileContext<'_>, node: &TagNode) -> CompileResult<Code> {
    let pieces = split_top_level(&node.content, "=>");
    let Some((base, accessors)) = pieces.split_first() else {
        return Err(CompileError::invalid_expression("empty substitution", node));
    };

    let base = base.trim();
    if base.is_empty() {
        return Err(CompileError::invalid_expression("empty substitution", node));
    }

    let mut code = Code::Dethunk {
        temp: ctx.scope.value_temp(),
        value: Box::new(compile_expression(ctx, base, node)?),
    };

    for accessor in accessors {
        let accessor = accessor.trim();
        if accessor.is_empty() {
            return Err(CompileError::invalid_expression("empty accessor", node));
        }
        code = Code::Call {
            callee: Box::new(compile_expression(ctx, accessor, node)?),
            args: vec![code],
        };
    }

    Ok(code)
}
