//! Compiler driver: walks the parse tree and assembles the output expression.

use crate::ast::{ParseNode, ParseTree, TagNode, EACH, ELSE, IF, SUBSTITUTION, TMPL};
use crate::emit;
use crate::error::{CompileError, CompileErrorCode, CompileResult};
use crate::ir::{Code, Program};
use crate::scope::Scope;
use crate::CompilerOptions;
use tmpl_expr::{Expr, Literal};
use tmpl_runtime::Value;

/// State threaded through one compilation.
pub(crate) struct CompileContext<'o> {
    pub(crate) scope: Scope,
    pub(crate) options: &'o CompilerOptions,
    /// Whether the current group already holds a string-typed value.
    pub(crate) pending: bool,
}

impl<'o> CompileContext<'o> {
    pub(crate) fn new(options: &'o CompilerOptions) -> Self {
        Self {
            scope: Scope::new(),
            options,
            pending: false,
        }
    }
}

/// The output of one node.
enum Fragment {
    /// Always evaluates to a string.
    Str(Code),
    /// May evaluate to any value.
    Value(Code),
}

/// Compile a whole tree.
pub(crate) fn compile_program(tree: &ParseTree, options: &CompilerOptions) -> CompileResult<Program> {
    let mut ctx = CompileContext::new(options);
    let body = compile_group(&mut ctx, &tree.children)?;
    Ok(Program {
        body,
        max_depth: ctx.scope.max_depth(),
    })
}

/// Compile a sequence of sibling nodes into one string-valued expression.
///
/// The pending flag is cleared for the group and restored afterwards, so
/// every group seeds its own concatenation.
pub(crate) fn compile_group<'n, I>(ctx: &mut CompileContext<'_>, nodes: I) -> CompileResult<Code>
where
    I: IntoIterator<Item = &'n ParseNode>,
{
    let outer = std::mem::replace(&mut ctx.pending, false);
    let group = compile_fragments(ctx, nodes);
    ctx.pending = outer;
    group
}

fn compile_fragments<'n, I>(ctx: &mut CompileContext<'_>, nodes: I) -> CompileResult<Code>
where
    I: IntoIterator<Item = &'n ParseNode>,
{
    let mut group = Code::empty();
    for node in nodes {
        group = match compile_node(ctx, node)? {
            Fragment::Str(code) | Fragment::Value(code) if ctx.pending => join(group, code),
            Fragment::Str(code) => code,
            // seed with "" so `${a}${b}` concatenates instead of adding
            Fragment::Value(code) => Code::concat(Code::empty(), code),
        };
        ctx.pending = true;
    }
    Ok(group)
}

fn join(group: Code, code: Code) -> Code {
    match (group, code) {
        (Code::Text(mut text), Code::Text(next)) => {
            text.push_str(&next);
            Code::Text(text)
        }
        (group, code) => Code::concat(group, code),
    }
}

fn compile_node(ctx: &mut CompileContext<'_>, node: &ParseNode) -> CompileResult<Fragment> {
    let tag = match node {
        ParseNode::Text(text) => return Ok(Fragment::Str(Code::Text(text.clone()))),
        ParseNode::Tag(tag) => tag,
    };

    match tag.kind.as_str() {
        SUBSTITUTION => emit::substitution::emit(ctx, tag).map(Fragment::Value),
        IF => emit::conditional::emit(ctx, tag).map(Fragment::Str),
        EACH => emit::iteration::emit(ctx, tag).map(Fragment::Str),
        TMPL => emit::invocation::emit(ctx, tag).map(Fragment::Str),
        ELSE => Err(CompileError::new(
            "`else` outside of `if`",
            CompileErrorCode::MisplacedElse,
            tag,
        )),
        _ => Err(CompileError::unknown_kind(tag)),
    }
}

/// Parse `source` and lower it against the current scope.
pub(crate) fn compile_expression(
    ctx: &CompileContext<'_>,
    source: &str,
    node: &TagNode,
) -> CompileResult<Code> {
    let expr = tmpl_expr::parse(source).map_err(|err| CompileError::invalid_expression(err, node))?;
    Ok(lower(&ctx.scope, &expr))
}

fn lower(scope: &Scope, expr: &Expr) -> Code {
    let boxed = |expr: &Expr| Box::new(lower(scope, expr));
    match expr {
        Expr::Literal(literal) => Code::Literal(match literal {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }),
        Expr::Ident(name) => match scope.resolve(name) {
            Some(slot) => Code::Local(slot),
            None if name == "$data" => Code::Data,
            None if name == "$options" => Code::Options,
            None => Code::Ambient(name.clone()),
        },
        Expr::Array(items) => Code::Array(items.iter().map(|item| lower(scope, item)).collect()),
        Expr::Object(entries) => Code::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), lower(scope, value)))
                .collect(),
        ),
        Expr::Member { object, property } => Code::Member {
            object: boxed(object),
            property: property.clone(),
        },
        Expr::Index { object, index } => Code::Index {
            object: boxed(object),
            index: boxed(index),
        },
        Expr::Call { callee, args } => Code::Call {
            callee: boxed(callee),
            args: args.iter().map(|arg| lower(scope, arg)).collect(),
        },
        Expr::Unary { op, operand } => Code::Unary {
            op: *op,
            operand: boxed(operand),
        },
        Expr::Binary { op, lhs, rhs } => Code::Binary {
            op: *op,
            lhs: boxed(lhs),
            rhs: boxed(rhs),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Code::Conditional {
            test: boxed(test),
            consequent: boxed(consequent),
            alternate: boxed(alternate),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn program(nodes: Vec<ParseNode>) -> Program {
        compile_program(&ParseTree::new(nodes), &CompilerOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_tree_is_empty_string() {
        assert_eq!(program(vec![]).body, Code::empty());
    }

    #[test]
    fn test_adjacent_text_merges() {
        let body = program(vec![ParseNode::text("a"), ParseNode::text("b")]).body;
        assert_eq!(body, Code::Text("ab".to_string()));
    }

    #[test]
    fn test_first_substitution_is_seeded() {
        let body = program(vec![ParseNode::substitution("a"), ParseNode::substitution("b")]).body;
        let Code::Binary { lhs, .. } = body else {
            panic!("Expected concatenation");
        };
        let Code::Binary { lhs: seed, .. } = *lhs else {
            panic!("Expected seeded substitution");
        };
        assert_eq!(*seed, Code::empty());
    }

    #[test]
    fn test_text_prefix_needs_no_seed() {
        let body = program(vec![ParseNode::text("n="), ParseNode::substitution("n")]).body;
        let Code::Binary { lhs, rhs, .. } = body else {
            panic!("Expected concatenation");
        };
        assert_eq!(*lhs, Code::Text("n=".to_string()));
        assert!(matches!(*rhs, Code::Dethunk { .. }));
    }

    #[test]
    fn test_identifier_resolution() {
        let mut scope = Scope::new();
        scope.push("k", "v");
        let expr = tmpl_expr::parse("[v, k, $data, $options, other]").unwrap();
        assert_eq!(
            lower(&scope, &expr),
            Code::Array(vec![
                Code::Local(1),
                Code::Local(0),
                Code::Data,
                Code::Options,
                Code::Ambient("other".into()),
            ])
        );
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let tree = ParseTree::new(vec![ParseNode::tag("wrap", "x", vec![])]);
        let err = compile_program(&tree, &CompilerOptions::default()).unwrap_err();
        assert_eq!(err.code, CompileErrorCode::UnknownKind);
        assert_eq!(err.directive, "{wrap x}{/wrap}");
    }

    #[test]
    fn test_else_outside_if_is_fatal() {
        let tree = ParseTree::new(vec![ParseNode::tag(ELSE, "", vec![])]);
        let err = compile_program(&tree, &CompilerOptions::default()).unwrap_err();
        assert_eq!(err.code, CompileErrorCode::MisplacedElse);
    }
}
