//! `{tmpl (data, options) selector}` sub-template calls.

use crate::ast::TagNode;
use crate::compile::{compile_expression, CompileContext};
use crate::error::{CompileError, CompileResult};
use crate::ir::Code;
use crate::scope::Scope;
use smol_str::SmolStr;
use tmpl_expr::{matching_paren, split_top_level};

/// A parsed `tmpl` header.
#[derive(Debug, Default, PartialEq)]
struct Header<'n> {
    data: Option<&'n str>,
    options: Option<&'n str>,
    selector: &'n str,
}

/// Compile a sub-template invocation.
///
/// Arguments are chosen per position: an explicit expression wins;
/// otherwise data is the ambient data merged with the in-scope loop
/// variables (when there are any) and options are the ambient options.
pub(crate) fn emit(ctx: &mut CompileContext<'_>, node: &TagNode) -> CompileResult<Code> {
    let header = parse_header(node)?;

    let data = match header.data {
        Some(source) => compile_expression(ctx, source, node)?,
        None if !ctx.scope.is_empty() => {
            Code::Merge(vec![Code::Data, Code::Object(in_scope_vars(&ctx.scope))])
        }
        None => Code::Data,
    };
    let options = match header.options {
        Some(source) => compile_expression(ctx, source, node)?,
        None => Code::Options,
    };
    let selector = compile_expression(ctx, header.selector, node)?;
    let name = match &selector {
        Code::Ambient(name) => Some(name.clone()),
        _ => None,
    };

    Ok(Code::Invoke {
        data: Box::new(data),
        options: Box::new(options),
        selector: Box::new(selector),
        name,
    })
}

/// Object entries for every loop variable; inner loops come last and win.
fn in_scope_vars(scope: &Scope) -> Vec<(SmolStr, Code)> {
    scope
        .vars()
        .map(|(name, slot)| (name.clone(), Code::Local(slot)))
        .collect()
}

fn parse_header(node: &TagNode) -> CompileResult<Header<'_>> {
    let content = node.content();
    if content.is_empty() {
        return Err(CompileError::invalid_tmpl("missing selector", node));
    }
    if !content.starts_with('(') {
        return Ok(Header {
            selector: content,
            ..Default::default()
        });
    }

    let close = matching_paren(content, 0)
        .ok_or_else(|| CompileError::invalid_tmpl("unbalanced parentheses", node))?;
    let inner = &content[1..close];
    let rest = &content[close + 1..];
    let selector = rest.trim();
    let args: Vec<&str> = if inner.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(inner, ",").into_iter().map(str::trim).collect()
    };

    // `(x).name` is a selector expression, not an argument list
    if args.len() == 1 && !selector.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Ok(Header {
            selector: content,
            ..Default::default()
        });
    }

    if selector.is_empty() {
        // `tmpl ("#row")` is a parenthesized selector
        return if args.len() == 1 {
            Ok(Header {
                selector: content,
                ..Default::default()
            })
        } else {
            Err(CompileError::invalid_tmpl("missing selector", node))
        };
    }

    if args.len() > 2 {
        return Err(CompileError::invalid_tmpl(
            &format!("expected at most 2 arguments, found {}", args.len()),
            node,
        ));
    }
    if args.iter().any(|arg| arg.is_empty()) {
        return Err(CompileError::invalid_tmpl("empty argument", node));
    }

    Ok(Header {
        data: args.first().copied(),
        options: args.get(1).copied(),
        selector,
    })
}
