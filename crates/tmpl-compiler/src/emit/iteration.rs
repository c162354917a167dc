//! `{each (key, value) container}…{/each}` loops.

use crate::ast::TagNode;
use crate::compile::{compile_expression, compile_group, CompileContext};
use crate::error::{CompileError, CompileResult};
use crate::ir::Code;
use crate::CompilerOptions;
use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;
use tmpl_expr::{matching_paren, split_top_level};

/// `key` or `key, value` inside the header parentheses.
static LOOP_VARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:,\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*)?$")
        .expect("valid loop variable pattern")
});

/// A parsed loop header.
#[derive(Debug, PartialEq)]
struct Header<'n> {
    key: SmolStr,
    value: SmolStr,
    container: &'n str,
}

/// Compile a loop.
///
/// The container is compiled in the enclosing scope; the body one level
/// deeper, with the loop's key and value names in scope.
pub(crate) fn emit(ctx: &mut CompileContext<'_>, node: &TagNode) -> CompileResult<Code> {
    let header = parse_header(node, ctx.options)?;
    let container = compile_expression(ctx, header.container, node)?;

    let buffer = ctx.scope.buffer_temp();
    let slot = ctx.scope.push(header.key.clone(), header.value.clone());
    ctx.scope.enter();
    let body = compile_group(ctx, &node.children);
    ctx.scope.exit();
    ctx.scope.pop();

    Ok(Code::Each {
        buffer,
        slot,
        key: header.key,
        value: header.value,
        container: Box::new(container),
        body: Box::new(body?),
    })
}

fn parse_header<'n>(node: &'n TagNode, options: &CompilerOptions) -> CompileResult<Header<'n>> {
    let content = node.content();
    if content.is_empty() {
        return Err(CompileError::invalid_each("missing container", node));
    }

    let bare = |container| Header {
        key: options.key_var.clone(),
        value: options.value_var.clone(),
        container,
    };

    if !content.starts_with('(') {
        return Ok(bare(content));
    }

    let close = matching_paren(content, 0)
        .ok_or_else(|| CompileError::invalid_each("unbalanced parentheses", node))?;
    let inner = &content[1..close];
    let rest = &content[close + 1..];
    let names = LOOP_VARS.captures(inner);

    let is_list = split_top_level(inner, ",").len() > 1;

    if rest.trim().is_empty() {
        // `(key, value)` alone names variables but nothing to iterate
        return if names.is_some() || is_list {
            Err(CompileError::invalid_each("missing container", node))
        } else {
            Ok(bare(content))
        };
    }

    // `(rows).slice(1)` is a container expression, not a header;
    // a comma list is always a header, `(k,v)[1, 2]` included
    if !is_list && !rest.starts_with(char::is_whitespace) {
        return Ok(bare(content));
    }

    let Some(names) = names else {
        return Err(CompileError::invalid_each("invalid loop variables", node));
    };
    let key = names.get(1).map_or(options.key_var.clone(), |m| m.as_str().into());
    let value = names.get(2).map_or(options.value_var.clone(), |m| m.as_str().into());

    Ok(Header {
        key,
        value,
        container: rest.trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ParseNode, EACH};
    use crate::error::CompileErrorCode;
    use crate::ir::{Temp, TempKind};
    use pretty_assertions::assert_eq;

    fn node(content: &str) -> TagNode {
        TagNode {
            kind: EACH.into(),
            content: content.to_string(),
            children: vec![ParseNode::substitution("v")],
        }
    }

    fn header(content: &str) -> CompileResult<(String, String, String)> {
        let node = node(content);
        parse_header(&node, &CompilerOptions::default())
            .map(|h| (h.key.to_string(), h.value.to_string(), h.container.to_string()))
    }

    fn triple(key: &str, value: &str, container: &str) -> (String, String, String) {
        (key.to_string(), value.to_string(), container.to_string())
    }

    #[test]
    fn test_header_forms() {
        assert_eq!(header("(k, v) rows").unwrap(), triple("k", "v", "rows"));
        assert_eq!(header("(k) rows").unwrap(), triple("k", "$value", "rows"));
        assert_eq!(header("rows").unwrap(), triple("$index", "$value", "rows"));
        assert_eq!(header("(k,v)   [10, 20]").unwrap(), triple("k", "v", "[10, 20]"));
        assert_eq!(header("(k,v)[10,20]").unwrap(), triple("k", "v", "[10,20]"));
        assert_eq!(header("(k, v)rows.all").unwrap(), triple("k", "v", "rows.all"));
        assert_eq!(
            header("(rows).slice(1)").unwrap(),
            triple("$index", "$value", "(rows).slice(1)")
        );
        assert_eq!(
            header("(a || b)").unwrap(),
            triple("$index", "$value", "(a || b)")
        );
    }

    #[test]
    fn test_malformed_headers() {
        for content in ["", "(k, v)", "(k, v rows", "(1, v) rows", "(a, b, c) rows", "(1, v)[x]"] {
            let err = header(content).unwrap_err();
            assert_eq!(err.code, CompileErrorCode::InvalidEach, "{content}");
        }
    }

    #[test]
    fn test_custom_default_names() {
        let node = node("rows");
        let options = CompilerOptions {
            key_var: "i".into(),
            value_var: "item".into(),
        };
        let header = parse_header(&node, &options).unwrap();
        assert_eq!((header.key.as_str(), header.value.as_str()), ("i", "item"));
    }

    #[test]
    fn test_loop_binds_slots_and_restores_scope() {
        let options = CompilerOptions::default();
        let mut ctx = CompileContext::new(&options);
        let node = TagNode {
            kind: EACH.into(),
            content: "(k, v) rows".to_string(),
            children: vec![ParseNode::substitution("v")],
        };

        let code = emit(&mut ctx, &node).unwrap();
        let Code::Each {
            buffer,
            slot,
            key,
            value,
            container,
            body,
        } = code
        else {
            panic!("Expected each");
        };
        assert_eq!(buffer, Temp::new(TempKind::Buffer, 0));
        assert_eq!(slot, 0);
        assert_eq!((key.as_str(), value.as_str()), ("k", "v"));
        assert_eq!(*container, Code::Ambient("rows".into()));
        assert_eq!(
            *body,
            Code::concat(
                Code::empty(),
                Code::Dethunk {
                    temp: Temp::new(TempKind::Value, 1),
                    value: Box::new(Code::Local(1)),
                }
            )
        );

        assert!(ctx.scope.is_empty());
        assert_eq!(ctx.scope.depth(), 0);
        assert_eq!(ctx.scope.max_depth(), 1);
    }
}
