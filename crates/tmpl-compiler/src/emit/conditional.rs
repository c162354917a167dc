//! `{if}…{else}…{/if}` chains.

use crate::ast::{ParseNode, TagNode, ELSE};
use crate::compile::{compile_expression, compile_group, CompileContext};
use crate::error::{CompileError, CompileErrorCode, CompileResult};
use crate::ir::Code;

/// One arm of the chain.
struct Branch<'n> {
    condition: Option<&'n str>,
    body: Vec<&'n ParseNode>,
}

/// Compile a conditional into a ternary chain.
///
/// A missing final `else` and an empty branch both yield `""`.
pub(crate) fn emit(ctx: &mut CompileContext<'_>, node: &TagNode) -> CompileResult<Code> {
    let branches = split_branches(node);
    let last = branches.len() - 1;

    let mut arms = Vec::with_capacity(branches.len());
    for (i, branch) in branches.iter().enumerate() {
        let test = match branch.condition {
            Some(condition) => Some(compile_expression(ctx, condition, node)?),
            None if i == 0 => {
                return Err(CompileError::new(
                    "Missing condition",
                    CompileErrorCode::MissingCondition,
                    node,
                ))
            }
            None if i != last => {
                return Err(CompileError::new(
                    "`else` without a condition must be the last branch",
                    CompileErrorCode::MisplacedElse,
                    node,
                ))
            }
            None => None,
        };
        let body = compile_group(ctx, branch.body.iter().copied())?;
        arms.push((test, body));
    }

    let mut chain = Code::empty();
    for (test, body) in arms.into_iter().rev() {
        chain = match test {
            Some(test) => Code::Conditional {
                test: Box::new(test),
                consequent: Box::new(body),
                alternate: Box::new(chain),
            },
            None => body,
        };
    }
    Ok(chain)
}

/// Split the children of an `if` on its `else` markers.
fn split_branches(node: &TagNode) -> Vec<Branch<'_>> {
    let mut branches = vec![Branch {
        condition: condition(&node.content),
        body: Vec::new(),
    }];

    for child in &node.children {
        match child {
            ParseNode::Tag(marker) if marker.kind == ELSE => branches.push(Branch {
                condition: else_condition(&marker.content),
                body: marker.children.iter().collect(),
            }),
            other => {
                if let Some(branch) = branches.last_mut() {
                    branch.body.push(other);
                }
            }
        }
    }

    branches
}

fn condition(content: &str) -> Option<&str> {
    let content = content.trim();
    (!content.is_empty()).then_some(content)
}

/// Marker content may repeat the keyword: `{else if cond}`.
fn else_condition(content: &str) -> Option<&str> {
    let content = content.trim_start();
    let content = match content.strip_prefix("if") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
        _ => content,
    };
    condition(content)
}
