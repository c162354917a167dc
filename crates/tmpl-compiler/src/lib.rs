//! Compiler for tmpl templates.
//!
//! A template arrives as a [`ParseTree`]: text runs interleaved with
//! substitution (`${expr}`), conditional (`{if}`/`{else}`), iteration
//! (`{each}`) and sub-template (`{tmpl}`) directives. [`compile`] turns
//! it into a [`CompiledTemplate`] that renders `(data, options)` into a
//! string.
//!
//! Compilation lowers every directive into one [`Code`] tree:
//!
//! - substitutions evaluate their expression once and call it with
//!   `(data, options)` when it is a function ("dethunking");
//! - consecutive fragments concatenate as strings, never as numbers;
//! - loop variables resolve to local slots at compile time and are
//!   merged into the data of nested sub-template calls.
//!
//! All compile failures are fatal and carry the offending directive.

pub mod ast;
mod compile;
mod emit;
pub mod error;
mod eval;
pub mod ir;
pub mod scope;
pub mod template;

pub use ast::{ParseNode, ParseTree, TagNode};
pub use error::{CompileError, CompileErrorCode, CompileResult};
pub use ir::{Code, Program, Temp, TempKind};
pub use scope::Scope;
pub use template::CompiledTemplate;

use smol_str::SmolStr;
use tmpl_runtime::Collaborators;

/// Options affecting compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct CompilerOptions {
    /// Key variable name for `each` without explicit names.
    pub key_var: SmolStr,
    /// Value variable name for `each` without explicit names.
    pub value_var: SmolStr,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            key_var: "$index".into(),
            value_var: "$value".into(),
        }
    }
}

/// Compiles parse trees against a fixed set of collaborators.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    collaborators: Collaborators,
    options: CompilerOptions,
}

impl Compiler {
    /// Create a compiler whose templates use the given collaborators.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            options: CompilerOptions::default(),
        }
    }

    /// Set the compiler options.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Compile a tree into its program without binding collaborators.
    pub fn compile_program(&self, tree: &ParseTree) -> CompileResult<Program> {
        tracing::debug!(nodes = tree.node_count(), "compiling template");
        let program = compile::compile_program(tree, &self.options)?;
        tracing::debug!(max_depth = program.max_depth, "compiled template");
        Ok(program)
    }

    /// Compile a tree into a callable template.
    pub fn compile(&self, tree: &ParseTree) -> CompileResult<CompiledTemplate> {
        let program = self.compile_program(tree)?;
        Ok(CompiledTemplate::new(program, self.collaborators.clone()))
    }
}

/// Compile a tree with the default collaborators and options.
pub fn compile(tree: &ParseTree) -> CompileResult<CompiledTemplate> {
    Compiler::default().compile(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EACH, ELSE, IF, TMPL};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tmpl_runtime::{RenderError, TemplateMap, Value};

    fn text(s: &str) -> ParseNode {
        ParseNode::text(s)
    }

    fn sub(expr: &str) -> ParseNode {
        ParseNode::substitution(expr)
    }

    fn tag(kind: &str, content: &str, children: Vec<ParseNode>) -> ParseNode {
        ParseNode::tag(kind, content, children)
    }

    fn render(nodes: Vec<ParseNode>, data: impl Into<Value>) -> String {
        compile(&ParseTree::new(nodes))
            .unwrap()
            .render(data, Value::Undefined)
            .unwrap()
    }

    /// A registry shared by every template a test compiles.
    fn registry() -> (Compiler, Arc<TemplateMap>) {
        let map = Arc::new(TemplateMap::new());
        let compiler = Compiler::new(Collaborators::default().with_registry(map.clone()));
        (compiler, map)
    }

    fn register(compiler: &Compiler, map: &TemplateMap, name: &str, nodes: Vec<ParseNode>) {
        let template = compiler.compile(&ParseTree::new(nodes)).unwrap();
        map.insert(name, Arc::new(template));
    }

    #[test]
    fn test_literal_only_ignores_data() {
        let nodes = vec![text("<p>"), text("hi"), text("</p>")];
        assert_eq!(render(nodes.clone(), Value::Undefined), "<p>hi</p>");
        assert_eq!(render(nodes, json!({"hi": 1})), "<p>hi</p>");
    }

    #[test]
    fn test_substitutions_concatenate_as_strings() {
        let data = json!({"a": 1, "b": 2});
        assert_eq!(render(vec![sub("a"), sub("b")], data.clone()), "12");
        assert_eq!(render(vec![sub("a + b"), text("!")], data.clone()), "3!");
        assert_eq!(render(vec![text("="), sub("a"), sub("b")], data), "=12");
    }

    #[test]
    fn test_missing_names_render_undefined() {
        assert_eq!(render(vec![sub("nothing")], json!({})), "undefined");
    }

    #[test]
    fn test_options_resolve_after_data() {
        let template = compile(&ParseTree::new(vec![sub("title"), text("/"), sub("mode")])).unwrap();
        let output = template
            .render(json!({"title": "data"}), json!({"title": "options", "mode": "dark"}))
            .unwrap();
        assert_eq!(output, "data/dark");
    }

    #[test]
    fn test_dethunk_calls_functions_with_data_and_options() {
        let data = Value::from_pairs([
            ("x", Value::from(1)),
            (
                "f",
                Value::function("f", |args| {
                    Ok(Value::from(format!("{}:{}", args.len(), args[0].get("x")?)))
                }),
            ),
        ]);
        assert_eq!(render(vec![sub("f")], data.clone()), "2:1");
        assert_eq!(render(vec![sub("x")], data), "1");
    }

    #[test]
    fn test_accessors_apply_left_to_right() {
        let suffix = |name: &'static str| {
            Value::function(name, move |args| {
                Ok(Value::from(format!("{}{}", args[0].to_js_string(), name)))
            })
        };
        let data = Value::from_pairs([
            ("x", Value::from("x")),
            ("f", suffix("f")),
            ("g", suffix("g")),
        ]);
        assert_eq!(render(vec![sub("x=>f=>g")], data), "xfg");
    }

    #[test]
    fn test_base_is_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let data = Value::from_pairs([
            (
                "next",
                Value::function("next", move |_| {
                    Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) + 1))
                }),
            ),
            ("wrap", Value::function("wrap", |args| Ok(args[0].clone()))),
        ]);
        assert_eq!(render(vec![sub("next=>wrap")], data), "1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_conditionals() {
        let if_else = vec![tag(
            IF,
            "false",
            vec![text("A"), tag(ELSE, "", vec![]), text("B")],
        )];
        assert_eq!(render(if_else, Value::Undefined), "B");

        let else_if = vec![tag(
            IF,
            "true",
            vec![text("A"), tag(ELSE, "true", vec![]), text("B")],
        )];
        assert_eq!(render(else_if, Value::Undefined), "A");

        let else_if_keyword = vec![tag(
            IF,
            "false",
            vec![text("A"), tag(ELSE, "if true", vec![]), text("B")],
        )];
        assert_eq!(render(else_if_keyword, Value::Undefined), "B");

        let no_match = vec![text("["), tag(IF, "n > 5", vec![sub("n")]), text("]")];
        assert_eq!(render(no_match, json!({"n": 1})), "[]");
    }

    #[test]
    fn test_branches_seed_their_own_concatenation() {
        let nodes = vec![tag(IF, "true", vec![sub("a"), sub("b")])];
        assert_eq!(render(nodes, json!({"a": 1, "b": 2})), "12");
    }

    #[test]
    fn test_blank_condition_is_fatal() {
        let tree = ParseTree::new(vec![tag(IF, "  ", vec![text("A")])]);
        let err = compile(&tree).unwrap_err();
        assert_eq!(err.code, CompileErrorCode::MissingCondition);
        assert_eq!(err.to_string(), "Missing condition in `{if}A{/if}`");
    }

    #[test]
    fn test_iteration() {
        let body = vec![sub("k"), text(":"), sub("v"), text(";")];
        let nodes = vec![tag(EACH, "(k,v) [10,20]", body.clone())];
        assert_eq!(render(nodes, Value::Undefined), "0:10;1:20;");

        let unspaced = vec![tag(EACH, "(k,v)[10,20]", body.clone())];
        assert_eq!(render(unspaced, Value::Undefined), "0:10;1:20;");

        let empty = vec![tag(EACH, "(k,v) []", body.clone())];
        assert_eq!(render(empty, Value::Undefined), "");

        let object = vec![tag(EACH, "(k, v) item", body)];
        assert_eq!(render(object, json!({"item": {"b": 1, "a": 2}})), "b:1;a:2;");
    }

    #[test]
    fn test_default_loop_names() {
        let nodes = vec![tag(EACH, "rows", vec![sub("$index"), sub("$value")])];
        assert_eq!(render(nodes, json!({"rows": ["a", "b"]})), "0a1b");

        let compiler = Compiler::default().with_options(CompilerOptions {
            key_var: "i".into(),
            value_var: "row".into(),
        });
        let tree = ParseTree::new(vec![tag(EACH, "rows", vec![sub("i"), sub("row")])]);
        let output = compiler
            .compile(&tree)
            .unwrap()
            .render(json!({"rows": ["a"]}), Value::Undefined)
            .unwrap();
        assert_eq!(output, "0a");
    }

    #[test]
    fn test_sibling_and_nested_loops() {
        let siblings = vec![
            tag(EACH, "(i, x) a", vec![sub("x")]),
            text("|"),
            tag(EACH, "(i, x) b", vec![sub("x")]),
        ];
        assert_eq!(render(siblings, json!({"a": [1, 2], "b": [3, 4]})), "12|34");

        let nested = vec![tag(
            EACH,
            "(i, row) rows",
            vec![
                text("["),
                tag(EACH, "(j, c) row", vec![sub("i"), sub("j"), sub("c"), text(",")]),
                text("]"),
            ],
        )];
        assert_eq!(
            render(nested, json!({"rows": [[1, 2], [3]]})),
            "[001,012,][103,]"
        );
    }

    #[test]
    fn test_loop_variables_propagate_to_sub_templates() {
        let (compiler, map) = registry();
        register(&compiler, &map, "sub", vec![sub("k"), text("-"), sub("v"), text("-"), sub("name"), text("|")]);

        let outer = compiler
            .compile(&ParseTree::new(vec![tag(
                EACH,
                "(k, v) arr",
                vec![tag(TMPL, "sub", vec![])],
            )]))
            .unwrap();
        let output = outer
            .render(json!({"arr": ["a", "b"], "k": "ambient", "name": "n"}), Value::Undefined)
            .unwrap();
        assert_eq!(output, "0-a-n|1-b-n|");
    }

    #[test]
    fn test_sub_template_argument_precedence() {
        let (compiler, map) = registry();
        register(&compiler, &map, "row", vec![sub("k"), text("/"), sub("$options.mode")]);

        let render_with = |content: &str, in_loop: bool| {
            let call = tag(TMPL, content, vec![]);
            let nodes = if in_loop {
                vec![tag(EACH, "(k, v) [1]", vec![call])]
            } else {
                vec![call]
            };
            compiler
                .compile(&ParseTree::new(nodes))
                .unwrap()
                .render(json!({"k": "ambient", "d": {"k": "explicit"}, "t": {"name": "row"}}), json!({"mode": "dark"}))
                .unwrap()
        };

        // explicit data beats loop variables; options still forwarded
        assert_eq!(render_with("(d) row", true), "explicit/dark");
        assert_eq!(render_with("(d, {mode: 'light'}) row", true), "explicit/light");
        // loop variables beat ambient data
        assert_eq!(render_with("row", true), "0/dark");
        // plain pass-through
        assert_eq!(render_with("row", false), "ambient/dark");
        assert_eq!(render_with("() '#row'", false), "ambient/dark");
        // a selector expression that opens with a parenthesis
        assert_eq!(render_with("(t).name", false), "ambient/dark");
    }

    #[test]
    fn test_render_errors_propagate() {
        let template = compile(&ParseTree::new(vec![sub("user.name")])).unwrap();
        let err = template.render(json!({}), Value::Undefined).unwrap_err();
        assert_eq!(
            err,
            RenderError::PropertyOfNothing {
                target: "undefined",
                property: "name".into(),
            }
        );

        let template = compile(&ParseTree::new(vec![tag(TMPL, "missing", vec![])])).unwrap();
        let err = template.render(json!({}), Value::Undefined).unwrap_err();
        assert_eq!(err, RenderError::unknown_template("missing"));

        let template = compile(&ParseTree::new(vec![sub("n(1)")])).unwrap();
        let err = template.render(json!({"n": 3}), Value::Undefined).unwrap_err();
        assert_eq!(err, RenderError::not_callable("n"));
    }

    #[test]
    fn test_compiling_twice_is_idempotent() {
        let tree = ParseTree::new(vec![
            tag(EACH, "(k, v) rows", vec![sub("k"), sub("v")]),
            tag(IF, "flag", vec![text("!")]),
        ]);
        let data = json!({"rows": ["x", "y"], "flag": true});
        let first = compile(&tree).unwrap();
        let second = compile(&tree).unwrap();
        assert_eq!(first.program(), second.program());
        assert_eq!(
            first.render(data.clone(), Value::Undefined).unwrap(),
            second.render(data, Value::Undefined).unwrap()
        );
    }

    #[test]
    fn test_templates_render_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledTemplate>();

        let template = compile(&ParseTree::new(vec![tag(EACH, "rows", vec![sub("$value")])])).unwrap();
        std::thread::scope(|scope| {
            for n in 0..4 {
                let template = &template;
                scope.spawn(move || {
                    let output = template
                        .render(json!({"rows": [n, n]}), Value::Undefined)
                        .unwrap();
                    assert_eq!(output, format!("{n}{n}"));
                });
            }
        });
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_compile_from_json() {
        let tree: ParseTree = serde_json::from_str(
            r#"["<ul>", ["each", "(i, item) items", "<li>", ["=", "i"], ".", ["=", "item"], "</li>"], "</ul>"]"#,
        )
        .unwrap();
        let output = compile(&tree)
            .unwrap()
            .render(json!({"items": ["a", "b"]}), Value::Undefined)
            .unwrap();
        assert_eq!(output, "<ul><li>0.a</li><li>1.b</li></ul>");
    }
}
