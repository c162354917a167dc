//! Parse tree consumed by the compiler.

use smol_str::SmolStr;
use std::fmt;

/// Kind of a substitution node (`${expr}`).
pub const SUBSTITUTION: &str = "=";
/// Kind of a conditional node (`{if}`).
pub const IF: &str = "if";
/// Kind of a chain marker inside a conditional (`{else}`).
pub const ELSE: &str = "else";
/// Kind of an iteration node (`{each}`).
pub const EACH: &str = "each";
/// Kind of a sub-template node (`{tmpl}`).
pub const TMPL: &str = "tmpl";

/// The root of a parse tree: its top-level children.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ParseTree {
    /// Top-level nodes, in source order.
    pub children: Vec<ParseNode>,
}

impl ParseTree {
    /// Create a tree from its top-level nodes.
    pub fn new(children: Vec<ParseNode>) -> Self {
        Self { children }
    }

    /// Count every node in the tree.
    pub fn node_count(&self) -> usize {
        self.children.iter().map(ParseNode::node_count).sum()
    }
}

impl From<Vec<ParseNode>> for ParseTree {
    fn from(children: Vec<ParseNode>) -> Self {
        Self::new(children)
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        Ok(())
    }
}

/// A node in the parse tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNode {
    /// A literal text run.
    Text(String),
    /// A directive.
    Tag(TagNode),
}

impl ParseNode {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a directive node.
    pub fn tag(kind: impl Into<SmolStr>, content: impl Into<String>, children: Vec<ParseNode>) -> Self {
        Self::Tag(TagNode {
            kind: kind.into(),
            content: content.into(),
            children,
        })
    }

    /// Create a substitution node.
    pub fn substitution(expr: impl Into<String>) -> Self {
        Self::tag(SUBSTITUTION, expr, Vec::new())
    }

    /// Get the directive, if this is one.
    pub fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Text(_) => None,
        }
    }

    /// Check if this is a directive of the given kind.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.as_tag().is_some_and(|tag| tag.kind == kind)
    }

    fn node_count(&self) -> usize {
        match self {
            Self::Text(_) => 1,
            Self::Tag(tag) => 1 + tag.children.iter().map(ParseNode::node_count).sum::<usize>(),
        }
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

/// A directive: `(kind, content, ...children)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// The directive kind.
    pub kind: SmolStr,
    /// Raw content after the kind, e.g. the expression or loop header.
    pub content: String,
    /// Nested nodes, for block directives.
    pub children: Vec<ParseNode>,
}

impl TagNode {
    /// Trimmed content.
    pub fn content(&self) -> &str {
        self.content.trim()
    }
}

/// Writes the directive back in template syntax.
impl fmt::Display for TagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = self.content();
        if self.kind == SUBSTITUTION {
            return write!(f, "${{{}}}", content);
        }

        f.write_str("{")?;
        f.write_str(&self.kind)?;
        if !content.is_empty() {
            write!(f, " {}", content)?;
        }
        f.write_str("}")?;

        for child in &self.children {
            write!(f, "{}", child)?;
        }

        // else markers live inside their if and have no closing tag
        if self.kind != ELSE {
            write!(f, "{{/{}}}", self.kind)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    //! Nodes are a string (text) or `[kind, content, ...children]`.

    use super::{ParseNode, TagNode};
    use serde::de::{self, SeqAccess, Visitor};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use smol_str::SmolStr;
    use std::fmt;

    impl Serialize for ParseNode {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                ParseNode::Text(text) => serializer.serialize_str(text),
                ParseNode::Tag(tag) => {
                    let mut seq = serializer.serialize_seq(Some(2 + tag.children.len()))?;
                    seq.serialize_element(&tag.kind)?;
                    seq.serialize_element(&tag.content)?;
                    for child in &tag.children {
                        seq.serialize_element(child)?;
                    }
                    seq.end()
                }
            }
        }
    }

    impl<'de> Deserialize<'de> for ParseNode {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(NodeVisitor)
        }
    }

    struct NodeVisitor;

    impl<'de> Visitor<'de> for NodeVisitor {
        type Value = ParseNode;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a text string or a [kind, content, ...children] array")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<ParseNode, E> {
            Ok(ParseNode::Text(value.to_string()))
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<ParseNode, E> {
            Ok(ParseNode::Text(value))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ParseNode, A::Error> {
            let kind: SmolStr = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(0, &self))?;
            let content = seq
                .next_element::<Option<String>>()?
                .flatten()
                .unwrap_or_default();
            let mut children = Vec::new();
            while let Some(child) = seq.next_element::<ParseNode>()? {
                children.push(child);
            }
            Ok(ParseNode::Tag(TagNode {
                kind,
                content,
                children,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_reconstructs_source() {
        let node = ParseNode::tag(
            IF,
            "a > 1",
            vec![
                ParseNode::text("A"),
                ParseNode::tag(ELSE, "b", vec![]),
                ParseNode::tag(SUBSTITUTION, " b ", vec![]),
                ParseNode::tag(ELSE, "", vec![]),
                ParseNode::text("C"),
            ],
        );
        assert_eq!(node.to_string(), "{if a > 1}A{else b}${b}{else}C{/if}");
    }

    #[test]
    fn test_display_each() {
        let node = ParseNode::tag(EACH, "(k, v) rows", vec![ParseNode::text("x")]);
        assert_eq!(node.to_string(), "{each (k, v) rows}x{/each}");
    }

    #[test]
    fn test_node_count() {
        let tree = ParseTree::new(vec![
            ParseNode::text("a"),
            ParseNode::tag(EACH, "rows", vec![ParseNode::tag(SUBSTITUTION, "$value", vec![])]),
        ]);
        assert_eq!(tree.node_count(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_tree() {
        let tree: ParseTree =
            serde_json::from_str(r#"["Hi ", ["=", "name"], ["if", "x", "y", ["else"], "z"]]"#)
                .unwrap();
        assert_eq!(
            tree,
            ParseTree::new(vec![
                ParseNode::text("Hi "),
                ParseNode::tag(SUBSTITUTION, "name", vec![]),
                ParseNode::tag(
                    IF,
                    "x",
                    vec![
                        ParseNode::text("y"),
                        ParseNode::tag(ELSE, "", vec![]),
                        ParseNode::text("z"),
                    ]
                ),
            ])
        );

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"["Hi ",["=","name"],["if","x","y",["else",""],"z"]]"#
        );
    }
}
