//! Intermediate representation of a compiled template.
//!
//! A template compiles to a single [`Code`] tree that evaluates to the
//! output string. Expressions from directive content are lowered into the
//! same tree, with loop variables already resolved to local slots.

use smol_str::SmolStr;
use std::fmt;
use tmpl_expr::{BinaryOp, UnaryOp};
use tmpl_runtime::Value;

/// A compiled template body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Expression producing the output string.
    pub body: Code,
    /// Deepest loop nesting, used to size per-depth temporaries.
    pub max_depth: usize,
}

/// Kind of a per-depth temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempKind {
    /// Holds a substitution value while it is dethunked.
    Value,
    /// Accumulates the output of a loop.
    Buffer,
}

/// A temporary named after the nesting depth it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp {
    pub kind: TempKind,
    pub depth: usize,
}

impl Temp {
    pub fn new(kind: TempKind, depth: usize) -> Self {
        Self { kind, depth }
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            TempKind::Value => "$v",
            TempKind::Buffer => "$a",
        };
        write!(f, "{}{}", prefix, self.depth)
    }
}

/// A node of compiled code.
#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    /// A literal text run.
    Text(String),
    /// A literal value from an expression.
    Literal(Value),
    /// A loop variable, by slot.
    Local(usize),
    /// A bare name looked up in data, then options.
    Ambient(SmolStr),
    /// The ambient data argument.
    Data,
    /// The ambient options argument.
    Options,
    Array(Vec<Code>),
    Object(Vec<(SmolStr, Code)>),
    Member {
        object: Box<Code>,
        property: SmolStr,
    },
    Index {
        object: Box<Code>,
        index: Box<Code>,
    },
    Call {
        callee: Box<Code>,
        args: Vec<Code>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Code>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Code>,
        rhs: Box<Code>,
    },
    Conditional {
        test: Box<Code>,
        consequent: Box<Code>,
        alternate: Box<Code>,
    },
    /// Evaluate `value` once into `temp`; call it with `(data, options)`
    /// when it is a function.
    Dethunk { temp: Temp, value: Box<Code> },
    /// Join the body's output for every `(key, value)` of `container`.
    ///
    /// The body sees `key` in local `slot` and `value` in `slot + 1`.
    Each {
        buffer: Temp,
        slot: usize,
        key: SmolStr,
        value: SmolStr,
        container: Box<Code>,
        body: Box<Code>,
    },
    /// Resolve `selector` through the registry and apply the template.
    ///
    /// `name` is used as the selector when a bare-name selector evaluates
    /// to `undefined` or `null`.
    Invoke {
        data: Box<Code>,
        options: Box<Code>,
        selector: Box<Code>,
        name: Option<SmolStr>,
    },
    /// `merge_all({}, sources)`.
    Merge(Vec<Code>),
}

impl Code {
    /// An empty string.
    pub fn empty() -> Self {
        Code::Text(String::new())
    }

    /// `lhs + rhs`.
    pub fn concat(lhs: Code, rhs: Code) -> Self {
        Code::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Visit this node and every node below it, parents first.
    pub fn walk<'c>(&'c self, visit: &mut dyn FnMut(&'c Code)) {
        visit(self);
        match self {
            Code::Text(_)
            | Code::Literal(_)
            | Code::Local(_)
            | Code::Ambient(_)
            | Code::Data
            | Code::Options => {}
            Code::Array(items) | Code::Merge(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            Code::Object(entries) => {
                for (_, value) in entries {
                    value.walk(visit);
                }
            }
            Code::Member { object, .. } => object.walk(visit),
            Code::Index { object, index } => {
                object.walk(visit);
                index.walk(visit);
            }
            Code::Call { callee, args } => {
                callee.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            Code::Unary { operand, .. } => operand.walk(visit),
            Code::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Code::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.walk(visit);
                consequent.walk(visit);
                alternate.walk(visit);
            }
            Code::Dethunk { value, .. } => value.walk(visit),
            Code::Each {
                container, body, ..
            } => {
                container.walk(visit);
                body.walk(visit);
            }
            Code::Invoke {
                data,
                options,
                selector,
                ..
            } => {
                data.walk(visit);
                options.walk(visit);
                selector.walk(visit);
            }
        }
    }

    /// Every temporary the code uses, ordered by depth.
    pub fn temps(&self) -> Vec<Temp> {
        let mut temps = Vec::new();
        self.walk(&mut |code| match code {
            Code::Dethunk { temp, .. } => temps.push(*temp),
            Code::Each { buffer, .. } => temps.push(*buffer),
            _ => {}
        });
        temps.sort_by_key(|temp| (temp.depth, temp.kind as u8));
        temps.dedup();
        temps
    }

    /// A short description of a callee, for error messages.
    pub fn describe(&self) -> String {
        match self {
            Code::Ambient(name) => name.to_string(),
            Code::Data => "$data".to_string(),
            Code::Options => "$options".to_string(),
            Code::Local(slot) => format!("local {}", slot),
            Code::Member { object, property } => format!("{}.{}", object.describe(), property),
            Code::Index { object, .. } => format!("{}[...]", object.describe()),
            Code::Call { callee, .. } => format!("{}(...)", callee.describe()),
            Code::Literal(value) => value.to_js_string(),
            _ => "expression".to_string(),
        }
    }
}
