//! AST types for directive expressions.

use smol_str::SmolStr;

/// A literal value written in the expression source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(SmolStr),
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// A literal (`1`, `'a'`, `true`, `null`, `undefined`).
    Literal(Literal),
    /// A bare identifier.
    Ident(SmolStr),
    /// An array literal (`[a, b]`).
    Array(Vec<Expr>),
    /// An object literal (`{ a: 1, "b": 2 }`).
    Object(Vec<(SmolStr, Expr)>),
    /// Property access (`a.b`).
    Member { object: Box<Expr>, property: SmolStr },
    /// Computed access (`a[b]`).
    Index { object: Box<Expr>, index: Box<Expr> },
    /// A call (`f(a, b)`).
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// A prefix operator.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// An infix operator, including the short-circuit logical ones.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `test ? consequent : alternate`.
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-",
            Self::Plus => "+",
        }
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    And,
    Or,
}

impl BinaryOp {
    /// Get the operator as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::NotEq | Self::StrictEq | Self::StrictNotEq => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }

    /// Check if the operator short-circuits.
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}
