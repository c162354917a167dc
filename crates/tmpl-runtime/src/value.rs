//! Dynamic values seen by template expressions.
//!
//! Coercions follow JavaScript, since templates are written against
//! those rules: `+` concatenates as soon as one operand is a string,
//! `undefined` prints as `"undefined"`, `0`, `""`, `NaN`, `null` and
//! `undefined` are falsy, and so on.

use crate::error::{RenderError, RenderResult};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Property map of an object value, in insertion order.
pub type Map = IndexMap<SmolStr, Value>;

type NativeFn = dyn Fn(&[Value]) -> RenderResult<Value> + Send + Sync;

/// A callable value.
#[derive(Clone)]
pub struct Function {
    name: SmolStr,
    call: Arc<NativeFn>,
}

impl Function {
    /// Wrap a native closure.
    pub fn new<F>(name: impl Into<SmolStr>, f: F) -> Self
    where
        F: Fn(&[Value]) -> RenderResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(f),
        }
    }

    /// Get the function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function. Callers may pass more arguments than it reads.
    pub fn call(&self, args: &[Value]) -> RenderResult<Value> {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

/// A template value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absent sentinel.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(SmolStr),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
    Function(Function),
}

impl Value {
    /// Create an array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    /// Create an object value.
    pub fn object(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }

    /// Create an object value from key/value pairs.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<SmolStr>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Create an empty object value.
    pub fn empty_object() -> Self {
        Value::object(Map::new())
    }

    /// Create a function value.
    pub fn function<F>(name: impl Into<SmolStr>, f: F) -> Self
    where
        F: Fn(&[Value]) -> RenderResult<Value> + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, f))
    }

    /// Check for `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if the value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Get the object map, if this is an object.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Get the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The `typeof` name of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// JavaScript `ToNumber`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => {
                parse_number(&self.to_js_string())
            }
        }
    }

    /// JavaScript `ToString`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
        }
    }

    /// Primitive form used by `+` and comparisons.
    fn to_primitive(&self) -> Value {
        match self {
            Value::Array(_) | Value::Object(_) | Value::Function(_) => {
                Value::String(self.to_js_string().into())
            }
            other => other.clone(),
        }
    }

    /// Read a named property.
    pub fn get(&self, property: &str) -> RenderResult<Value> {
        match self {
            Value::Undefined | Value::Null => Err(RenderError::PropertyOfNothing {
                target: if matches!(self, Value::Null) {
                    "null"
                } else {
                    "undefined"
                },
                property: property.into(),
            }),
            Value::Object(map) => Ok(map.get(property).cloned().unwrap_or_default()),
            Value::Array(items) => Ok(match property {
                "length" => Value::Number(items.len() as f64),
                _ => array_index(property)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            }),
            Value::String(s) => Ok(match property {
                "length" => Value::Number(s.encode_utf16().count() as f64),
                _ => array_index(property)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string().into()))
                    .unwrap_or_default(),
            }),
            Value::Function(f) if property == "name" => Ok(Value::String(f.name.clone())),
            Value::Bool(_) | Value::Number(_) | Value::Function(_) => Ok(Value::Undefined),
        }
    }

    /// Read a computed property (`value[key]`).
    pub fn get_index(&self, key: &Value) -> RenderResult<Value> {
        self.get(&key.to_property_key())
    }

    fn to_property_key(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_js_string(),
        }
    }

    /// JavaScript `+`.
    pub fn add(&self, other: &Value) -> Value {
        let lhs = self.to_primitive();
        let rhs = other.to_primitive();
        if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
            let mut out = lhs.to_js_string();
            out.push_str(&rhs.to_js_string());
            Value::String(out.into())
        } else {
            Value::Number(lhs.to_number() + rhs.to_number())
        }
    }

    /// JavaScript `===`.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }

    /// JavaScript `==`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a.strict_eq(b),
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(n), Value::String(_)) | (Value::String(_), Value::Number(n)) => {
                let other_side = if matches!(self, Value::Number(_)) {
                    other
                } else {
                    self
                };
                *n == other_side.to_number()
            }
            (Value::Bool(b), other_side) | (other_side, Value::Bool(b)) => {
                Value::Number(f64::from(u8::from(*b))).loose_eq(other_side)
            }
            (a, b) => {
                let a_prim = a.to_primitive();
                let b_prim = b.to_primitive();
                let changed = !a_prim.strict_eq(a) || !b_prim.strict_eq(b);
                changed && a_prim.loose_eq(&b_prim)
            }
        }
    }

    /// JavaScript relational comparison; `None` when either side is `NaN`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let lhs = self.to_primitive();
        let rhs = other.to_primitive();
        match (&lhs, &rhs) {
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => lhs.to_number().partial_cmp(&rhs.to_number()),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality, used by tests and collaborators; not `===`.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

/// Format a number the way JavaScript prints it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // covers -0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // `1e21` prints as `1e+21`, `1.5e-7` as is
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        n.to_string()
    }
}

/// JavaScript string-to-number conversion.
fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    match s {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Parse a canonical array index (`"0"`, `"12"`, not `"01"`).
fn array_index(property: &str) -> Option<usize> {
    if property.len() > 1 && property.starts_with('0') {
        return None;
    }
    property.parse().ok()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<SmolStr> for Value {
    fn from(s: SmolStr) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::object(map)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => Value::object(
                map.into_iter()
                    .map(|(k, v)| (SmolStr::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}
