//! Interpreter for compiled code.

use crate::ir::{Code, Program};
use std::cmp::Ordering;
use std::sync::Arc;
use tmpl_expr::{BinaryOp, UnaryOp};
use tmpl_runtime::{Collaborators, Map, RenderError, RenderResult, Value};

/// Evaluation state for one `apply` call.
///
/// Locals mirror the compile-time slot layout; value and buffer
/// temporaries are indexed by nesting depth.
pub(crate) struct Frame<'a> {
    data: &'a Value,
    options: &'a Value,
    collaborators: &'a Collaborators,
    locals: Vec<Value>,
    values: Vec<Value>,
    buffers: Vec<Vec<String>>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        program: &Program,
        data: &'a Value,
        options: &'a Value,
        collaborators: &'a Collaborators,
    ) -> Self {
        let depths = program.max_depth + 1;
        Self {
            data,
            options,
            collaborators,
            locals: Vec::new(),
            values: vec![Value::Undefined; depths],
            buffers: vec![Vec::new(); depths],
        }
    }

    pub(crate) fn eval(&mut self, code: &Code) -> RenderResult<Value> {
        match code {
            Code::Text(text) => Ok(Value::String(text.as_str().into())),
            Code::Literal(value) => Ok(value.clone()),
            Code::Local(slot) => Ok(self.locals.get(*slot).cloned().unwrap_or_default()),
            Code::Ambient(name) => Ok(self.lookup(name)),
            Code::Data => Ok(self.data.clone()),
            Code::Options => Ok(self.options.clone()),
            Code::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<RenderResult<Vec<_>>>()?;
                Ok(Value::from(items))
            }
            Code::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }
            Code::Member { object, property } => self.eval(object)?.get(property),
            Code::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                object.get_index(&index)
            }
            Code::Call { callee, args } => {
                let function = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<RenderResult<Vec<_>>>()?;
                match function {
                    Value::Function(function) => function.call(&args),
                    _ => Err(RenderError::not_callable(callee.describe())),
                }
            }
            Code::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                    UnaryOp::Neg => Value::Number(-operand.to_number()),
                    UnaryOp::Plus => Value::Number(operand.to_number()),
                })
            }
            Code::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match op {
                    BinaryOp::And if !lhs.is_truthy() => Ok(lhs),
                    BinaryOp::Or if lhs.is_truthy() => Ok(lhs),
                    BinaryOp::And | BinaryOp::Or => self.eval(rhs),
                    op => {
                        let rhs = self.eval(rhs)?;
                        Ok(binary(*op, &lhs, &rhs))
                    }
                }
            }
            Code::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Code::Dethunk { temp, value } => {
                let value = self.eval(value)?;
                *self.value_temp(temp.depth) = value;
                match std::mem::take(self.value_temp(temp.depth)) {
                    Value::Function(function) => {
                        function.call(&[self.data.clone(), self.options.clone()])
                    }
                    value => Ok(value),
                }
            }
            Code::Each {
                buffer,
                slot,
                container,
                body,
                ..
            } => {
                let container = self.eval(container)?;
                let mut acc = std::mem::take(self.buffer_temp(buffer.depth));
                acc.clear();

                let iterator = Arc::clone(&self.collaborators.iterator);
                iterator.iterate(&container, &mut |key: Value, value: Value| {
                    self.locals.truncate(*slot);
                    self.locals.push(key);
                    self.locals.push(value);
                    match self.eval(body)? {
                        Value::String(piece) => acc.push(piece.to_string()),
                        other => acc.push(other.to_js_string()),
                    }
                    Ok(())
                })?;
                self.locals.truncate(*slot);

                let joined = acc.concat();
                acc.clear();
                *self.buffer_temp(buffer.depth) = acc;
                Ok(Value::String(joined.into()))
            }
            Code::Invoke {
                data,
                options,
                selector,
                name,
            } => {
                let data = self.eval(data)?;
                let options = self.eval(options)?;
                let selector = match (self.eval(selector)?, name) {
                    (value, Some(name)) if value.is_nullish() => Value::String(name.clone()),
                    (value, _) => value,
                };

                let template = self.collaborators.registry.resolve(&selector)?;
                tracing::trace!(selector = %selector, "invoking sub-template");
                template.apply(&data, &options).map(Value::from)
            }
            Code::Merge(sources) => {
                let sources = sources
                    .iter()
                    .map(|source| self.eval(source))
                    .collect::<RenderResult<Vec<_>>>()?;
                Ok(Value::object(
                    self.collaborators.merge.merge_all(Map::new(), &sources),
                ))
            }
        }
    }

    /// Resolve a bare name against data, then options.
    fn lookup(&self, name: &str) -> Value {
        [self.data, self.options]
            .into_iter()
            .filter_map(Value::as_object)
            .find_map(|map| map.get(name).cloned())
            .unwrap_or_default()
    }

    fn value_temp(&mut self, depth: usize) -> &mut Value {
        if self.values.len() <= depth {
            self.values.resize(depth + 1, Value::Undefined);
        }
        &mut self.values[depth]
    }

    fn buffer_temp(&mut self, depth: usize) -> &mut Vec<String> {
        if self.buffers.len() <= depth {
            self.buffers.resize_with(depth + 1, Vec::new);
        }
        &mut self.buffers[depth]
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    let ordering = || lhs.compare(rhs);
    match op {
        BinaryOp::Add => lhs.add(rhs),
        BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Lt => Value::Bool(ordering() == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(ordering(), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(ordering() == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            ordering(),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(lhs.loose_eq(rhs)),
        BinaryOp::NotEq => Value::Bool(!lhs.loose_eq(rhs)),
        BinaryOp::StrictEq => Value::Bool(lhs.strict_eq(rhs)),
        BinaryOp::StrictNotEq => Value::Bool(!lhs.strict_eq(rhs)),
        BinaryOp::And => {
            if lhs.is_truthy() {
                rhs.clone()
            } else {
                lhs.clone()
            }
        }
        BinaryOp::Or => {
            if lhs.is_truthy() {
                lhs.clone()
            } else {
                rhs.clone()
            }
        }
    }
}
