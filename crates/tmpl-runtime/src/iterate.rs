//! Generic iteration over array-like and mapping-like values.

use crate::error::RenderResult;
use crate::value::Value;

/// Callback receiving `(key, value)` for each element.
pub type Visit<'a> = dyn FnMut(Value, Value) -> RenderResult<()> + 'a;

/// Traverses a container in its natural order.
pub trait Iterate: Send + Sync {
    /// Call `visit` once per element. An error from `visit` stops the walk
    /// and is returned unchanged.
    fn iterate(&self, container: &Value, visit: &mut Visit<'_>) -> RenderResult<()>;
}

/// Arrays yield `(index, item)`, objects yield `(key, value)` in insertion
/// order, every other value yields nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericIterator;

impl Iterate for GenericIterator {
    fn iterate(&self, container: &Value, visit: &mut Visit<'_>) -> RenderResult<()> {
        match container {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    visit(Value::from(index), item.clone())?;
                }
            }
            Value::Object(map) => {
                for (key, value) in map.iter() {
                    visit(Value::String(key.clone()), value.clone())?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
