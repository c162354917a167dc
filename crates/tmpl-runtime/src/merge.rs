//! Object merging with absent-value preservation.

use crate::value::{Map, Value};

/// Copies every own key of each source onto the target.
pub trait Merge: Send + Sync {
    /// Later sources win. Keys whose value is [`Value::Undefined`] are
    /// copied like any other.
    fn merge_all(&self, target: Map, sources: &[Value]) -> Map;
}

/// Default [`Merge`]: object sources are copied, others are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeAll;

impl Merge for MergeAll {
    fn merge_all(&self, mut target: Map, sources: &[Value]) -> Map {
        for source in sources {
            if let Value::Object(map) = source {
                for (key, value) in map.iter() {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        target
    }
}
