//! Layered descriptor merging.
//!
//! Follows compose override semantics, applied recursively and left to right:
//! - mapping + mapping: merged key by key
//! - sequence + sequence: concatenated, earlier elements first
//! - null on one side: the other side, unchanged
//! - anything else: the later value
//!
//! Sequences are never deduplicated, so a port declared in two layers is
//! bound twice.

use serde_yaml::Value;

/// Merge raw documents in order; later documents win conflicts.
///
/// Returns `Value::Null` for an empty input.
pub fn merge_documents(mut documents: Vec<Value>) -> Value {
    if documents.len() == 1 {
        return documents.remove(0);
    }

    documents
        .into_iter()
        .reduce(merge_values)
        .unwrap_or(Value::Null)
}

/// Merge two values; `overlay` wins scalar conflicts.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Null, overlay) => overlay,
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            // Merged in place so the base keeps its declaration order.
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => {
                        let current = std::mem::take(existing);
                        *existing = merge_values(current, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Mapping(base)
        }
        (Value::Sequence(mut base), Value::Sequence(overlay)) => {
            base.extend(overlay);
            Value::Sequence(base)
        }
        (_, overlay) => overlay,
    }
}
