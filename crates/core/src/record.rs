//! Records stored in a collection.

use serde_json::{Map, Value};

/// An arbitrary field → value mapping belonging to one collection.
pub type Record = Map<String, Value>;

/// Reads a field of a JSON value that is expected to be a record.
///
/// Returns `None` when the value is not an object or lacks the field.
pub fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.as_object().and_then(|record| record.get(name))
}
