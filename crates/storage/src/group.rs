//! Group materialization.
//!
//! A group is the resolved view of an index: every key is mapped to its
//! record, and every relation whose source field is present attaches the
//! foreign record it points to.

use pulse_core::{Key, Value};

use crate::record_store::RecordStore;
use crate::relation::{ForeignLookup, Relation};

/// Builds the resolved array for an index's key list.
///
/// Keys without a record are skipped, as are relations whose foreign record
/// does not exist. The output depends only on the inputs, so rebuilding with
/// unchanged inputs yields identical output.
pub fn materialize(
    keys: &[Key],
    store: &RecordStore,
    relations: &[Relation],
    lookup: &dyn ForeignLookup,
) -> Vec<Value> {
    keys.iter()
        .filter_map(|key| store.get(key))
        .map(|record| {
            let mut resolved = record.clone();
            for relation in relations {
                if let Some(foreign) = relation.resolve(record, lookup) {
                    resolved.insert(
                        relation.output_field().into(),
                        Value::Object(foreign.clone()),
                    );
                }
            }
            Value::Object(resolved)
        })
        .collect()
}
