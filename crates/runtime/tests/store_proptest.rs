//! Property-based tests for the store using proptest.

use pulse_core::{json, Key, Value};
use pulse_runtime::{CollectionConfig, Store, StoreBuilder};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Collect(i64, &'static str),
    Move(i64),
    Update(i64, i64),
    Delete(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..8, prop::sample::select(vec!["open", "done"])).prop_map(|(id, index)| Op::Collect(id, index)),
        (0i64..8).prop_map(Op::Move),
        (0i64..8, 0i64..100).prop_map(|(id, score)| Op::Update(id, score)),
        (0i64..8).prop_map(Op::Delete),
    ]
}

fn store() -> Store {
    StoreBuilder::new()
        .collection(
            CollectionConfig::new("tasks")
                .index("open")
                .index("done")
                .filter("openScore", |ctx| {
                    let open = ctx.local("open").and_then(Value::as_array).cloned().unwrap_or_default();
                    json!(open.iter().filter_map(|t| t["score"].as_i64()).sum::<i64>())
                }),
        )
        .build()
        .unwrap()
}

fn apply(store: &mut Store, op: &Op) {
    // Failures on missing keys are expected and reported to the error sink
    let _ = match op {
        Op::Collect(id, index) => store
            .collect("tasks", [json!({"id": id, "score": 1})], Some(index))
            .map(drop),
        Op::Move(id) => store.move_keys("tasks", [*id], "open", "done"),
        Op::Update(id, score) => store.update("tasks", *id, json!({"score": score})),
        Op::Delete(id) => store.delete("tasks", [*id]).map(drop),
    };
}

proptest! {
    /// Every group slot equals a fresh materialization of its index.
    #[test]
    fn groups_match_their_index(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = store();
        for op in &ops {
            apply(&mut store, op);
        }
        for index in ["open", "done"] {
            let fresh = Value::Array(store.get_group("tasks", index));
            prop_assert_eq!(store.get("tasks", index), Some(&fresh));
        }
    }

    /// The filter output always reflects the settled state.
    #[test]
    fn filter_output_is_current(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = store();
        for op in &ops {
            apply(&mut store, op);
            prop_assert!(store.queue().is_empty());
        }
        let expected: i64 = store
            .get_group("tasks", "open")
            .iter()
            .filter_map(|t| t["score"].as_i64())
            .sum();
        prop_assert_eq!(store.get("tasks", "openScore"), Some(&json!(expected)));
    }

    /// Index key lists never hold duplicates or deleted keys.
    #[test]
    fn index_keys_are_unique_and_live(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = store();
        for op in &ops {
            apply(&mut store, op);
        }
        for index in ["open", "done"] {
            let keys: Vec<Key> = store.index_keys("tasks", index).unwrap_or_default().to_vec();
            let mut unique = keys.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), keys.len());
            for key in &keys {
                prop_assert!(store.find_by_id("tasks", key).is_some());
            }
        }
    }
}
