//! Integration tests for the store: collecting, mutating and regenerating.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use pulse_core::{json, ErrorKind, Key, NodeKey, Value};
use pulse_reactive::PropertyKind;
use pulse_runtime::{
    CollectionConfig, EngineOptions, Request, RequestClient, Response, ResponseFuture, StoreBuilder,
};
use pulse_reactive::EdgePolicy;
use pulse_storage::{Mutation, MutationType};

fn int(value: Option<&Value>) -> i64 {
    value.and_then(Value::as_i64).unwrap_or(0)
}

fn names(group: Option<&Value>) -> Vec<String> {
    group
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_collect_into_index_materializes_group() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("todos").index("list"))
        .build()
        .unwrap();

    store
        .collect("todos", [json!({"id": 1, "name": "a"})], Some("list"))
        .unwrap();

    let group = store.get_group("todos", "list");
    assert_eq!(group.len(), 1);
    assert_eq!(group[0]["id"], json!(1));
    assert_eq!(store.get("todos", "list"), Some(&json!([{"id": 1, "name": "a"}])));
    assert_eq!(store.index_keys("todos", "list"), Some(&[Key::Int(1)][..]));
}

#[test]
fn test_collect_without_primary_key_is_rejected() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("todos"))
        .build()
        .unwrap();

    let stored = store.collect("todos", [json!({"name": "x"})], None).unwrap();

    assert_eq!(stored, 0);
    assert_eq!(store.collection_size("todos"), 0);
    assert_eq!(store.errors().count(ErrorKind::DataRejection), 1);
    assert_eq!(store.errors().rejections()[0].record, json!({"name": "x"}));
}

#[test]
fn test_collect_discovers_underscore_id() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("docs"))
        .build()
        .unwrap();

    store
        .collect("docs", [json!({"_id": "abc", "title": "t"})], None)
        .unwrap();
    assert_eq!(store.primary_key("docs"), Some("_id"));
    assert!(store.find_by_id("docs", "abc").is_some());

    // Once discovered the key is fixed; a record using `id` instead is rejected
    store.collect("docs", [json!({"id": 4})], None).unwrap();
    assert_eq!(store.collection_size("docs"), 1);
    assert_eq!(store.errors().count(ErrorKind::DataRejection), 1);
}

#[test]
fn test_update_records_previous_values() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("users").records([json!({"id": 1, "name": "a"})]))
        .build()
        .unwrap();
    let before = store.history().len();

    store.update("users", 1, json!({"name": "b"})).unwrap();

    assert_eq!(store.find_by_id("users", 1).unwrap()["name"], json!("b"));
    let updates: Vec<_> = store.history().of_type(MutationType::Update).collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(store.history().len(), before + 1);
    match &updates[0].mutation {
        Mutation::Update {
            previous_values, ..
        } => assert_eq!(previous_values.get("name"), Some(&Some(json!("a")))),
        other => panic!("unexpected mutation {:?}", other),
    }
}

#[test]
fn test_update_unknown_field_warns_but_applies() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("users").records([json!({"id": 1})]))
        .build()
        .unwrap();

    store.update("users", 1, json!({"age": 3})).unwrap();

    assert_eq!(store.find_by_id("users", 1).unwrap()["age"], json!(3));
    assert_eq!(store.errors().count(ErrorKind::ValidationWarning), 1);
}

#[test]
fn test_update_refuses_primary_key_change() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("users").records([json!({"id": 1, "name": "a"})]))
        .build()
        .unwrap();

    store
        .update("users", 1, json!({"id": 2, "name": "b"}))
        .unwrap();

    let record = store.find_by_id("users", 1).unwrap();
    assert_eq!(record["id"], json!(1));
    assert_eq!(record["name"], json!("b"));
    assert!(store.find_by_id("users", 2).is_none());
}

#[test]
fn test_update_missing_record_errors() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("users"))
        .build()
        .unwrap();

    let result = store.update("users", 9, json!({"name": "b"}));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ReferenceError);
    assert!(store.history().is_empty());
}

#[test]
fn test_move_between_indexes() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("A")
                .index("B")
                .records_into("A", [json!({"id": 1, "name": "one"}), json!({"id": 2, "name": "two"})]),
        )
        .build()
        .unwrap();

    store.move_keys("todos", [1], "A", "B").unwrap();

    assert_eq!(store.index_keys("todos", "A"), Some(&[Key::Int(2)][..]));
    assert_eq!(store.index_keys("todos", "B"), Some(&[Key::Int(1)][..]));
    assert_eq!(names(store.get("todos", "B")), vec!["one"]);
    assert_eq!(names(store.get("todos", "A")), vec!["two"]);
}

#[test]
fn test_move_to_undeclared_index_changes_nothing() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("A")
                .records_into("A", [json!({"id": 1})]),
        )
        .build()
        .unwrap();
    let before = store.history().len();

    let result = store.move_keys("todos", [1], "A", "missing");

    assert_eq!(result.unwrap_err().kind(), ErrorKind::ReferenceError);
    assert_eq!(store.index_keys("todos", "A"), Some(&[Key::Int(1)][..]));
    assert_eq!(store.history().len(), before);
}

#[test]
fn test_move_stops_at_missing_record() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("A")
                .index("B")
                .records_into("A", [json!({"id": 1}), json!({"id": 2})]),
        )
        .build()
        .unwrap();

    let result = store.move_keys("todos", [1, 99, 2], "A", "B");

    assert!(result.is_err());
    assert_eq!(store.index_keys("todos", "A"), Some(&[Key::Int(2)][..]));
    assert_eq!(store.index_keys("todos", "B"), Some(&[Key::Int(1)][..]));
    assert_eq!(store.history().of_type(MutationType::Move).count(), 1);
}

#[test]
fn test_put_appends_without_duplicates() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("all")
                .index("starred")
                .records_into("all", [json!({"id": 1}), json!({"id": 2})]),
        )
        .build()
        .unwrap();

    store.put("todos", [2, 1, 2], "starred").unwrap();

    assert_eq!(
        store.index_keys("todos", "starred"),
        Some(&[Key::Int(2), Key::Int(1)][..])
    );
    // Source index untouched
    assert_eq!(store.index_keys("todos", "all").map(<[Key]>::len), Some(2));
}

#[test]
fn test_delete_removes_from_every_index() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("a")
                .index("b")
                .records_into("a", [json!({"id": 1, "name": "x"})]),
        )
        .build()
        .unwrap();
    store.put("todos", [1], "b").unwrap();

    let deleted = store.delete("todos", [1, 5]).unwrap();

    assert_eq!(deleted, 1);
    assert!(store.find_by_id("todos", 1).is_none());
    assert_eq!(store.get("todos", "a"), Some(&json!([])));
    assert_eq!(store.get("todos", "b"), Some(&json!([])));
    assert_eq!(store.errors().count(ErrorKind::ReferenceError), 1);
    match &store.history().last().unwrap().mutation {
        Mutation::Delete { deleted, .. } => assert_eq!(deleted["name"], json!("x")),
        other => panic!("unexpected mutation {:?}", other),
    }
}

#[test]
fn test_new_group_and_conflict() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .data("filterText", json!(""))
                .records([json!({"id": 1, "name": "x"}), json!({"id": 2, "name": "y"})]),
        )
        .build()
        .unwrap();

    store.new_group("todos", "picked", [2]).unwrap();
    assert_eq!(names(Some(&Value::Array(store.get_group("todos", "picked")))), vec!["y"]);

    assert!(store.new_group("todos", "picked", [1]).is_err());
    assert!(store.new_group("todos", "filterText", [1]).is_err());
    assert_eq!(store.errors().count(ErrorKind::NamespaceConflict), 2);
}

#[test]
fn test_increment_and_decrement() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("posts").records([json!({"id": 1, "likes": 2, "label": "x"})]))
        .build()
        .unwrap();

    store.increment("posts", 1, "likes", 3).unwrap();
    store.decrement("posts", 1, "likes", 0.5).unwrap();

    assert_eq!(store.find_by_id("posts", 1).unwrap()["likes"], json!(4.5));
    let result = store.increment("posts", 1, "label", 1);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::ReferenceError);

    match &store.history().of_type(MutationType::Increment).next().unwrap().mutation {
        Mutation::Increment { previous_value, .. } => assert_eq!(previous_value, &json!(2)),
        other => panic!("unexpected mutation {:?}", other),
    };
}

#[test]
fn test_filter_tracks_group_across_collections() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("todos").index("open"))
        .collection(CollectionConfig::new("stats").filter("openNames", |ctx| {
            let open = ctx.get("todos", "open").cloned().unwrap_or_default();
            json!(names(Some(&open)))
        }))
        .build()
        .unwrap();
    assert_eq!(store.get("stats", "openNames"), Some(&json!([])));

    store
        .collect("todos", [json!({"id": 1, "name": "a"})], Some("open"))
        .unwrap();
    assert_eq!(store.get("stats", "openNames"), Some(&json!(["a"])));

    store.update("todos", 1, json!({"name": "b"})).unwrap();
    assert_eq!(store.get("stats", "openNames"), Some(&json!(["b"])));
}

#[test]
fn test_dependent_filters_never_see_stale_values() {
    let seen_by_a = Rc::new(RefCell::new(Vec::new()));
    let log = seen_by_a.clone();
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("c")
                .data("d", json!(1))
                .filter("a", move |ctx| {
                    let b = int(ctx.local("b"));
                    let d = int(ctx.local("d"));
                    log.borrow_mut().push((b, d));
                    json!(b + d)
                })
                .filter("b", |ctx| json!(int(ctx.local("d")) * 100)),
        )
        .build()
        .unwrap();
    assert_eq!(store.get("c", "a"), Some(&json!(101)));

    seen_by_a.borrow_mut().clear();
    store.set_data("c", "d", json!(2)).unwrap();

    assert_eq!(store.get("c", "b"), Some(&json!(200)));
    assert_eq!(store.get("c", "a"), Some(&json!(202)));
    // a only ever ran against b's post-mutation value
    assert!(seen_by_a.borrow().iter().all(|&(b, d)| b == d * 100));
}

#[test]
fn test_force_update_reruns_filter() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("c").filter("f", move |_| {
            counter.set(counter.get() + 1);
            json!(counter.get())
        }))
        .build()
        .unwrap();
    assert_eq!(runs.get(), 1);

    store.force_update("c", "f").unwrap();

    assert_eq!(runs.get(), 2);
    assert_eq!(store.get("c", "f"), Some(&json!(2)));
    assert!(store.force_update("c", "nope").is_err());
}

#[test]
fn test_filter_reached_twice_runs_once() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("A")
                .index("B")
                .records_into("A", [json!({"id": 1})])
                .filter("total", move |ctx| {
                    counter.set(counter.get() + 1);
                    let a = ctx.local("A").and_then(Value::as_array).map_or(0, Vec::len);
                    let b = ctx.local("B").and_then(Value::as_array).map_or(0, Vec::len);
                    json!(a + b)
                }),
        )
        .build()
        .unwrap();
    runs.set(0);

    // Both groups change; the filter is queued once
    store.move_keys("todos", [1], "A", "B").unwrap();

    assert_eq!(runs.get(), 1);
    assert_eq!(store.get("todos", "total"), Some(&json!(1)));
}

#[test]
fn test_relations_attach_parent_records() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("users").records([json!({"id": 7, "name": "ana"})]))
        .collection(
            CollectionConfig::new("posts")
                .parent("author", "users", Some("writer"))
                .index("feed"),
        )
        .build()
        .unwrap();

    store
        .collect(
            "posts",
            [json!([{"id": 1, "author": 7}, {"id": 2, "author": 8}])],
            Some("feed"),
        )
        .unwrap();

    let feed = store.get_group("posts", "feed");
    assert_eq!(feed[0]["writer"]["name"], json!("ana"));
    assert!(feed[1].get("writer").is_none());
    // Stored records are not modified
    assert!(store.find_by_id("posts", 1).unwrap().get("writer").is_none());
}

#[test]
fn test_group_change_notifies_both_slots() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("todos").index("all"))
        .build()
        .unwrap();

    let kinds = Rc::new(RefCell::new(Vec::new()));
    let sink = kinds.clone();
    store.subscribe("todos", "all", move |change| sink.borrow_mut().push(change.kind));

    store.collect("todos", [json!({"id": 1})], Some("all")).unwrap();

    assert_eq!(
        *kinds.borrow(),
        vec![PropertyKind::Group, PropertyKind::IndexKeys]
    );
}

#[test]
fn test_recompute_edges_drop_stale_reads() {
    let options = EngineOptions {
        edge_policy: EdgePolicy::Recompute,
        ..EngineOptions::default()
    };
    let mut store = StoreBuilder::new()
        .options(options)
        .collection(
            CollectionConfig::new("c")
                .data("useA", json!(true))
                .data("a", json!(1))
                .data("b", json!(2))
                .filter("pick", |ctx| {
                    if ctx.local("useA") == Some(&json!(true)) {
                        json!(int(ctx.local("a")))
                    } else {
                        json!(int(ctx.local("b")))
                    }
                }),
        )
        .build()
        .unwrap();

    store.set_data("c", "useA", json!(false)).unwrap();
    assert_eq!(store.get("c", "pick"), Some(&json!(2)));
    assert!(!store
        .dependents(&NodeKey::new("c", "a"))
        .contains(&NodeKey::new("c", "pick")));
}

#[test]
fn test_set_data_on_filter_is_refused() {
    let mut store = StoreBuilder::new()
        .collection(CollectionConfig::new("c").filter("f", |_| json!(1)))
        .build()
        .unwrap();

    assert!(store.set_data("c", "f", json!(2)).is_err());
    assert!(store.set_data("c", "nope", json!(2)).is_err());
    assert!(store.set_data("missing", "f", json!(2)).is_err());
    assert_eq!(store.get("c", "f"), Some(&json!(1)));
}

struct FakeApi;

impl RequestClient for FakeApi {
    fn send(&self, request: Request) -> ResponseFuture {
        Box::pin(async move {
            Ok(Response::new(
                200,
                json!([{"id": 1, "path": request.url}]),
            ))
        })
    }
}

#[test]
fn test_route_and_action_round_trip() {
    let mut store = StoreBuilder::new()
        .request_client(Rc::new(FakeApi))
        .collection(
            CollectionConfig::new("todos")
                .index("remote")
                .route("fetch", |client, param| {
                    let url = format!("/todos/{}", param.as_str().unwrap_or(""));
                    client.get(&url, None)
                })
                .action("load", |ctx, body| ctx.collect([body], Some("remote")).map(|n| json!(n))),
        )
        .build()
        .unwrap();

    let response = block_on(store.route("todos", "fetch", json!("open")).unwrap()).unwrap();
    assert_eq!(response.status, 200);

    let stored = store.dispatch("todos", "load", response.body).unwrap();
    assert_eq!(stored, json!(1));
    assert_eq!(store.get("todos", "remote"), Some(&json!([{"id": 1, "path": "/todos/open"}])));
    assert_eq!(
        store.history().last().and_then(|e| e.from_action.as_deref()),
        Some("load")
    );
}

fn group_names_store() -> pulse_runtime::Store {
    StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .records_into("list", [json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})])
                .filter("names", |ctx| {
                    json!(ctx
                        .get_group("todos", "list")
                        .iter()
                        .filter_map(|todo| todo["name"].as_str().map(String::from))
                        .collect::<Vec<_>>())
                }),
        )
        .build()
        .unwrap()
}

#[test]
fn test_group_reader_follows_delete() {
    let mut store = group_names_store();
    assert_eq!(store.get("todos", "names"), Some(&json!(["a", "b"])));

    store.delete("todos", [1]).unwrap();
    assert_eq!(store.index_keys("todos", "list"), Some(&[Key::Int(2)][..]));
    assert_eq!(store.get("todos", "names"), Some(&json!(["b"])));
}

#[test]
fn test_group_reader_follows_update() {
    let mut store = group_names_store();
    store.update("todos", 1, json!({"name": "z"})).unwrap();
    assert_eq!(store.get("todos", "names"), Some(&json!(["z", "b"])));
}

#[test]
fn test_group_reader_follows_recollect_into_other_index() {
    let mut store = group_names_store();
    store
        .collect("todos", [json!({"id": 1, "name": "q"})], Some("other"))
        .unwrap();
    assert_eq!(store.get("todos", "names"), Some(&json!(["q", "b"])));
}

#[test]
fn test_group_reader_follows_move_and_increment() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .index("done")
                .records_into("list", [json!({"id": 1, "n": 1}), json!({"id": 2, "n": 2})])
                .filter("total", |ctx| {
                    json!(ctx
                        .get_group("todos", "list")
                        .iter()
                        .filter_map(|todo| todo["n"].as_i64())
                        .sum::<i64>())
                }),
        )
        .build()
        .unwrap();
    assert_eq!(int(store.get("todos", "total")), 3);

    store.increment("todos", 2, "n", 10).unwrap();
    assert_eq!(int(store.get("todos", "total")), 13);

    store.move_keys("todos", [2], "list", "done").unwrap();
    assert_eq!(int(store.get("todos", "total")), 1);
}

#[test]
fn test_group_reader_sees_new_group() {
    let mut store = StoreBuilder::new()
        .collection(
            CollectionConfig::new("todos")
                .records([json!({"id": 1, "name": "a"})])
                .filter("picked_count", |ctx| json!(ctx.get_group("todos", "picked").len())),
        )
        .build()
        .unwrap();
    assert_eq!(int(store.get("todos", "picked_count")), 0);

    store.new_group("todos", "picked", [1]).unwrap();
    assert_eq!(int(store.get("todos", "picked_count")), 1);
}
