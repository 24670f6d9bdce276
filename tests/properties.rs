//! Model-based property tests for the layered store
//!
//! The model keeps a full copy of the visible key space per open transaction,
//! which is exactly what the layered store avoids doing.

use nestkv::{CommitPolicy, LayeredStore, NestKvError, Store};
use proptest::prelude::*;
use std::collections::HashMap;

const KEYS: &[&str] = &["a", "b", "c", "d"];
const VALUES: &[&str] = &["foo", "bar", "baz", ""];

#[derive(Debug, Clone)]
enum Op {
    Set(usize, usize),
    Delete(usize),
    Begin,
    Rollback,
    Commit,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..KEYS.len(), 0..VALUES.len()).prop_map(|(k, v)| Op::Set(k, v)),
        2 => (0..KEYS.len()).prop_map(Op::Delete),
        1 => Just(Op::Begin),
        1 => Just(Op::Rollback),
        1 => Just(Op::Commit),
    ]
}

/// Stack of full snapshots; the last one is what the active transaction sees
struct Model {
    snapshots: Vec<HashMap<String, String>>,
}

impl Model {
    fn new() -> Self {
        Self {
            snapshots: vec![HashMap::new()],
        }
    }

    fn visible(&mut self) -> &mut HashMap<String, String> {
        let top = self.snapshots.len() - 1;
        &mut self.snapshots[top]
    }

    fn get(&self, key: &str) -> Option<&String> {
        self.snapshots
            .last()
            .and_then(|s| s.get(key))
            .filter(|v| !v.is_empty())
    }

    fn count(&self, value: &str) -> i64 {
        self.snapshots
            .last()
            .map(|s| s.values().filter(|v| v.as_str() == value).count() as i64)
            .unwrap_or(0)
    }
}

/// Apply `op` to both sides. Commits under `CollapseToRoot` are only issued
/// at depth 1; deeper ones are skipped.
fn apply(store: &mut LayeredStore, model: &mut Model, op: &Op) {
    match op {
        Op::Set(k, v) => {
            store.set(KEYS[*k].to_string(), VALUES[*v].to_string()).unwrap();
            model.visible().insert(KEYS[*k].to_string(), VALUES[*v].to_string());
        }
        Op::Delete(k) => {
            let key = KEYS[*k];
            let resolvable = store.get(key).is_ok();
            let result = store.delete(key);
            assert_eq!(result.is_ok(), resolvable);
            if result.is_ok() {
                model.visible().insert(key.to_string(), String::new());
            }
        }
        Op::Begin => {
            store.begin().unwrap();
            let top = model.visible().clone();
            model.snapshots.push(top);
        }
        Op::Rollback => {
            let result = store.rollback();
            if model.snapshots.len() > 1 {
                result.unwrap();
                model.snapshots.pop();
            } else {
                assert!(matches!(result, Err(NestKvError::NoActiveTransaction)));
            }
        }
        Op::Commit => {
            if store.policy() == CommitPolicy::CollapseToRoot && store.depth() > 1 {
                return;
            }
            let result = store.commit();
            if model.snapshots.len() > 1 {
                result.unwrap();
                if let Some(top) = model.snapshots.pop() {
                    *model.visible() = top;
                }
            } else {
                assert!(matches!(result, Err(NestKvError::NoActiveTransaction)));
            }
        }
    }
}

fn assert_matches_model(store: &LayeredStore, model: &Model) {
    assert_eq!(store.depth(), model.snapshots.len() - 1);
    for key in KEYS {
        let got = store.get(key).ok().filter(|v| !v.is_empty());
        assert_eq!(got.as_ref(), model.get(key), "key {}", key);
    }
    for value in VALUES.iter().filter(|v| !v.is_empty()) {
        assert_eq!(store.count(value), model.count(value), "value {}", value);
    }
    assert_eq!(store.count(""), 0);
}

proptest! {
    #[test]
    fn cascade_matches_snapshot_model(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut store = LayeredStore::with_policy(CommitPolicy::Cascade);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut store, &mut model, op);
            assert_matches_model(&store, &model);
        }
    }

    #[test]
    fn collapse_matches_snapshot_model_at_depth_one(
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let mut store = LayeredStore::with_policy(CommitPolicy::CollapseToRoot);
        let mut model = Model::new();
        for op in &ops {
            apply(&mut store, &mut model, op);
            assert_matches_model(&store, &model);
        }
    }

    #[test]
    fn rollback_restores_previous_state(
        setup in prop::collection::vec(op_strategy(), 0..30),
        inner in prop::collection::vec(op_strategy(), 0..30),
    ) {
        let mut store = LayeredStore::with_policy(CommitPolicy::Cascade);
        let mut model = Model::new();
        for op in &setup {
            apply(&mut store, &mut model, op);
        }
        let depth = store.depth();
        let before: Vec<_> = KEYS.iter().map(|k| store.get(k).ok()).collect();
        let counts: Vec<_> = VALUES.iter().map(|v| store.count(v)).collect();

        store.begin().unwrap();
        for op in &inner {
            // Keep the inner ops from closing the transaction under test
            if matches!(op, Op::Rollback | Op::Commit) && store.depth() == depth + 1 {
                continue;
            }
            match op {
                Op::Set(k, v) => store.set(KEYS[*k].to_string(), VALUES[*v].to_string()).unwrap(),
                Op::Delete(k) => { let _ = store.delete(KEYS[*k]); }
                Op::Begin => store.begin().unwrap(),
                Op::Rollback => store.rollback().unwrap(),
                Op::Commit => store.commit().unwrap(),
            }
        }
        while store.depth() > depth {
            store.rollback().unwrap();
        }

        let after: Vec<_> = KEYS.iter().map(|k| store.get(k).ok()).collect();
        let counts_after: Vec<_> = VALUES.iter().map(|v| store.count(v)).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(counts, counts_after);
    }
}
