//! Randomized and literal end-to-end scenarios for `HashTable`/`HashSet`
//! (spec §8's invariants and concrete S1-S6 scenarios). Uses `proptest` the
//! way the corpus's own map-style crates do (a `proptest!` block alongside a
//! handful of literal-input `#[test]`s), rather than an exhaustive
//! encode/decode grid.

use groupmap::HashTable;
use proptest::prelude::*;

#[test]
fn s1_empty_lookup() {
    let table: HashTable<i32, i32> = HashTable::new();
    assert!(table.find(&7).is_none());
    assert_eq!(table.len(), 0);
    assert!(table.capacity() == 0 || table.capacity() == 16);
}

#[test]
fn s2_insert_then_find() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    let (_, inserted) = table.insert(42, 100);
    assert!(inserted);
    assert_eq!(table.find(&42), Some(&100));
    assert_eq!(table.len(), 1);
}

#[test]
fn s3_duplicate_insert() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    table.insert(42, 100);
    let (_, inserted) = table.insert(42, 200);
    assert!(!inserted);
    assert_eq!(table.find(&42), Some(&100));

    let (_, inserted) = table.insert_or_assign(42, 200);
    assert!(!inserted);
    assert_eq!(table.find(&42), Some(&200));
}

#[test]
fn s4_erase_and_reinsert() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    table.insert(1, 1);
    table.insert(2, 2);
    table.insert(3, 3);

    assert!(table.erase(&2));
    assert!(table.find(&2).is_none());
    assert_eq!(table.len(), 2);

    let (_, inserted) = table.insert(2, 22);
    assert!(inserted);
    assert_eq!(table.find(&2), Some(&22));
}

#[test]
fn s5_rehash_preservation() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    for k in 0..1000 {
        table.insert(k, k);
    }
    for k in 0..1000 {
        assert_eq!(table.find(&k), Some(&k));
    }
    assert_eq!(table.len(), 1000);
    assert!(table.capacity() >= 1000);
}

#[test]
fn s6_churn_stability() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    for k in 0..10000 {
        table.insert(k, k);
    }
    for k in (0..10000).step_by(2) {
        table.erase(&k);
    }
    for k in (1..10000).step_by(2) {
        assert_eq!(table.find(&k), Some(&k));
    }
    assert_eq!(table.len(), 5000);

    for k in (0..10000).step_by(2) {
        table.insert(k, k * 2);
    }
    assert_eq!(table.len(), 10000);
    for k in 0..10000 {
        let expected = if k % 2 == 0 { k * 2 } else { k };
        assert_eq!(table.find(&k), Some(&expected));
    }
}

#[test]
fn iterator_completeness() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    for k in 0..500 {
        table.insert(k, k * 3);
    }
    let mut seen: Vec<i32> = table.iter().map(|(k, _)| *k).collect();
    assert_eq!(seen.len(), table.len());
    seen.sort_unstable();
    assert_eq!(seen, (0..500).collect::<Vec<_>>());
}

#[test]
fn load_factor_bound_holds_after_growth() {
    let mut table: HashTable<i32, i32> = HashTable::new();
    for k in 0..2000 {
        table.insert(k, k);
        assert!(table.len() <= table.capacity());
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, ..Default::default() })]

    #[test]
    fn insert_find_erase_round_trip_matches_model(
        ops in prop::collection::vec(
            (0i32..200, any::<i32>(), 0u8..3),
            1..2000,
        )
    ) {
        use std::collections::HashMap;

        let mut table: HashTable<i32, i32> = HashTable::new();
        let mut model: HashMap<i32, i32> = HashMap::new();

        for (key, value, op) in ops {
            match op {
                0 => {
                    let existing = model.contains_key(&key);
                    let (_, inserted) = table.insert(key, value);
                    prop_assert_eq!(inserted, !existing);
                    model.entry(key).or_insert(value);
                }
                1 => {
                    table.insert_or_assign(key, value);
                    model.insert(key, value);
                }
                _ => {
                    let removed = table.erase(&key);
                    prop_assert_eq!(removed, model.remove(&key).is_some());
                }
            }
            prop_assert_eq!(table.len(), model.len());
        }

        for (k, v) in &model {
            prop_assert_eq!(table.find(k), Some(v));
        }
        prop_assert_eq!(table.iter().count(), model.len());
    }
}
