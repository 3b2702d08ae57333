#![cfg(test)]

// Property tests for both tables kept inside the crate so they can check
// slot- and bucket-level invariants that the public API does not expose.

use crate::chained::{ChainedTable, MAX_LOAD_FACTOR};
use crate::hash_function::{checked_index, Djb2, HashFunction, Polynomial, SumOfCodes};
use crate::open_addressing::{OpenAddressingTable, ProbeMode, Slot, MAX_PROBE_LOAD};
use crate::table::MIN_CAPACITY;
use crate::TableError;
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

// Pool-indexed operations: indices shrink towards earlier keys, the pool
// shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Structural invariants of an open-addressing table.
fn check_slots<H1: HashFunction, H2: HashFunction>(
    t: &OpenAddressingTable<i32, H1, H2>,
) -> Result<(), TestCaseError> {
    let slots = &t.slots.slots;
    prop_assert!(slots.len() >= MIN_CAPACITY);
    let live = slots.iter().filter(|s| matches!(s, Slot::Occupied { .. })).count();
    let tombs = slots.iter().filter(|s| matches!(s, Slot::Tombstone)).count();
    prop_assert_eq!(live, t.len());
    prop_assert_eq!(tombs, t.tombstones());
    prop_assert!(t.len() as f64 / slots.len() as f64 <= MAX_PROBE_LOAD);

    let mut keys = BTreeSet::new();
    for (idx, slot) in slots.iter().enumerate() {
        if let Slot::Occupied { key, .. } = slot {
            prop_assert!(keys.insert(key.clone()), "duplicate live key {:?}", key);
            // Every live entry is reachable along its own probe sequence.
            prop_assert_eq!(t.slots.find(key), Some(idx));
        }
    }
    Ok(())
}

/// Structural invariants of a chained table.
fn check_chains<H: HashFunction>(t: &ChainedTable<i32, H>) -> Result<(), TestCaseError> {
    let capacity = t.capacity();
    prop_assert!(capacity >= MIN_CAPACITY);
    prop_assert!(t.load_factor() <= MAX_LOAD_FACTOR);
    let mut total = 0;
    let mut keys = BTreeSet::new();
    for (b, bucket) in t.chains.buckets.iter().enumerate() {
        for e in bucket {
            prop_assert_eq!(checked_index(t.hash_function(), &e.key, capacity), b);
            prop_assert!(keys.insert(e.key.clone()), "duplicate key {:?}", e.key);
            total += 1;
        }
    }
    prop_assert_eq!(total, t.len());
    Ok(())
}

/// Drives an open-addressing table against a `HashMap` model. Probe
/// exhaustion is tolerated only when `allow_exhaustion` is set, and must
/// then leave every existing entry in place.
fn run_open_addressing<H1: HashFunction, H2: HashFunction>(
    mut sut: OpenAddressingTable<i32, H1, H2>,
    pool: &[String],
    ops: Vec<Op>,
    allow_exhaustion: bool,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut capacity = sut.capacity();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = &pool[i];
                let already = model.contains_key(k);
                match sut.try_insert(k.as_str(), v) {
                    Ok(()) => {
                        model.insert(k.clone(), v);
                    }
                    Err(TableError::ProbeExhausted { capacity: c, attempts }) => {
                        prop_assert!(allow_exhaustion, "exhausted probing {:?}", k);
                        prop_assert_eq!(c, attempts);
                        // A failed growth leaves an existing value untouched.
                        prop_assert_eq!(sut.get(k), model.get(k));
                        prop_assert_eq!(sut.contains(k), already);
                    }
                }
                // Growth only ever doubles.
                let now = sut.capacity();
                prop_assert!(now == capacity || now == capacity * 2);
                capacity = now;
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k).is_some());
                prop_assert!(!sut.contains(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            Op::Contains(s) => {
                prop_assert_eq!(sut.contains(&s), model.contains_key(&s));
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(a), Some(b)) => {
                        *a = a.wrapping_add(d);
                        *b = b.wrapping_add(d);
                    }
                    (None, None) => {}
                    (a, b) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", a, b),
                }
            }
            Op::Iterate => {
                let s: BTreeSet<(String, i32)> =
                    sut.iter().map(|(k, v)| (k.to_string(), *v)).collect();
                let m: BTreeSet<(String, i32)> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check_slots(&sut)?;
    }
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

fn run_chained<H: HashFunction>(
    mut sut: ChainedTable<i32, H>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let before = sut.capacity();
                sut.insert(pool[i].as_str(), v);
                model.insert(pool[i].clone(), v);
                let now = sut.capacity();
                prop_assert!(now == before || now == before * 2);
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k).is_some());
                prop_assert!(!sut.contains(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            Op::Contains(s) => {
                prop_assert_eq!(sut.contains(&s), model.contains_key(&s));
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                if let (Some(a), Some(b)) = (sut.get_mut(k), model.get_mut(k)) {
                    *a = a.wrapping_add(d);
                    *b = b.wrapping_add(d);
                }
            }
            Op::Iterate => {
                let s: BTreeSet<(String, i32)> =
                    sut.iter().map(|(k, v)| (k.to_string(), *v)).collect();
                let m: BTreeSet<(String, i32)> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        check_chains(&sut)?;
    }
    Ok(())
}

fn pinned(_: &str, _: usize) -> usize {
    0
}

// Property: state-machine equivalence against a HashMap model.
// Invariants exercised across random operation sequences:
// - get/contains/remove/len parity with the model after every op.
// - Live slot count == len, tombstone slot count == tombstones().
// - Every live key is found by probing from its home slot; no duplicates.
// - Capacity >= 8 and only ever doubles; load stays within the bound.
// - Linear probing never reports exhaustion, even when every key collides.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

    #[test]
    fn prop_linear_state_machine((pool, ops) in arb_scenario()) {
        let sut = OpenAddressingTable::with_hashers(8, Djb2, Polynomial::default(), ProbeMode::Linear);
        run_open_addressing(sut, &pool, ops, false)?;
    }

    #[test]
    fn prop_linear_all_keys_collide((pool, ops) in arb_scenario()) {
        let sut = OpenAddressingTable::with_hashers(8, pinned, Djb2, ProbeMode::Linear);
        run_open_addressing(sut, &pool, ops, false)?;
    }

    #[test]
    fn prop_linear_anagram_collisions((pool, ops) in arb_scenario(), cap in 0usize..40) {
        let sut = OpenAddressingTable::with_hashers(cap, SumOfCodes, Djb2, ProbeMode::Linear);
        run_open_addressing(sut, &pool, ops, false)?;
    }

    // Double hashing may exhaust a short probe cycle; when it does, nothing
    // already stored may be disturbed.
    #[test]
    fn prop_double_state_machine((pool, ops) in arb_scenario()) {
        let sut = OpenAddressingTable::with_hashers(8, Djb2, Polynomial::default(), ProbeMode::Double);
        run_open_addressing(sut, &pool, ops, true)?;
    }

    #[test]
    fn prop_double_with_pinned_home((pool, ops) in arb_scenario()) {
        let sut = OpenAddressingTable::with_hashers(8, pinned, SumOfCodes, ProbeMode::Double);
        run_open_addressing(sut, &pool, ops, true)?;
    }

    #[test]
    fn prop_chained_state_machine((pool, ops) in arb_scenario(), cap in 0usize..40) {
        run_chained(ChainedTable::with_hasher(cap, Polynomial::default()), &pool, ops)?;
    }

    #[test]
    fn prop_chained_all_keys_collide((pool, ops) in arb_scenario()) {
        run_chained(ChainedTable::with_hasher(8, pinned), &pool, ops)?;
    }
}
