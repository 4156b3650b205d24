#![cfg(test)]

// Property tests for ChainedHashTable kept inside the crate so they can
// use a collision-forcing hasher alongside the default one.

use crate::chained_table::{Added, ChainedHashTable};
use crate::release::Release;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Remove(usize),
    Take(usize),
    Find(usize),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<OpI>)> {
    (1usize..=6, proptest::collection::vec("[a-z]{0,5}", 1..=8)).prop_flat_map(
        |(slots, pool)| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let op = prop_oneof![
                4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Add(i, v)),
                2 => idx.clone().prop_map(OpI::Remove),
                1 => idx.clone().prop_map(OpI::Take),
                2 => idx.clone().prop_map(OpI::Find),
                1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
                1 => Just(OpI::Iterate),
                1 => Just(OpI::Clear),
            ];
            proptest::collection::vec(op, 1..60).prop_map(move |ops| (slots, pool.clone(), ops))
        },
    )
}

type Released = Rc<RefCell<Vec<(String, i32)>>>;

fn recording(log: &Released, key: &str) -> Release<i32> {
    let log = log.clone();
    let key = key.to_string();
    Release::new(move |v| log.borrow_mut().push((key, v)))
}

// Collision variant using a constant hasher to stress chain relinking.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Drives one table against a `HashMap` model. Each stored value's release
// records `(key, value)`; `expected` mirrors which releases must have run.
fn run_state_machine<S: BuildHasher>(
    mut sut: ChainedHashTable<i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let released: Released = Rc::default();
    let mut expected: Vec<(String, i32)> = Vec::new();
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Add(i, v) => {
                let k = &pool[i];
                let already = model.contains_key(k);
                match sut.add(k.as_str(), v, recording(&released, k)) {
                    Added::Updated { value, release } => {
                        prop_assert!(already, "update only for existing keys");
                        prop_assert_eq!(Some(value), model.get(k).copied());
                        // Dropped unrun: the old hook must never fire.
                        drop(release);
                    }
                    Added::New | Added::Chained => {
                        prop_assert!(!already, "insert only for new keys");
                    }
                }
                model.insert(k.clone(), v);
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(k);
                match model.remove(k) {
                    Some(v) => {
                        prop_assert!(removed);
                        expected.push((k.clone(), v));
                    }
                    None => prop_assert!(!removed),
                }
                prop_assert!(sut.find(k).is_none());
            }
            OpI::Take(i) => {
                let k = &pool[i];
                let taken = sut.take(k).map(|(v, _release)| v);
                prop_assert_eq!(taken, model.remove(k));
            }
            OpI::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(v) = sut.find_mut(k) {
                    *v = v.saturating_add(d);
                }
                if let Some(v) = model.get_mut(k) {
                    *v = v.saturating_add(d);
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<String> = sut.iter().map(|(k, _)| k.to_string()).collect();
                let m_keys: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::Clear => {
                sut.clear();
                expected.extend(model.drain());
            }
        }

        // Post-conditions after each op
        // 1) Releases ran exactly for the entries destroyed so far
        let mut got = released.borrow().clone();
        got.sort();
        let mut want = expected.clone();
        want.sort();
        prop_assert_eq!(got, want);
        // 2) Size parity, and every entry sits in the chain its key hashes to
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.chain_lengths().iter().sum::<usize>(), model.len());
        for slot in 0..sut.slot_count() {
            for (k, _) in sut.chain(slot) {
                prop_assert_eq!(sut.bucket_of(k), slot);
            }
        }
    }

    // Teardown releases every survivor exactly once.
    drop(sut);
    expected.extend(model.drain());
    let mut got = released.borrow().clone();
    got.sort();
    expected.sort();
    prop_assert_eq!(got, expected);
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Keys are unique; re-adding updates in place and hands back the old value.
// - `find`/`contains_key` parity with the model.
// - Each release runs exactly once, only on remove/clear/drop, never on update or take.
// - Every entry is reachable from the slot its key hashes to.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((slots, pool, ops) in arb_scenario()) {
        let sut: ChainedHashTable<i32> = ChainedHashTable::new(slots).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

// Property: Same invariants under worst-case collisions (constant hasher),
// which puts every key in one chain and exercises every relinking case.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((slots, pool, ops) in arb_scenario()) {
        let sut = ChainedHashTable::with_hasher(slots, ConstBuildHasher).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

// Property: bucket choice is a pure function of key and slot count.
proptest! {
    #[test]
    fn prop_bucket_is_deterministic(key in ".{0,16}", slots in 1usize..64) {
        let a: ChainedHashTable<()> = ChainedHashTable::new(slots).unwrap();
        let b: ChainedHashTable<()> = ChainedHashTable::new(slots).unwrap();
        let i = a.bucket_of(&key);
        prop_assert!(i < slots);
        prop_assert_eq!(i, a.bucket_of(&key));
        prop_assert_eq!(i, b.bucket_of(&key));
    }
}
