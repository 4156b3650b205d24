//! ChainedHashTable: a fixed slot array whose slots head singly linked
//! chains of arena-allocated entries.
//!
//! Entries live in a `SlotMap` and link to their successor by generational
//! key, so relinking never touches freed storage and a stale key can never
//! resolve to a newer entry. The slot count is fixed at construction.

use crate::error::TableError;
use crate::hash::Poly37;
use crate::release::Release;
use core::fmt;
use core::hash::{BuildHasher, Hasher};
use core::mem;
use log::{debug, info, log_enabled, trace, Level};
use slotmap::{DefaultKey, SlotMap};

/// Slot count used by `ChainedHashTable::default()`.
pub const DEFAULT_SLOT_COUNT: usize = 16;

/// Stable reference to one live entry. Survives updates of the entry's
/// value; never resolves again once the entry is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, V, S>(&self, table: &'a ChainedHashTable<V, S>) -> Option<&'a str> {
        table.entries.get(self.0).map(|e| &*e.key)
    }

    pub fn value<'a, V, S>(&self, table: &'a ChainedHashTable<V, S>) -> Option<&'a V> {
        table.entries.get(self.0).map(|e| &e.value)
    }

    pub fn value_mut<'a, V, S>(&self, table: &'a mut ChainedHashTable<V, S>) -> Option<&'a mut V> {
        table.entries.get_mut(self.0).map(|e| &mut e.value)
    }
}

#[derive(Debug)]
struct Entry<V> {
    key: Box<str>,
    value: V,
    release: Release<V>,
    next: Option<DefaultKey>,
}

/// What `add` did with the key.
#[derive(Debug)]
pub enum Added<V> {
    /// The key's bucket was empty; the entry now heads it.
    New,
    /// The bucket was occupied by other keys; the entry was appended to the
    /// chain tail.
    Chained,
    /// The key already existed. Its value and release were replaced in
    /// place and the previous pair is handed back. The previous release
    /// has NOT been run: dropping this variant drops the old value without
    /// its hook ever firing.
    Updated { value: V, release: Release<V> },
}

impl<V> Added<V> {
    pub fn is_update(&self) -> bool {
        matches!(self, Added::Updated { .. })
    }
}

pub struct ChainedHashTable<V, S = Poly37> {
    hasher: S,
    slots: Box<[Option<DefaultKey>]>, // chain heads, one per bucket
    entries: SlotMap<DefaultKey, Entry<V>>,
}

impl<V> ChainedHashTable<V> {
    pub fn new(slot_count: usize) -> Result<Self, TableError> {
        Self::with_hasher(slot_count, Poly37)
    }
}

impl<V> Default for ChainedHashTable<V> {
    fn default() -> Self {
        Self::from_parts(DEFAULT_SLOT_COUNT, Poly37)
    }
}

/// Walks one chain head to tail.
pub struct Chain<'a, V> {
    entries: &'a SlotMap<DefaultKey, Entry<V>>,
    cur: Option<DefaultKey>,
}

impl<'a, V> Iterator for Chain<'a, V> {
    type Item = (&'a str, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.entries.get(self.cur?)?;
        self.cur = e.next;
        Some((&e.key, &e.value))
    }
}

/// Iterator over all entries in slot order, then chain order.
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Option<DefaultKey>>,
    chain: Chain<'a, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.chain.next() {
                return Some(item);
            }
            self.chain.cur = *self.slots.next()?;
        }
    }
}

impl<V, S> ChainedHashTable<V, S> {
    // Callers validate `slot_count > 0`.
    fn from_parts(slot_count: usize, hasher: S) -> Self {
        Self {
            hasher,
            slots: vec![None; slot_count].into_boxed_slice(),
            entries: SlotMap::with_key(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Entries of bucket `slot`, head to tail. Empty for out-of-range slots.
    pub fn chain(&self, slot: usize) -> Chain<'_, V> {
        Chain {
            entries: &self.entries,
            cur: self.slots.get(slot).copied().flatten(),
        }
    }

    pub fn chain_len(&self, slot: usize) -> usize {
        self.chain(slot).count()
    }

    /// Chain length of every bucket, indexed by slot.
    pub fn chain_lengths(&self) -> Vec<usize> {
        (0..self.slots.len()).map(|s| self.chain_len(s)).collect()
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            chain: Chain {
                entries: &self.entries,
                cur: None,
            },
        }
    }

    /// Remove every entry, running each release exactly once. The slot
    /// count is kept.
    pub fn clear(&mut self) {
        for slot in 0..self.slots.len() {
            // Detach the whole chain first so the table is consistent while
            // release hooks run.
            let mut cur = self.slots[slot].take();
            while let Some(k) = cur {
                let Some(Entry {
                    key,
                    value,
                    release,
                    next,
                }) = self.entries.remove(k)
                else {
                    break;
                };
                trace!("releasing {key} from slot {slot}");
                cur = next;
                release.run(value);
            }
        }
    }

    /// Render every non-empty bucket as `Slot i: | key => value | ...`.
    pub fn write_table<W: fmt::Write>(&self, out: &mut W) -> fmt::Result
    where
        V: fmt::Debug,
    {
        writeln!(out, "---- Log Table Start ----")?;
        for slot in 0..self.slots.len() {
            let mut chain = self.chain(slot).peekable();
            if chain.peek().is_none() {
                continue;
            }
            write!(out, "Slot {slot}: |")?;
            for (k, v) in chain {
                write!(out, " {k} => {v:?} |")?;
            }
            writeln!(out)?;
        }
        writeln!(out, "---- Log Table End ----")
    }

    /// Send the table dump to the `log` facade at info level.
    pub fn log_table(&self)
    where
        V: fmt::Debug,
    {
        if !log_enabled!(Level::Info) {
            return;
        }
        let mut out = String::new();
        // Formatting into a String only fails if a Debug impl does.
        if self.write_table(&mut out).is_err() {
            return;
        }
        for line in out.lines() {
            info!("{line}");
        }
    }
}

impl<V, S> ChainedHashTable<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(slot_count: usize, hasher: S) -> Result<Self, TableError> {
        if slot_count == 0 {
            return Err(TableError::ZeroSlots);
        }
        Ok(Self::from_parts(slot_count, hasher))
    }

    /// Bucket index of `key` for this table's slot count.
    pub fn bucket_of(&self, key: &str) -> usize {
        let mut h = self.hasher.build_hasher();
        h.write(key.as_bytes());
        // The remainder is below `slots.len()`, so it fits in usize.
        (h.finish() % self.slots.len() as u64) as usize
    }

    fn locate(&self, key: &str) -> Option<DefaultKey> {
        let mut cur = self.slots[self.bucket_of(key)];
        while let Some(k) = cur {
            let e = self.entries.get(k)?;
            if &*e.key == key {
                return Some(k);
            }
            cur = e.next;
        }
        None
    }

    /// Insert `key` or, if present, replace its value and release in place.
    pub fn add(&mut self, key: impl Into<Box<str>>, value: V, release: Release<V>) -> Added<V> {
        let key = key.into();
        let slot = self.bucket_of(&key);

        let Some(head) = self.slots[slot] else {
            debug!("new: {key} in slot {slot}");
            let k = self.entries.insert(Entry {
                key,
                value,
                release,
                next: None,
            });
            self.slots[slot] = Some(k);
            return Added::New;
        };

        let mut tail = head;
        let mut cur = Some(head);
        while let Some(k) = cur {
            let Some(e) = self.entries.get_mut(k) else {
                break;
            };
            if e.key == key {
                debug!("update: {key} in slot {slot}");
                let value = mem::replace(&mut e.value, value);
                let release = mem::replace(&mut e.release, release);
                return Added::Updated { value, release };
            }
            tail = k;
            cur = e.next;
        }

        debug!("new via chain: {key} in slot {slot}");
        let k = self.entries.insert(Entry {
            key,
            value,
            release,
            next: None,
        });
        if let Some(t) = self.entries.get_mut(tail) {
            t.next = Some(k);
        }
        Added::Chained
    }

    // Detach the entry for `key` from its chain and the arena.
    fn unlink(&mut self, key: &str) -> Option<Entry<V>> {
        let slot = self.bucket_of(key);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.slots[slot];
        while let Some(k) = cur {
            let e = self.entries.get(k)?;
            if &*e.key == key {
                let next = e.next;
                match prev {
                    None => self.slots[slot] = next,
                    Some(p) => {
                        if let Some(pe) = self.entries.get_mut(p) {
                            pe.next = next;
                        }
                    }
                }
                return self.entries.remove(k);
            }
            prev = cur;
            cur = e.next;
        }
        None
    }

    /// Remove `key`, running its release exactly once. Returns `false` and
    /// leaves the table untouched if the key is absent.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.unlink(key) {
            Some(Entry { value, release, .. }) => {
                debug!("removed: {key}");
                release.run(value);
                true
            }
            None => {
                debug!("not found for removal: {key}");
                false
            }
        }
    }

    /// Remove `key` without running its release; the value and the hook
    /// are returned to the caller.
    pub fn take(&mut self, key: &str) -> Option<(V, Release<V>)> {
        let Entry { value, release, .. } = self.unlink(key)?;
        debug!("taken: {key}");
        Some((value, release))
    }

    pub fn find(&self, key: &str) -> Option<&V> {
        let k = self.locate(key)?;
        self.entries.get(k).map(|e| &e.value)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut V> {
        let k = self.locate(key)?;
        self.entries.get_mut(k).map(|e| &mut e.value)
    }

    pub fn find_handle(&self, key: &str) -> Option<Handle> {
        self.locate(key).map(Handle)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.locate(key).is_some()
    }
}

impl<V, S> Drop for ChainedHashTable<V, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V: fmt::Debug, S> fmt::Display for ChainedHashTable<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_table(f)
    }
}

impl<V: fmt::Debug, S> fmt::Debug for ChainedHashTable<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<i32>>>;

    fn recording(log: &Log) -> Release<i32> {
        let log = log.clone();
        Release::new(move |v| log.borrow_mut().push(v))
    }

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
        } // every key lands in slot 0
    }

    fn one_chain(keys: &[&str], log: &Log) -> ChainedHashTable<i32, ConstBuildHasher> {
        let mut t = ChainedHashTable::with_hasher(4, ConstBuildHasher).unwrap();
        for (i, k) in keys.iter().enumerate() {
            let _ = t.add(*k, i as i32, recording(log));
        }
        t
    }

    fn chain_keys<V, S>(t: &ChainedHashTable<V, S>, slot: usize) -> Vec<String> {
        t.chain(slot).map(|(k, _)| k.to_string()).collect()
    }

    /// Invariant: a zero slot count is rejected.
    #[test]
    fn zero_slots_rejected() {
        assert_eq!(
            ChainedHashTable::<i32>::new(0).err(),
            Some(TableError::ZeroSlots)
        );
        assert!(ChainedHashTable::<i32>::new(1).is_ok());
    }

    /// Invariant: the default table has `DEFAULT_SLOT_COUNT` empty slots.
    #[test]
    fn default_table_is_empty() {
        let t: ChainedHashTable<i32> = ChainedHashTable::default();
        assert_eq!(t.slot_count(), DEFAULT_SLOT_COUNT);
        assert!(t.is_empty());
        assert!(t.chain_lengths().iter().all(|&n| n == 0));
    }

    /// Invariant: `add` reports New for an empty bucket, Chained for a
    /// collision, and Updated for an existing key.
    #[test]
    fn add_outcomes() {
        let mut t = ChainedHashTable::with_hasher(2, ConstBuildHasher).unwrap();
        assert!(matches!(t.add("a", 1, Release::noop()), Added::New));
        assert!(matches!(t.add("b", 2, Release::noop()), Added::Chained));
        let out = t.add("a", 3, Release::noop());
        assert!(out.is_update());
        match out {
            Added::Updated { value, .. } => assert_eq!(value, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(t.len(), 2);
        assert_eq!(chain_keys(&t, 0), vec!["a", "b"]);
    }

    /// Invariant: updating does not run the previous release, keeps the
    /// entry's chain position, and a dropped `Updated` stays silent.
    #[test]
    fn update_does_not_release_previous() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b", "c"], &log);
        let displaced = t.add("b", 20, recording(&log));
        drop(displaced);
        assert!(log.borrow().is_empty());
        assert_eq!(t.find("b"), Some(&20));
        assert_eq!(chain_keys(&t, 0), vec!["a", "b", "c"]);

        drop(t);
        let mut released = log.borrow().clone();
        released.sort();
        assert_eq!(released, vec![0, 2, 20]);
    }

    /// Invariant: the displaced release can still be run by the caller.
    #[test]
    fn displaced_release_is_callers() {
        let log = Log::default();
        let mut t = ChainedHashTable::new(8).unwrap();
        let _ = t.add("k", 1, recording(&log));
        if let Added::Updated { value, release } = t.add("k", 2, recording(&log)) {
            release.run(value);
        }
        assert_eq!(*log.borrow(), vec![1]);
    }

    /// Invariant: removing the sole node empties the slot.
    #[test]
    fn remove_sole_head() {
        let log = Log::default();
        let mut t = one_chain(&["a"], &log);
        assert!(t.remove("a"));
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(t.chain_len(0), 0);
        assert!(t.is_empty());
    }

    /// Invariant: removing the head of a longer chain re-points the slot
    /// at its successor.
    #[test]
    fn remove_head_with_successor() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b", "c"], &log);
        assert!(t.remove("a"));
        assert_eq!(chain_keys(&t, 0), vec!["b", "c"]);
        assert_eq!(*log.borrow(), vec![0]);
    }

    /// Invariant: removing an interior node links its neighbours.
    #[test]
    fn remove_interior() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b", "c"], &log);
        assert!(t.remove("b"));
        assert_eq!(chain_keys(&t, 0), vec!["a", "c"]);
        assert_eq!(*log.borrow(), vec![1]);
    }

    /// Invariant: removing the tail terminates the chain at its
    /// predecessor, and appends land after it again.
    #[test]
    fn remove_tail() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b", "c"], &log);
        assert!(t.remove("c"));
        assert_eq!(chain_keys(&t, 0), vec!["a", "b"]);
        assert!(matches!(t.add("d", 9, Release::noop()), Added::Chained));
        assert_eq!(chain_keys(&t, 0), vec!["a", "b", "d"]);
        assert_eq!(*log.borrow(), vec![2]);
    }

    /// Invariant: removing an absent key from an occupied or empty bucket
    /// reports failure, runs nothing, and leaves the chain intact.
    #[test]
    fn remove_absent_is_clean() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b"], &log);
        assert!(!t.remove("zz"));
        assert_eq!(chain_keys(&t, 0), vec!["a", "b"]);

        let mut empty: ChainedHashTable<i32> = ChainedHashTable::new(4).unwrap();
        assert!(!empty.remove("zz"));

        assert!(t.remove("a"));
        assert!(!t.remove("a"), "second removal must fail");
        assert_eq!(*log.borrow(), vec![0]);
    }

    /// Invariant: `take` detaches without running the release.
    #[test]
    fn take_hands_back_value_and_hook() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b"], &log);
        let (v, r) = t.take("a").expect("present");
        assert_eq!(v, 0);
        assert!(log.borrow().is_empty());
        assert!(!t.contains_key("a"));
        r.run(v);
        assert_eq!(*log.borrow(), vec![0]);
        assert!(t.take("a").is_none());
    }

    /// Invariant: `find` is read-only and repeatable; `find_mut` edits in
    /// place.
    #[test]
    fn find_and_find_mut() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b"], &log);
        for _ in 0..3 {
            assert_eq!(t.find("b"), Some(&1));
        }
        assert_eq!(t.find("missing"), None);
        *t.find_mut("b").unwrap() += 10;
        assert_eq!(t.find("b"), Some(&11));
        assert!(log.borrow().is_empty());
    }

    /// Invariant: handles survive updates and never resolve after removal,
    /// even when arena storage is reused.
    #[test]
    fn handles_are_generational() {
        let mut t: ChainedHashTable<i32> = ChainedHashTable::new(4).unwrap();
        let _ = t.add("k", 1, Release::noop());
        let h = t.find_handle("k").unwrap();
        let _ = t.add("k", 2, Release::noop());
        assert_eq!(h.value(&t), Some(&2));
        assert_eq!(h.key(&t), Some("k"));
        *h.value_mut(&mut t).unwrap() = 3;
        assert_eq!(t.find("k"), Some(&3));

        assert!(t.remove("k"));
        let _ = t.add("k2", 4, Release::noop());
        assert!(h.value(&t).is_none());
        assert_ne!(t.find_handle("k2"), Some(h));
    }

    /// Invariant: `clear` runs every release once and leaves a usable table.
    #[test]
    fn clear_releases_everything() {
        let log = Log::default();
        let mut t = one_chain(&["a", "b", "c"], &log);
        t.clear();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(t.is_empty());
        assert_eq!(t.slot_count(), 4);
        let _ = t.add("d", 3, recording(&log));
        drop(t);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    /// Invariant: iteration visits slots in order and chains head to tail.
    #[test]
    fn iter_order() {
        let mut t: ChainedHashTable<i32> = ChainedHashTable::new(4).unwrap();
        for i in 0..10 {
            let _ = t.add(format!("key{i}"), i, Release::noop());
        }
        let keys: Vec<&str> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["key3", "key7", "key0", "key4", "key8", "key1", "key5", "key9", "key2", "key6"]
        );
        assert_eq!(t.iter().count(), t.len());
    }

    /// Invariant: the dump lists non-empty slots only, chains head to tail.
    #[test]
    fn write_table_format() {
        let mut t: ChainedHashTable<i32> = ChainedHashTable::new(8).unwrap();
        let _ = t.add("key0", 0, Release::noop());
        let _ = t.add("key8", 8, Release::noop());
        let slot = t.bucket_of("key0");
        assert_eq!(slot, t.bucket_of("key8"));

        let mut out = String::new();
        t.write_table(&mut out).unwrap();
        let expected = format!(
            "---- Log Table Start ----\nSlot {slot}: | key0 => 0 | key8 => 8 |\n---- Log Table End ----\n"
        );
        assert_eq!(out, expected);
        assert_eq!(t.to_string(), expected);
    }

    /// Invariant: an empty table dumps only the frame lines.
    #[test]
    fn write_table_empty() {
        let t: ChainedHashTable<i32> = ChainedHashTable::new(3).unwrap();
        assert_eq!(
            t.to_string(),
            "---- Log Table Start ----\n---- Log Table End ----\n"
        );
    }

    /// Invariant: out-of-range slots read as empty chains.
    #[test]
    fn chain_out_of_range() {
        let t: ChainedHashTable<i32> = ChainedHashTable::new(3).unwrap();
        assert_eq!(t.chain_len(99), 0);
    }
}
