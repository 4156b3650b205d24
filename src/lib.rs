//! chained-dict: a fixed-capacity, separately-chained dictionary from
//! string keys to caller-owned values, with a release hook per entry.
//!
//! Internal Design:
//!
//! Summary
//! - `ChainedHashTable<V, S>` owns a fixed array of slots. Each slot heads
//!   a singly linked chain of entries whose keys hash to that slot.
//! - Entries live in a `SlotMap` arena and link to their successor by
//!   generational key. Relinking on removal only rewrites keys, so there
//!   is no way to reach freed storage, and a removed entry's key never
//!   resolves to a newer entry.
//! - Every entry carries a `Release<V>`: the caller's cleanup hook, run
//!   with the value moved in exactly once, when the entry is removed,
//!   cleared, or the table is dropped.
//!
//! Constraints
//! - Single-threaded: `Release` boxes a non-`Send` closure, so the table
//!   is `!Send`/`!Sync`.
//! - Fixed slot count chosen at construction (> 0); the table never
//!   resizes, so chain lengths are entirely the caller's capacity choice.
//! - Keys are unique across the table; adding an existing key updates it.
//!
//! Update semantics
//! - `add` on an existing key replaces the value and release in place and
//!   returns the previous pair as `Added::Updated`. The previous release is
//!   NOT run. Its cleanup becomes the caller's business: run it, or drop it
//!   and let the old value drop normally.
//!
//! Drop ordering
//! - Entries are unlinked before their release runs, so the structure is
//!   consistent whenever caller code executes.
//!
//! Hashing
//! - The default `Poly37` builder hashes `h = h * 37 + byte` over the key's
//!   bytes with a wrapping `u64`, then reduces modulo the slot count. Any
//!   `BuildHasher` can be substituted; only `Hasher::write` is fed, with the
//!   raw key bytes.
//!
//! Diagnostics
//! - Operations emit `debug!` records through the `log` facade; the table
//!   dump goes to any `fmt::Write` via `write_table`, or to `log` at info
//!   level via `log_table`.
//!
//! Notes and non-goals
//! - No resizing, no persistence, no concurrent access.

pub mod chained_table;
mod chained_table_proptest;
pub mod error;
pub mod hash;
pub mod release;

// Public surface
pub use chained_table::{Added, ChainedHashTable, Handle, DEFAULT_SLOT_COUNT};
pub use error::TableError;
pub use hash::Poly37;
pub use release::Release;
