//! # Memtable
//!
//! An in-memory, sorted, mutable write buffer for the storage engine's LSM
//! tree.
//!
//! The memtable is the first point of contact for every write operation. It
//! buffers recent `Put` and `Del` operations, keyed by the full internal key
//! `(user_key, seq, type)` rather than by user key alone, so multiple
//! versions of the same user key can coexist — this is what lets a reader
//! holding an old snapshot see the value that was visible when it started,
//! even while newer writes land in the same memtable.
//!
//! ## Key properties
//! - **Sorted order**: entries are always in ascending internal-key order
//!   (ascending user key, descending seq) — required for SSTable flush.
//! - **Multi-version**: a memtable can hold many versions of one user key;
//!   the highest seq not exceeding a reader's snapshot wins.
//! - **Tombstone support**: deletes are recorded as `RecordType::Deletion`
//!   records with an empty value, never physically removed here.
//! - **Approximate size tracking**: tracks key + value bytes for the
//!   flush-threshold decision, independent of the lock used for mutation.
//!
//! ## Example
//! ```rust
//! use memtable::Memtable;
//! use format::GetResult;
//!
//! let mem = Memtable::new();
//! mem.put(b"hello", 1, b"world".to_vec());
//! assert_eq!(mem.get(b"hello", 1), GetResult::Found(b"world".to_vec()));
//!
//! mem.del(b"hello", 2);
//! assert_eq!(mem.get(b"hello", 2), GetResult::Deleted);
//! assert_eq!(mem.get(b"hello", 1), GetResult::Found(b"world".to_vec()), "old snapshot unaffected");
//! ```

mod iter;

pub use iter::MemtableIter;

use format::{GetResult, InternalKey, ParsedKey, RecordType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// An ordered, multi-version, in-memory write buffer.
///
/// All mutation happens under the engine's `write_mutex`, so the internal
/// `RwLock` only ever needs to serialize a writer against concurrent
/// readers taking [`Memtable::get`] or [`Memtable::begin`] — never against
/// other writers. `approx_size` is a separate `AtomicUsize` so the flush
/// worker can poll it without taking the map lock at all.
#[derive(Debug)]
pub struct Memtable {
    map: RwLock<BTreeMap<InternalKey, Vec<u8>>>,
    approx_size: AtomicUsize,
    /// Set by the flush worker once it has claimed this (now-immutable)
    /// memtable for flushing, so a second flush pass does not pick it up
    /// again.
    flush_in_progress: AtomicBool,
    /// Set once this memtable's output SSTable has been installed into a
    /// new superversion; the engine drops the memtable once no
    /// superversion still references it and this flag is set.
    flush_complete: AtomicBool,
}

impl Memtable {
    /// Creates a new, empty memtable.
    pub fn new() -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
            approx_size: AtomicUsize::new(0),
            flush_in_progress: AtomicBool::new(false),
            flush_complete: AtomicBool::new(false),
        }
    }

    /// Inserts a live value for `user_key` at `seq`.
    ///
    /// Unlike a single-version store, this never overwrites an existing
    /// entry: every `(user_key, seq)` is a new key in the backing map, so
    /// older versions remain visible to readers snapshotted before `seq`.
    pub fn put(&self, user_key: &[u8], seq: u64, value: Vec<u8>) {
        let key = InternalKey::new(user_key, seq, RecordType::Value);
        let added = key.len() + value.len();
        self.map.write().unwrap().insert(key, value);
        self.approx_size.fetch_add(added, Ordering::Relaxed);
    }

    /// Records a tombstone for `user_key` at `seq`. The value is empty;
    /// the `Deletion` tag in the internal key itself is what masks older
    /// versions during reads.
    pub fn del(&self, user_key: &[u8], seq: u64) {
        let key = InternalKey::new(user_key, seq, RecordType::Deletion);
        let added = key.len();
        self.map.write().unwrap().insert(key, Vec::new());
        self.approx_size.fetch_add(added, Ordering::Relaxed);
    }

    /// Looks up the newest version of `user_key` with seq ≤ the given
    /// snapshot seq.
    ///
    /// Because internal keys order descending by seq within a user key,
    /// the first entry at or after `(user_key, seq, Value)` in ascending
    /// internal-key order is exactly that version (or the start of the
    /// next user key, in which case there is no visible version here).
    pub fn get(&self, user_key: &[u8], seq: u64) -> GetResult {
        let target = ParsedKey::new(user_key, seq, RecordType::Value);
        let map = self.map.read().unwrap();
        let hit = map
            .range(InternalKey::new(user_key, seq, RecordType::Value)..)
            .next();
        match hit {
            Some((k, v)) if k.as_parsed().user_key == target.user_key => match k.record_type() {
                RecordType::Value => GetResult::Found(v.clone()),
                RecordType::Deletion => GetResult::Deleted,
            },
            _ => GetResult::NotFound,
        }
    }

    /// Returns a snapshot iterator over every entry (including tombstones)
    /// currently in the memtable, in ascending internal-key order.
    ///
    /// The snapshot is a clone of the current key set taken at call time:
    /// insertions that happen after `begin()` returns are never observed
    /// by the returned iterator, satisfying the requirement that a reader
    /// mid-iteration see a consistent view even while writers continue to
    /// insert into the same (still-active) memtable.
    pub fn begin(&self) -> MemtableIter {
        let map = self.map.read().unwrap();
        MemtableIter::new(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Approximate byte size of all keys and values stored, used by the
    /// engine to decide when to seal this memtable and switch to a fresh
    /// one.
    #[must_use]
    pub fn approx_size(&self) -> usize {
        self.approx_size.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().unwrap().is_empty()
    }

    #[must_use]
    pub fn flush_in_progress(&self) -> bool {
        self.flush_in_progress.load(Ordering::Acquire)
    }

    pub fn set_flush_in_progress(&self) {
        self.flush_in_progress.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn flush_complete(&self) -> bool {
        self.flush_complete.load(Ordering::Acquire)
    }

    pub fn set_flush_complete(&self) {
        self.flush_complete.store(true, Ordering::Release);
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
