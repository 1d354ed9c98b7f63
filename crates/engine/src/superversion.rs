//! `SuperVersion`: the `(active_memtable, immutable_memtables, version)`
//! snapshot readers see, and the merge iterator over all three.

use crate::version::Version;
use anyhow::Result;
use format::{GetResult, InternalKey, KvIter};
use memtable::{Memtable, MemtableIter};
use sstable::SSTableCursor;
use std::sync::Arc;

/// The single polymorphic iterator capability the merge heap needs:
/// memtable and SSTable children coexist in one `IteratorHeap` so a range
/// scan never has to special-case its source.
pub enum ChildIter {
    Mem(MemtableIter),
    Sst(SSTableCursor),
}

impl KvIter for ChildIter {
    fn valid(&self) -> bool {
        match self {
            ChildIter::Mem(it) => it.valid(),
            ChildIter::Sst(it) => it.valid(),
        }
    }

    fn key(&self) -> &InternalKey {
        match self {
            ChildIter::Mem(it) => it.key(),
            ChildIter::Sst(it) => it.key(),
        }
    }

    fn value(&self) -> &[u8] {
        match self {
            ChildIter::Mem(it) => it.value(),
            ChildIter::Sst(it) => it.value(),
        }
    }

    fn next(&mut self) {
        match self {
            ChildIter::Mem(it) => it.next(),
            ChildIter::Sst(it) => it.next(),
        }
    }
}

/// A point-in-time snapshot of everything a reader needs: the active
/// memtable, the immutable queue (newest first), and the current `Version`.
/// Cheap to clone — every field is reference-counted — so `db.rs` swaps the
/// current one under a brief `sv_mutex` read lock.
#[derive(Clone)]
pub struct SuperVersion {
    pub active_memtable: Arc<Memtable>,
    pub immutable_memtables: Vec<Arc<Memtable>>,
    pub version: Arc<Version>,
}

impl SuperVersion {
    pub fn new(active_memtable: Arc<Memtable>, immutable_memtables: Vec<Arc<Memtable>>, version: Arc<Version>) -> Self {
        SuperVersion { active_memtable, immutable_memtables, version }
    }

    /// Checks the active memtable, then each immutable memtable
    /// newest-first, then the version. First non-`NotFound` result wins.
    pub fn get(&self, user_key: &[u8], seq: u64) -> Result<GetResult> {
        match self.active_memtable.get(user_key, seq) {
            GetResult::NotFound => {}
            other => return Ok(other),
        }
        for imm in &self.immutable_memtables {
            match imm.get(user_key, seq) {
                GetResult::NotFound => continue,
                other => return Ok(other),
            }
        }
        self.version.get(user_key, seq)
    }

    fn child_iters(&self) -> Result<Vec<ChildIter>> {
        let mut children = Vec::new();
        children.push(ChildIter::Mem(self.active_memtable.begin()));
        for imm in &self.immutable_memtables {
            children.push(ChildIter::Mem(imm.begin()));
        }
        for level in &self.version.levels {
            for run in &level.runs {
                for sst in &run.ssts {
                    children.push(ChildIter::Sst(SSTableCursor::new(Arc::clone(sst))?));
                }
            }
        }
        Ok(children)
    }

    pub fn iter(&self) -> Result<SuperVersionIterator> {
        let mut heap = format::IteratorHeap::new();
        for child in self.child_iters()? {
            heap.push(child);
        }
        Ok(SuperVersionIterator { heap })
    }

    /// Seeks every child to its first record ≥ `(user_key, seq, Value)`,
    /// pushing only the ones still valid afterward.
    pub fn seek(&self, user_key: &[u8], seq: u64) -> Result<SuperVersionIterator> {
        let mut heap = format::IteratorHeap::new();
        for mut child in self.child_iters()? {
            match &mut child {
                ChildIter::Mem(it) => it.seek(user_key, seq),
                ChildIter::Sst(it) => it.seek(user_key, seq)?,
            }
            heap.push(child);
        }
        Ok(SuperVersionIterator { heap })
    }
}

/// One iterator per memtable and per sorted run, merged through a min-heap
/// keyed by internal key: the smaller internal key — i.e. the newer version
/// of a duplicated user key — always comes out first.
pub struct SuperVersionIterator {
    heap: format::IteratorHeap<ChildIter>,
}

impl KvIter for SuperVersionIterator {
    fn valid(&self) -> bool {
        self.heap.valid()
    }

    fn key(&self) -> &InternalKey {
        self.heap.key()
    }

    fn value(&self) -> &[u8] {
        self.heap.value()
    }

    fn next(&mut self) {
        self.heap.next()
    }
}

#[cfg(test)]
#[path = "tests/superversion_tests.rs"]
mod tests;
