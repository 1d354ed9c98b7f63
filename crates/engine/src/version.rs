//! Sorted runs, levels, and the immutable `Version` they compose into.
//!
//! A `Version` is never mutated in place: the flush and compaction workers
//! build a new one from the current one plus whatever changed, and publish
//! it as a fresh `SuperVersion` (see [`crate::superversion`]). Readers that
//! captured an older `Version` keep seeing a perfectly consistent tree for
//! as long as they hold it, since its `Arc<SSTableReader>` entries are never
//! touched again once built.

use anyhow::Result;
use format::GetResult;
use sstable::SSTableReader;
use std::sync::Arc;

/// An ordered list of SSTables with pairwise-disjoint, ascending key ranges.
/// Binary-searchable by `largest_key`.
#[derive(Clone, Default)]
pub struct SortedRun {
    pub ssts: Vec<Arc<SSTableReader>>,
}

impl SortedRun {
    pub fn new(ssts: Vec<Arc<SSTableReader>>) -> Self {
        SortedRun { ssts }
    }

    pub fn byte_size(&self) -> u64 {
        self.ssts.iter().map(|s| s.file_size()).sum()
    }

    /// Binary-searches for the single SSTable whose range could contain
    /// `user_key`, then delegates the point lookup to it.
    pub fn get(&self, user_key: &[u8], seq: u64) -> Result<GetResult> {
        let target = format::ParsedKey::new(user_key, seq, format::RecordType::Value);
        let idx = self.ssts.partition_point(|s| s.largest_key().as_parsed() < target);
        let Some(sst) = self.ssts.get(idx) else {
            return Ok(GetResult::NotFound);
        };
        if user_key < sst.smallest_key().user_key() {
            return Ok(GetResult::NotFound);
        }
        sst.get(user_key, seq)
    }
}

/// An ordered list of sorted runs. L0 may hold several overlapping runs (one
/// per flush, newest appended last); L1+ hold exactly one run under leveled
/// compaction.
#[derive(Clone, Default)]
pub struct Level {
    pub level_id: u32,
    pub runs: Vec<Arc<SortedRun>>,
}

impl Level {
    pub fn new(level_id: u32) -> Self {
        Level { level_id, runs: Vec::new() }
    }

    pub fn byte_size(&self) -> u64 {
        self.runs.iter().map(|r| r.byte_size()).sum()
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn append(&mut self, run: Arc<SortedRun>) {
        self.runs.push(run);
    }

    /// Looks up `user_key` trying runs most-recently-appended first — only
    /// meaningful for L0, where runs may overlap; L1+ always has at most one
    /// run so order is moot there.
    pub fn get(&self, user_key: &[u8], seq: u64) -> Result<GetResult> {
        for run in self.runs.iter().rev() {
            match run.get(user_key, seq)? {
                GetResult::NotFound => continue,
                other => return Ok(other),
            }
        }
        Ok(GetResult::NotFound)
    }
}

/// An ordered sequence of levels at one point in time.
#[derive(Clone, Default)]
pub struct Version {
    pub levels: Vec<Level>,
}

impl Version {
    pub fn new() -> Self {
        Version { levels: Vec::new() }
    }

    pub fn level(&self, level_id: usize) -> Option<&Level> {
        self.levels.get(level_id)
    }

    /// Appends `runs` onto `level_id`, creating empty intermediate levels
    /// (and the target level itself) as needed. Mirrors the source's lazy
    /// `levels_` growth — nothing pre-allocates levels that are never used.
    pub fn append(&mut self, level_id: usize, runs: impl IntoIterator<Item = Arc<SortedRun>>) {
        while self.levels.len() <= level_id {
            let next_id = self.levels.len() as u32;
            self.levels.push(Level::new(next_id));
        }
        for run in runs {
            self.levels[level_id].append(run);
        }
    }

    /// Replaces `level_id`'s runs wholesale — used by compaction to install
    /// a freshly merged run in place of the inputs it consumed.
    pub fn replace_level(&mut self, level_id: usize, runs: Vec<Arc<SortedRun>>) {
        while self.levels.len() <= level_id {
            let next_id = self.levels.len() as u32;
            self.levels.push(Level::new(next_id));
        }
        self.levels[level_id].runs = runs;
    }

    /// Walks levels in order; the first one returning anything other than
    /// `NotFound` stops the search.
    pub fn get(&self, user_key: &[u8], seq: u64) -> Result<GetResult> {
        for level in &self.levels {
            match level.get(user_key, seq)? {
                GetResult::NotFound => continue,
                other => return Ok(other),
            }
        }
        Ok(GetResult::NotFound)
    }
}

#[cfg(test)]
#[path = "tests/version_tests.rs"]
mod tests;
