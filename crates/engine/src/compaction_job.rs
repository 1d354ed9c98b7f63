//! Runs a k-way-merged stream of internal-keyed records into one or more
//! new SSTables. Used by both the flush worker (source: one memtable) and
//! the compaction worker (source: a heap over several SSTables' cursors).

use crate::db::FileNameGenerator;
use anyhow::Result;
use format::{InternalKey, KvIter, RecordType};
use sstable::{SSTableBuilder, SSTableMeta};
use std::path::Path;

/// One output SSTable from a compaction or flush job.
#[derive(Debug, Clone)]
pub struct SstInfo {
    pub id: u64,
    pub meta: SSTableMeta,
}

/// Feeds a buffered `Vec<(InternalKey, Vec<u8>)>` to `SSTableBuilder` as a
/// `KvIter` — the job buffers one output file's worth of records at a time
/// so it can rotate to a new builder once `sst_file_size` is crossed, which
/// `SSTableBuilder::build` (one file per call) does not do on its own.
struct VecIter {
    items: Vec<(InternalKey, Vec<u8>)>,
    pos: usize,
}

impl VecIter {
    fn new(items: Vec<(InternalKey, Vec<u8>)>) -> Self {
        VecIter { items, pos: 0 }
    }
}

impl KvIter for VecIter {
    fn valid(&self) -> bool {
        self.pos < self.items.len()
    }
    fn key(&self) -> &InternalKey {
        &self.items[self.pos].0
    }
    fn value(&self) -> &[u8] {
        &self.items[self.pos].1
    }
    fn next(&mut self) {
        self.pos += 1;
    }
}

/// Merges `iter` into new SSTables under `out_dir`.
///
/// - First record seen per user key wins (the merge heap already yields
///   the newest version of each user key first); every later record
///   sharing that user key is strictly dominated and dropped.
/// - At the bottom level, tombstones are dropped too — nothing below them
///   could still be shadowed. Elsewhere they are kept.
/// - A fresh builder starts whenever the buffered records would exceed
///   `sst_file_size`; the final builder is only written if it holds at
///   least one record.
pub fn run<I: KvIter>(
    mut iter: I,
    out_dir: &Path,
    file_ids: &FileNameGenerator,
    block_size: usize,
    bloom_bits_per_key: u64,
    sst_file_size: u64,
    is_bottom_level: bool,
) -> Result<Vec<SstInfo>> {
    let builder = SSTableBuilder::new(block_size, bloom_bits_per_key);
    let mut outputs = Vec::new();
    let mut buf: Vec<(InternalKey, Vec<u8>)> = Vec::new();
    let mut buf_bytes: u64 = 0;
    let mut last_user_key: Option<Vec<u8>> = None;

    while iter.valid() {
        let key = iter.key().clone();
        let value = iter.value().to_vec();
        iter.next();

        if last_user_key.as_deref() == Some(key.user_key()) {
            continue;
        }
        last_user_key = Some(key.user_key().to_vec());

        if is_bottom_level && key.record_type() == RecordType::Deletion {
            continue;
        }

        buf_bytes += key.len() as u64 + value.len() as u64;
        buf.push((key, value));

        if buf_bytes >= sst_file_size {
            outputs.push(flush_chunk(&builder, out_dir, file_ids, std::mem::take(&mut buf))?);
            buf_bytes = 0;
        }
    }

    if !buf.is_empty() {
        outputs.push(flush_chunk(&builder, out_dir, file_ids, buf)?);
    }

    Ok(outputs)
}

fn flush_chunk(
    builder: &SSTableBuilder,
    out_dir: &Path,
    file_ids: &FileNameGenerator,
    chunk: Vec<(InternalKey, Vec<u8>)>,
) -> Result<SstInfo> {
    let id = file_ids.next_id();
    let path = out_dir.join(format!("{:020}.sst", id));
    let meta = builder.build(&path, VecIter::new(chunk))?;
    Ok(SstInfo { id, meta })
}

#[cfg(test)]
#[path = "tests/compaction_tests.rs"]
mod tests;
