//! Builds a single immutable SSTable file from a sorted stream of entries.
//!
//! The builder is deliberately source-agnostic: it consumes anything that
//! implements [`format::KvIter`], so the same code path serves both memtable
//! flush (source: `MemtableIter`) and compaction (source: a `SuperVersion`-
//! scoped merge iterator). The caller is responsible for rotating to a new
//! builder once a file reaches the engine's configured `sst_file_size` —
//! this type only ever produces one file per call.

use crate::block::{BlockBuilder, BlockHandle};
use crate::error::Error;
use crate::file_format::{write_index, write_len_prefixed_key, IndexEntry};
use anyhow::{bail, Result};
use bloom::BloomFilter;
use byteorder::{LittleEndian, WriteBytesExt};
use format::{InternalKey, KvIter};
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

/// Summary of a freshly written SSTable, enough for the engine to register
/// it in a [`Level`](https://docs.rs/engine) without re-opening the file.
#[derive(Debug, Clone)]
pub struct SSTableMeta {
    pub path: PathBuf,
    pub smallest_key: InternalKey,
    pub largest_key: InternalKey,
    pub record_count: u64,
    pub file_size: u64,
}

pub struct SSTableBuilder {
    block_size: usize,
    bloom_bits_per_key: u64,
}

impl SSTableBuilder {
    pub fn new(block_size: usize, bloom_bits_per_key: u64) -> Self {
        SSTableBuilder { block_size, bloom_bits_per_key }
    }

    /// Consumes `iter` (which must yield strictly ascending internal keys)
    /// and writes it out as a new SSTable at `path`.
    ///
    /// Crash-safe: data is written to `path` with a `.tmp` extension,
    /// fsynced, and atomically renamed into place; the parent directory is
    /// then fsynced so the rename itself survives a crash.
    ///
    /// # Errors
    /// Returns an error if `iter` yields no entries, or on any I/O failure.
    pub fn build<I: KvIter>(&self, path: &Path, mut iter: I) -> Result<SSTableMeta> {
        let tmp_path = path.with_extension("sst.tmp");
        let raw_file = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
        let mut file = BufWriter::new(raw_file);

        let mut record_count: u64 = 0;
        let mut smallest_key: Option<InternalKey> = None;
        let mut largest_key: Option<InternalKey> = None;
        let mut index_entries: Vec<IndexEntry> = Vec::new();
        let mut bloom_keys: Vec<Vec<u8>> = Vec::new();

        let mut block = BlockBuilder::new(self.block_size);

        while iter.valid() {
            let key = iter.key().clone();
            let value = iter.value().to_vec();

            if smallest_key.is_none() {
                smallest_key = Some(key.clone());
            }
            largest_key = Some(key.clone());
            bloom_keys.push(key.user_key().to_vec());
            record_count += 1;

            if !block.append(&key, &value) {
                Self::flush_block(&mut file, &mut block, &mut index_entries, self.block_size)?;
                if !block.append(&key, &value) {
                    return Err(Error::Corrupt(format!(
                        "single record too large for block_size {}",
                        self.block_size
                    ))
                    .into());
                }
            }

            iter.next();
        }

        if record_count == 0 {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            bail!("refusing to write an empty SSTable (no entries)");
        }

        if block.count() > 0 {
            Self::flush_block(&mut file, &mut block, &mut index_entries, self.block_size)?;
        }

        let index_offset = write_index(&mut file, &index_entries)?;

        let bloom_filter_offset = file.stream_position()?;
        let mut bloom = BloomFilter::with_bits_per_key(bloom_keys.len().max(1), self.bloom_bits_per_key);
        for k in &bloom_keys {
            bloom.insert(k);
        }
        let mut bloom_bytes = Vec::new();
        bloom.write_to(&mut bloom_bytes)?;
        file.write_u64::<LittleEndian>(bloom_bytes.len() as u64)?;
        file.write_all(&bloom_bytes)?;

        let largest_key = largest_key.expect("checked record_count > 0 above");
        let smallest_key = smallest_key.expect("checked record_count > 0 above");
        write_len_prefixed_key(&mut file, &largest_key)?;
        write_len_prefixed_key(&mut file, &smallest_key)?;

        let trailer = crate::file_format::Trailer { index_offset, bloom_filter_offset, record_count };
        trailer.write_to(&mut file)?;

        file.flush()?;
        let inner = file.into_inner().map_err(|e| e.into_error())?;
        inner.sync_all()?;
        let file_size = inner.metadata()?.len();
        drop(inner);

        rename(&tmp_path, path)?;
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(SSTableMeta { path: path.to_path_buf(), smallest_key, largest_key, record_count, file_size })
    }

    fn flush_block<W: Write + Seek>(
        file: &mut W,
        block: &mut BlockBuilder,
        index_entries: &mut Vec<IndexEntry>,
        block_size: usize,
    ) -> Result<()> {
        let offset = file.stream_position()?;
        let count = block.count() as u64;
        let largest_key = block.largest_key().clone();
        let finished = std::mem::replace(block, BlockBuilder::new(block_size)).finish();
        let size = finished.len() as u64;
        file.write_all(&finished)?;
        index_entries.push(IndexEntry { largest_key, handle: BlockHandle { offset, size, count } });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/writer_tests.rs"]
mod tests;
