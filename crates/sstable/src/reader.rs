//! Opens an existing SSTable file for point lookups and ordered scans.

use crate::block::{BlockHandle, BlockIterator};
use crate::error::Error;
use crate::file_format::{read_index, read_len_prefixed_key, IndexEntry, Trailer};
use anyhow::Result;
use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use format::{GetResult, InternalKey, KvIter, RecordType};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A read-only handle onto one on-disk SSTable.
///
/// `open` loads the block index and the bloom filter into memory; block
/// data itself stays on disk and is read on demand. The file handle is kept
/// open for the reader's lifetime behind a `Mutex`, so `get` and iteration
/// can both be driven through a shared `&self`.
pub struct SSTableReader {
    path: PathBuf,
    index: Vec<IndexEntry>,
    bloom: BloomFilter,
    smallest_key: InternalKey,
    largest_key: InternalKey,
    record_count: u64,
    file_size: u64,
    trailer: Trailer,
    file: Mutex<File>,
}

impl SSTableReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)?;
        let file_size = f.metadata()?.len();

        let trailer = Trailer::read_from(&mut f)?;
        let index = read_index(&mut f, trailer.index_offset)?;
        if index.is_empty() && trailer.record_count > 0 {
            return Err(Error::Corrupt("empty block index with nonzero record_count".to_string()).into());
        }

        // `read_index` leaves the cursor right after the last index entry,
        // i.e. at the start of the bloom filter section.
        let bloom_len = f.read_u64::<LittleEndian>()?;
        let mut bloom_bytes = vec![0u8; bloom_len as usize];
        f.read_exact(&mut bloom_bytes)?;
        let bloom = BloomFilter::read_from(&mut std::io::Cursor::new(bloom_bytes))?;

        let largest_key = read_len_prefixed_key(&mut f)?;
        let smallest_key = read_len_prefixed_key(&mut f)?;

        f.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path_buf,
            index,
            bloom,
            smallest_key,
            largest_key,
            record_count: trailer.record_count,
            file_size,
            trailer,
            file: Mutex::new(f),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The trailer read back at open time — `index_offset` and
    /// `bloom_filter_offset` are what the metadata file persists per
    /// SSTable so a fresh reader can be reopened without rescanning.
    #[must_use]
    pub fn trailer(&self) -> Trailer {
        self.trailer
    }

    #[must_use]
    pub fn smallest_key(&self) -> &InternalKey {
        &self.smallest_key
    }

    #[must_use]
    pub fn largest_key(&self) -> &InternalKey {
        &self.largest_key
    }

    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Looks up the newest version of `user_key` with seq ≤ `seq` in this
    /// table alone.
    ///
    /// Follows bloom-check, then binary-search over the block index, then a
    /// single block scan — a negative bloom result short-circuits before
    /// any disk I/O, and the index narrows the scan to one block.
    pub fn get(&self, user_key: &[u8], seq: u64) -> Result<GetResult> {
        if !self.bloom.may_contain(user_key) {
            return Ok(GetResult::NotFound);
        }

        let target = format::ParsedKey::new(user_key, seq, RecordType::Value);
        let idx = self.index.partition_point(|e| e.largest_key.as_parsed() < target);
        let Some(entry) = self.index.get(idx) else {
            return Ok(GetResult::NotFound);
        };

        let block_bytes = self.read_block(&entry.handle)?;
        let mut it = BlockIterator::new(&block_bytes, entry.handle);
        it.seek(user_key, seq);
        if !it.valid() {
            return Ok(GetResult::NotFound);
        }
        let key = it.key();
        if key.user_key() != user_key {
            return Ok(GetResult::NotFound);
        }
        match key.record_type() {
            RecordType::Value => Ok(GetResult::Found(it.value().to_vec())),
            RecordType::Deletion => Ok(GetResult::Deleted),
        }
    }

    fn read_block(&self, handle: &BlockHandle) -> Result<Vec<u8>> {
        let mut f = self.file.lock().map_err(|e| anyhow::anyhow!("lock poisoned: {e}"))?;
        f.seek(SeekFrom::Start(handle.offset))?;
        let mut buf = vec![0u8; handle.size as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// An iterator over every record in the table, in ascending internal-key
    /// order, starting at the first block.
    pub fn iter(&self) -> Result<SSTableIterator<'_>> {
        let mut it = SSTableIterator { reader: self, block_idx: 0, pos_in_block: 0, block: None, current: None };
        it.load_block(0)?;
        Ok(it)
    }
}

/// Iterates an [`SSTableReader`] block by block, implementing
/// [`format::KvIter`] so it composes with the engine's merge heap.
pub struct SSTableIterator<'a> {
    reader: &'a SSTableReader,
    block_idx: usize,
    pos_in_block: u64,
    block: Option<(Vec<u8>, BlockHandle)>,
    /// Key and value at the current position, cached as owned buffers so
    /// `KvIter::key`/`value` can hand back plain references: the underlying
    /// `BlockIterator` only borrows its block and can't outlive this call.
    current: Option<(InternalKey, Vec<u8>)>,
}

impl<'a> SSTableIterator<'a> {
    fn load_block(&mut self, idx: usize) -> Result<()> {
        let mut idx = idx;
        loop {
            if idx >= self.reader.index.len() {
                self.block = None;
                self.current = None;
                return Ok(());
            }
            let handle = self.reader.index[idx].handle;
            let bytes = self.reader.read_block(&handle)?;
            let mut bi = BlockIterator::new(&bytes, handle);
            bi.seek_to_first();
            if bi.valid() {
                self.current = Some((bi.key(), bi.value().to_vec()));
                self.pos_in_block = 0;
                self.block_idx = idx;
                self.block = Some((bytes, handle));
                return Ok(());
            }
            // An empty block (shouldn't occur in practice) — skip it.
            idx += 1;
        }
    }

    fn advance(&mut self) -> Result<()> {
        let Some((bytes, handle)) = self.block.take() else { return Ok(()) };
        let mut bi = BlockIterator::new(&bytes, handle);
        bi.seek_to_pos(self.pos_in_block);
        bi.next();
        if bi.valid() {
            self.current = Some((bi.key(), bi.value().to_vec()));
            self.pos_in_block += 1;
            self.block = Some((bytes, handle));
            Ok(())
        } else {
            self.load_block(self.block_idx + 1)
        }
    }
}

impl<'a> KvIter for SSTableIterator<'a> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &InternalKey {
        &self.current.as_ref().expect("key() called on invalid iterator").0
    }

    fn value(&self) -> &[u8] {
        &self.current.as_ref().expect("value() called on invalid iterator").1
    }

    fn next(&mut self) {
        let _ = self.advance();
    }
}

/// Like [`SSTableIterator`], but owns an `Arc<SSTableReader>` instead of
/// borrowing one, so it can outlive the call that created it and live
/// inside a heap of mixed child iterator kinds with no shared lifetime
/// parameter — the shape the engine's superversion merge heap needs.
pub struct SSTableCursor {
    reader: Arc<SSTableReader>,
    block_idx: usize,
    pos_in_block: u64,
    block: Option<(Vec<u8>, BlockHandle)>,
    current: Option<(InternalKey, Vec<u8>)>,
}

impl SSTableCursor {
    pub fn new(reader: Arc<SSTableReader>) -> Result<Self> {
        let mut cursor = SSTableCursor { reader, block_idx: 0, pos_in_block: 0, block: None, current: None };
        cursor.load_block(0)?;
        Ok(cursor)
    }

    /// Positions the cursor at the first record ≥ `(user_key, seq, Value)`.
    pub fn seek(&mut self, user_key: &[u8], seq: u64) -> Result<()> {
        let target = format::ParsedKey::new(user_key, seq, RecordType::Value);
        let idx = self.reader.index.partition_point(|e| e.largest_key.as_parsed() < target);
        if idx >= self.reader.index.len() {
            self.block = None;
            self.current = None;
            return Ok(());
        }
        let handle = self.reader.index[idx].handle;
        let bytes = self.reader.read_block(&handle)?;
        let mut bi = BlockIterator::new(&bytes, handle);
        bi.seek(user_key, seq);
        if bi.valid() {
            self.current = Some((bi.key(), bi.value().to_vec()));
            self.pos_in_block = bi.pos();
            self.block_idx = idx;
            self.block = Some((bytes, handle));
            Ok(())
        } else {
            self.load_block(idx + 1)
        }
    }

    fn load_block(&mut self, idx: usize) -> Result<()> {
        let mut idx = idx;
        loop {
            if idx >= self.reader.index.len() {
                self.block = None;
                self.current = None;
                return Ok(());
            }
            let handle = self.reader.index[idx].handle;
            let bytes = self.reader.read_block(&handle)?;
            let mut bi = BlockIterator::new(&bytes, handle);
            bi.seek_to_first();
            if bi.valid() {
                self.current = Some((bi.key(), bi.value().to_vec()));
                self.pos_in_block = 0;
                self.block_idx = idx;
                self.block = Some((bytes, handle));
                return Ok(());
            }
            idx += 1;
        }
    }

    fn advance(&mut self) -> Result<()> {
        let Some((bytes, handle)) = self.block.take() else { return Ok(()) };
        let mut bi = BlockIterator::new(&bytes, handle);
        bi.seek_to_pos(self.pos_in_block);
        bi.next();
        if bi.valid() {
            self.current = Some((bi.key(), bi.value().to_vec()));
            self.pos_in_block += 1;
            self.block = Some((bytes, handle));
            Ok(())
        } else {
            self.load_block(self.block_idx + 1)
        }
    }
}

impl KvIter for SSTableCursor {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &InternalKey {
        &self.current.as_ref().expect("key() called on invalid cursor").0
    }

    fn value(&self) -> &[u8] {
        &self.current.as_ref().expect("value() called on invalid cursor").1
    }

    fn next(&mut self) {
        let _ = self.advance();
    }
}

#[cfg(test)]
#[path = "tests/reader_tests.rs"]
mod tests;
