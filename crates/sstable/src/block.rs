//! Block builder and iterator.
//!
//! A block is a fixed-capacity (4 KiB default) contiguous region holding a
//! sequence of length-prefixed records followed by a trailing array of
//! record offsets:
//!
//! ```text
//! [key_len:u64][key_bytes][value_len:u64][value_bytes]  (repeated, count times)
//! [record_offset:u64]  (repeated, count times, insertion order)
//! ```
//!
//! The key written into a record is the full internal key
//! (`user_key|seq|type`), so a block never needs to consult anything
//! outside itself to answer `Seek`/`Get`.

use format::{read_u64, write_u64, InternalKey, ParsedKey};
use std::io;

/// Location of one block within an SSTable file, as recorded in the block
/// index. 24 bytes on the wire: three `u64` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
    pub count: u64,
}

impl BlockHandle {
    pub const ENCODED_LEN: u64 = 24;

    pub fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write_u64(w, self.offset)?;
        write_u64(w, self.size)?;
        write_u64(w, self.count)
    }

    pub fn read_from<R: io::Read>(r: &mut R) -> io::Result<Self> {
        let offset = read_u64(r)?;
        let size = read_u64(r)?;
        let count = read_u64(r)?;
        Ok(BlockHandle { offset, size, count })
    }
}

/// Accumulates records into a fixed-capacity in-memory buffer.
///
/// `append` refuses (returns `false`, mutating nothing) once the record
/// plus its offset-array entry would overflow `block_size` — the caller is
/// expected to `finish` the current block, start a new one, and re-append.
pub struct BlockBuilder {
    block_size: usize,
    buf: Vec<u8>,
    offsets: Vec<u64>,
    largest_key: Option<InternalKey>,
    smallest_key: Option<InternalKey>,
}

impl BlockBuilder {
    pub fn new(block_size: usize) -> Self {
        BlockBuilder {
            block_size,
            buf: Vec::new(),
            offsets: Vec::new(),
            largest_key: None,
            smallest_key: None,
        }
    }

    /// Bytes a record for `key`/`value` would occupy, including its
    /// offset-array entry — used to decide whether `append` would fit.
    fn record_footprint(key: &InternalKey, value: &[u8]) -> usize {
        8 + key.len() + 8 + value.len() + 8
    }

    /// Tries to append `(key, value)`. Returns `false` without mutating
    /// state if doing so would exceed `block_size`.
    pub fn append(&mut self, key: &InternalKey, value: &[u8]) -> bool {
        let footprint = Self::record_footprint(key, value);
        if self.buf.len() + self.offsets.len() * 8 + footprint > self.block_size && !self.offsets.is_empty() {
            return false;
        }

        self.offsets.push(self.buf.len() as u64);
        write_u64(&mut self.buf, key.len() as u64).expect("write to Vec never fails");
        self.buf.extend_from_slice(key.as_bytes());
        write_u64(&mut self.buf, value.len() as u64).expect("write to Vec never fails");
        self.buf.extend_from_slice(value);

        // Track both boundaries on every append.
        if self.largest_key.as_ref().map_or(true, |lk| key.as_parsed() > lk.as_parsed()) {
            self.largest_key = Some(key.clone());
        }
        if self.smallest_key.as_ref().map_or(true, |sk| key.as_parsed() < sk.as_parsed()) {
            self.smallest_key = Some(key.clone());
        }

        true
    }

    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Current encoded size, including the trailing offset array — what
    /// `append` checks against `block_size`.
    pub fn size(&self) -> usize {
        self.buf.len() + self.offsets.len() * 8
    }

    pub fn largest_key(&self) -> &InternalKey {
        self.largest_key.as_ref().expect("largest_key read before any append")
    }

    pub fn smallest_key(&self) -> &InternalKey {
        self.smallest_key.as_ref().expect("smallest_key read before any append")
    }

    /// Appends the offset array trailer and returns the finished block
    /// bytes, consuming the builder.
    pub fn finish(mut self) -> Vec<u8> {
        for offset in &self.offsets {
            write_u64(&mut self.buf, *offset).expect("write to Vec never fails");
        }
        self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.offsets.clear();
        self.largest_key = None;
        self.smallest_key = None;
    }
}

/// Reads records out of a single finished block.
///
/// Borrows the block's byte buffer rather than owning it — the buffer's
/// lifetime (typically a page read from an SSTable file) must outlive the
/// iterator.
pub struct BlockIterator<'a> {
    data: &'a [u8],
    handle: BlockHandle,
    /// Index into the offset array, not a byte offset. `Valid` is defined
    /// as `pos < handle.count` (count-based — see the module-level note in
    /// `sstable::lib` on why this, not a type-based check, is correct).
    pos: u64,
}

impl<'a> BlockIterator<'a> {
    pub fn new(data: &'a [u8], handle: BlockHandle) -> Self {
        BlockIterator { data, handle, pos: handle.count }
    }

    pub fn seek_to_first(&mut self) {
        self.pos = 0;
    }

    /// Jumps directly to offset-array index `pos`, bypassing the linear
    /// scan `seek` does — used by `SSTableIterator` to resume at a
    /// previously-cached position without re-deriving it from a key.
    pub fn seek_to_pos(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Linear scan of the offset array for the first internal key ≥
    /// `(user_key, seq, Value)`. Blocks are small (4 KiB default) so a
    /// linear scan over at most a few dozen offsets is cheap and avoids
    /// needing a second, nested index just for intra-block search.
    pub fn seek(&mut self, user_key: &[u8], seq: u64) {
        let target = ParsedKey::new(user_key, seq, format::RecordType::Value);
        for i in 0..self.handle.count {
            let rec_offset = self.offset_at(i);
            let key = self.key_at(rec_offset);
            if key.as_parsed() >= target {
                self.pos = i;
                return;
            }
        }
        self.pos = self.handle.count;
    }

    fn offset_array_start(&self) -> usize {
        self.handle.size as usize - self.handle.count as usize * 8
    }

    fn offset_at(&self, i: u64) -> usize {
        let start = self.offset_array_start() + i as usize * 8;
        let mut cursor = &self.data[start..start + 8];
        read_u64(&mut cursor).expect("offset array read never fails on in-bounds data") as usize
    }

    fn key_at(&self, rec_offset: usize) -> InternalKey {
        let mut cursor = &self.data[rec_offset..];
        let key_len = read_u64(&mut cursor).expect("record key_len read") as usize;
        InternalKey::from_encoded(self.data[rec_offset + 8..rec_offset + 8 + key_len].to_vec())
    }

    fn current_record_offset(&self) -> usize {
        self.offset_at(self.pos)
    }
}

impl<'a> BlockIterator<'a> {
    /// Valid = position strictly less than the block's record count
    /// (count-based, not type-based — see the `sstable` crate root docs
    /// for why this is the correct variant: tombstones must remain
    /// iterable).
    pub fn valid(&self) -> bool {
        self.pos < self.handle.count
    }

    /// Internal key at the current position.
    ///
    /// `BlockIterator` only ever borrows its backing byte buffer (a page
    /// read out of an SSTable file), so it hands back an owned key rather
    /// than a reference into it — the decode is a handful of byte-slice
    /// reads, cheap relative to the I/O that produced the buffer. Callers
    /// one level up (`SSTableIterator`) cache this into a field so they
    /// can implement `KvIter::key` by reference.
    pub fn key(&self) -> InternalKey {
        let rec_offset = self.current_record_offset();
        self.key_at(rec_offset)
    }

    pub fn value(&self) -> &[u8] {
        let rec_offset = self.current_record_offset();
        let mut cursor = &self.data[rec_offset..];
        let key_len = read_u64(&mut cursor).expect("record key_len read") as usize;
        let val_start = rec_offset + 8 + key_len;
        let mut cursor = &self.data[val_start..];
        let val_len = read_u64(&mut cursor).expect("record value_len read") as usize;
        &self.data[val_start + 8..val_start + 8 + val_len]
    }

    pub fn next(&mut self) {
        self.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format::RecordType;

    fn ik(k: &[u8], seq: u64) -> InternalKey {
        InternalKey::new(k, seq, RecordType::Value)
    }

    #[test]
    fn append_tracks_both_boundaries() {
        let mut b = BlockBuilder::new(4096);
        assert!(b.append(&ik(b"m", 1), b"v"));
        assert!(b.append(&ik(b"a", 1), b"v"));
        assert!(b.append(&ik(b"z", 1), b"v"));
        assert_eq!(b.largest_key().user_key(), b"z");
        assert_eq!(b.smallest_key().user_key(), b"a");
    }

    #[test]
    fn append_refuses_past_capacity() {
        let mut b = BlockBuilder::new(64);
        assert!(b.append(&ik(b"a", 1), &vec![0u8; 10]));
        // A second large record should not fit in a 64-byte block.
        assert!(!b.append(&ik(b"b", 1), &vec![0u8; 100]));
        assert_eq!(b.count(), 1, "refused append must not mutate state");
    }

    #[test]
    fn iterator_scans_in_insertion_order_with_count_based_valid() {
        let mut b = BlockBuilder::new(4096);
        b.append(&ik(b"a", 3), b"1");
        b.append(&ik(b"a", 1), b"2");
        let count = b.count() as u64;
        let bytes = b.finish();
        let handle = BlockHandle { offset: 0, size: bytes.len() as u64, count };
        let mut it = BlockIterator::new(&bytes, handle);
        it.seek_to_first();
        assert!(it.valid());
        assert_eq!(it.value(), b"1");
        it.next();
        assert!(it.valid());
        assert_eq!(it.value(), b"2");
        it.next();
        assert!(!it.valid(), "count-based Valid must go false after the last record, including tombstone-shaped records");
    }

    #[test]
    fn seek_finds_first_key_greater_or_equal() {
        let mut b = BlockBuilder::new(4096);
        b.append(&ik(b"a", 1), b"a1");
        b.append(&ik(b"b", 5), b"b5");
        b.append(&ik(b"c", 1), b"c1");
        let count = b.count() as u64;
        let bytes = b.finish();
        let handle = BlockHandle { offset: 0, size: bytes.len() as u64, count };
        let mut it = BlockIterator::new(&bytes, handle);
        it.seek(b"b", 10);
        assert!(it.valid());
        assert_eq!(it.key().user_key(), b"b");
    }
}
