//! SSTable file-level framing: the trailer and the block index section.
//!
//! ```text
//! [block_0][block_1]...[block_N-1]
//! [block_count: u64]
//! [index_entry_offset_0: u64]...[index_entry_offset_N: u64]   (N+1 entries)
//! [index_entry_0]...[index_entry_N-1]
//! [bloom_len: u64][bloom_bytes]
//! [largest_key_len: u64][largest_key_bytes]
//! [smallest_key_len: u64][smallest_key_bytes]
//! [index_offset: u64][bloom_filter_offset: u64][record_count: u64]
//! ```
//!
//! `index_offset` in the trailer points at the `block_count` field, not at
//! the first index entry — the offset array that follows it is itself
//! addressed relative to that same position (`index_offset + (N+2)*8` is the
//! first entry's absolute file position, the `N+2` accounting for the
//! `block_count` field plus the `N+1`-entry offset array). There is no magic
//! number: the trailer's fixed 24-byte size and its position at end-of-file
//! are themselves the format identifier.

use crate::block::BlockHandle;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result as IoResult, Seek, SeekFrom, Write};

/// Size of the trailer in bytes: three `u64` fields, no magic.
pub const TRAILER_BYTES: u64 = 24;

/// The last 24 bytes of every SSTable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub index_offset: u64,
    pub bloom_filter_offset: u64,
    pub record_count: u64,
}

impl Trailer {
    pub fn write_to<W: Write>(&self, w: &mut W) -> IoResult<()> {
        w.write_u64::<LittleEndian>(self.index_offset)?;
        w.write_u64::<LittleEndian>(self.bloom_filter_offset)?;
        w.write_u64::<LittleEndian>(self.record_count)?;
        Ok(())
    }

    /// Reads the trailer from the last 24 bytes of `r`. Leaves the cursor at
    /// end-of-file.
    pub fn read_from<R: Read + Seek>(r: &mut R) -> IoResult<Self> {
        let filesize = r.seek(SeekFrom::End(0))?;
        if filesize < TRAILER_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "file too small to hold an SSTable trailer",
            ));
        }
        r.seek(SeekFrom::Start(filesize - TRAILER_BYTES))?;
        let index_offset = r.read_u64::<LittleEndian>()?;
        let bloom_filter_offset = r.read_u64::<LittleEndian>()?;
        let record_count = r.read_u64::<LittleEndian>()?;
        Ok(Trailer { index_offset, bloom_filter_offset, record_count })
    }
}

/// One entry in the block index: the largest internal key in the block,
/// paired with its location.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub largest_key: format::InternalKey,
    pub handle: BlockHandle,
}

/// Writes the block-count, offset array, and index entries following the
/// data blocks. Returns the absolute offset the caller should record as
/// `index_offset` in the trailer (the position this section started at).
pub fn write_index<W: Write + Seek>(w: &mut W, entries: &[IndexEntry]) -> IoResult<u64> {
    let index_offset = w.stream_position()?;
    let n = entries.len() as u64;
    w.write_u64::<LittleEndian>(n)?;

    let first_entry_offset = index_offset + (n + 2) * 8;
    let mut offsets = Vec::with_capacity(entries.len() + 1);
    let mut cursor = first_entry_offset;
    offsets.push(cursor);
    for e in entries {
        cursor += e.largest_key.len() as u64 + BlockHandle::ENCODED_LEN;
        offsets.push(cursor);
    }
    for off in &offsets {
        w.write_u64::<LittleEndian>(*off)?;
    }

    for e in entries {
        w.write_all(e.largest_key.as_bytes())?;
        e.handle.write_to(w)?;
    }

    Ok(index_offset)
}

/// Reads the block index section starting at `index_offset`. Leaves the
/// cursor positioned immediately after the last index entry (i.e. at the
/// start of the bloom-filter section).
pub fn read_index<R: Read + Seek>(r: &mut R, index_offset: u64) -> IoResult<Vec<IndexEntry>> {
    r.seek(SeekFrom::Start(index_offset))?;
    let n = r.read_u64::<LittleEndian>()?;
    let mut offsets = Vec::with_capacity(n as usize + 1);
    for _ in 0..=n {
        offsets.push(r.read_u64::<LittleEndian>()?);
    }

    let mut entries = Vec::with_capacity(n as usize);
    for i in 0..n as usize {
        let key_len = (offsets[i + 1] - offsets[i]) as usize - BlockHandle::ENCODED_LEN as usize;
        let mut key_buf = vec![0u8; key_len];
        r.read_exact(&mut key_buf)?;
        let handle = BlockHandle::read_from(r)?;
        entries.push(IndexEntry { largest_key: format::InternalKey::from_encoded(key_buf), handle });
    }
    Ok(entries)
}

/// Writes a length-prefixed key, used for the file-level largest/smallest
/// key fields that follow the bloom filter.
pub fn write_len_prefixed_key<W: Write>(w: &mut W, key: &format::InternalKey) -> IoResult<()> {
    w.write_u64::<LittleEndian>(key.len() as u64)?;
    w.write_all(key.as_bytes())
}

pub fn read_len_prefixed_key<R: Read>(r: &mut R) -> IoResult<format::InternalKey> {
    let len = r.read_u64::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(format::InternalKey::from_encoded(buf))
}
