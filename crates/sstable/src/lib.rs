//! # SSTable — Sorted String Table
//!
//! Immutable, on-disk storage files for the storage engine's LSM tree. When
//! a memtable fills up, the engine flushes it to disk as an SSTable;
//! compaction later merges several SSTables into new ones. Once written, a
//! table is never modified — only replaced.
//!
//! ## File layout
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ one or more 4 KiB (default) blocks, each:                       │
//! │   [key_len:u64|key|value_len:u64|value]*  [record_offset:u64]*  │
//! ├────────────────────────────────────────────────────────────────┤
//! │ block_count: u64                                                │
//! │ index_entry_offset_0..N: u64   (N+1 absolute file offsets)      │
//! │ index_entry_0..N-1: largest_key_bytes | BlockHandle             │
//! ├────────────────────────────────────────────────────────────────┤
//! │ bloom_len: u64 | bloom_bytes                                    │
//! │ largest_key_len: u64 | largest_key_bytes                        │
//! │ smallest_key_len: u64 | smallest_key_bytes                      │
//! ├────────────────────────────────────────────────────────────────┤
//! │ trailer (24 bytes, no magic):                                   │
//! │   index_offset: u64 | bloom_filter_offset: u64 | record_count:u64│
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every key stored on disk is a full internal key
//! (`user_key | seq | type`) — a block never needs anything outside itself
//! to answer a point lookup once handed to it by the index.
//!
//! `get` on a reader follows bloom-check → index binary search → single
//! block scan: a negative bloom result avoids all disk I/O, and the index
//! narrows the scan to exactly one block.

mod block;
mod error;
mod file_format;
mod reader;
mod writer;

pub use block::{BlockBuilder, BlockHandle, BlockIterator};
pub use error::Error;
pub use file_format::Trailer;
pub use reader::{SSTableCursor, SSTableIterator, SSTableReader};
pub use writer::{SSTableBuilder, SSTableMeta};
