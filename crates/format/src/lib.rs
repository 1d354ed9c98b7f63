//! # format
//!
//! Internal key encoding, record types, lookup results, and the shared
//! key/value iterator capability used across the storage core.
//!
//! This crate sits at the bottom of the workspace's dependency order: file
//! I/O primitives and the comparator everything else — memtable, sstable,
//! engine — builds on. Nothing in here touches the filesystem beyond the
//! little-endian integer framing helpers in [`io`].

mod io;
mod iter;
mod key;
mod result;

pub use io::{read_bytes, read_u32, read_u64, read_u8, write_bytes, write_u32, write_u64, write_u8};
pub use iter::{IteratorHeap, KvIter};
pub use key::{InternalKey, ParsedKey, RecordType};
pub use result::GetResult;
