//! # Engine - storage engine
//!
//! The central orchestrator tying [`memtable`], [`sstable`], and [`config`]
//! into a complete LSM-tree key-value store, fronted by a single
//! [`Database`] facade.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌────────────────────────────────────────────────────────┐
//! │                       Database                         │
//! │                                                        │
//! │  put/delete → active memtable (write_mutex)             │
//! │                  |  (over write_buffer_size?)           │
//! │                  v                                      │
//! │           switch_memtable → immutable queue             │
//! │                  |  (flush_cv)                          │
//! │                  v                                      │
//! │           flush_worker → new L0 sorted run               │
//! │                  |  (compact_cv)                        │
//! │                  v                                      │
//! │           compaction_worker → picker-chosen merge        │
//! │                                                        │
//! │  get/begin/seek → SuperVersion (active, immutables,      │
//! │                    version) — memtables first, then       │
//! │                    levels in order                       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module                | Purpose                                              |
//! |------------------------|------------------------------------------------------|
//! | [`version`]            | `SortedRun`, `Level`, `Version` — the on-disk tree    |
//! | [`superversion`]       | `SuperVersion`, the merged read/iterate snapshot      |
//! | [`compaction_picker`]  | One picker per compaction strategy                    |
//! | [`compaction_job`]     | Merges a `KvIter` into new SSTables                   |
//! | [`manifest`]           | Binary metadata file (load/save)                      |
//! | [`flush_worker`]       | Background thread: immutable memtables → L0           |
//! | [`compaction_worker`]  | Background thread: runs picker-chosen compactions      |
//! | [`db`]                 | `Database` facade and the three-lock hierarchy        |
//!
//! ## Crash safety
//!
//! There is no write-ahead log: durability is clean-shutdown-only. Every
//! SSTable is written atomically (temp file + fsync + rename), and the
//! metadata file is written the same way on `Drop`. A process that dies
//! mid-flush or mid-compaction loses only the data still sitting in
//! memtables at the time of the crash.

mod compaction_job;
mod compaction_picker;
mod compaction_worker;
mod db;
mod error;
mod flush_worker;
mod manifest;
mod superversion;
mod version;

pub use db::{Database, DbIterator, FileNameGenerator};
pub use error::Error;
pub use manifest::Metadata;
pub use superversion::{SuperVersion, SuperVersionIterator};
pub use version::{Level, SortedRun, Version};
