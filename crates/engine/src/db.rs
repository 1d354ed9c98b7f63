//! The `Database` facade: the engine's single public entry point, tying
//! memtables, versions, and the flush/compaction worker threads together
//! behind a three-lock hierarchy (`write_mutex`, `db_mutex`, and the
//! `SuperVersion`'s `RwLock`), mirroring the original engine's
//! `write_mutex_`/`db_mutex_`/`sv_mutex_` split.

use crate::compaction_picker::{build_picker, CompactionPicker};
use crate::compaction_worker;
use crate::flush_worker;
use crate::manifest::{self, LevelRecord, Metadata, SstRecord};
use crate::superversion::{SuperVersion, SuperVersionIterator};
use crate::version::{SortedRun, Version};
use anyhow::Result;
use config::Options;
use format::{GetResult, InternalKey, KvIter, RecordType};
use memtable::Memtable;
use sstable::SSTableReader;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Monotonic source of new SSTable file ids, seeded from the metadata
/// file's `next_file_id` on reopen so ids are never reused across restarts.
pub struct FileNameGenerator {
    next: AtomicU64,
}

impl FileNameGenerator {
    pub fn new(start: u64) -> Self {
        FileNameGenerator { next: AtomicU64::new(start) }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

pub(crate) struct Shared {
    pub(crate) options: Options,
    pub(crate) sv: RwLock<Arc<SuperVersion>>,
    pub(crate) seq: AtomicU64,
    pub(crate) write_mutex: Mutex<()>,
    pub(crate) db_mutex: Mutex<()>,
    pub(crate) flush_cv: Condvar,
    pub(crate) compact_cv: Condvar,
    pub(crate) stop_signal: AtomicBool,
    pub(crate) flush_flag: AtomicBool,
    pub(crate) compact_flag: AtomicBool,
    pub(crate) file_ids: FileNameGenerator,
    pub(crate) picker: Option<Box<dyn CompactionPicker>>,
}

impl Shared {
    pub(crate) fn get_sv(&self) -> Arc<SuperVersion> {
        Arc::clone(&self.sv.read().unwrap())
    }

    pub(crate) fn install_sv(&self, sv: SuperVersion) {
        *self.sv.write().unwrap() = Arc::new(sv);
    }
}

/// A single open LSM-tree key-value store. Cheap to clone internally
/// (everything is `Arc`-backed through [`Shared`]), but `Database` itself
/// owns the worker threads and is not `Clone` — callers share one `Database`
/// behind their own `Arc` if they need that.
pub struct Database {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl Database {
    /// Opens (or creates) a database at `options.db_path`.
    ///
    /// Loads the binary metadata file if one exists, reopening every
    /// SSTable it references; a missing file means a fresh database. Spawns
    /// the flush and compaction worker threads before returning.
    #[tracing::instrument(skip(options), fields(db_path = %options.db_path.display()))]
    pub fn open(options: Options) -> Result<Self> {
        options.validate()?;
        fs::create_dir_all(&options.db_path)?;

        let metadata_path = options.db_path.join(manifest::METADATA_FILENAME);
        let (seq, next_file_id, version) = match Metadata::load(&metadata_path)? {
            Some(meta) => {
                let mut version = Version::new();
                for level in &meta.levels {
                    let mut runs = Vec::with_capacity(level.runs.len());
                    for run in &level.runs {
                        let mut ssts = Vec::with_capacity(run.len());
                        for sst in run {
                            let path = options.db_path.join(&sst.filename);
                            ssts.push(Arc::new(SSTableReader::open(&path)?));
                        }
                        runs.push(Arc::new(SortedRun::new(ssts)));
                    }
                    version.replace_level(level.level_id as usize, runs);
                }
                (meta.current_seq, meta.next_file_id, version)
            }
            None => (0, 0, Version::new()),
        };

        let picker = build_picker(&options);
        if picker.is_none() {
            anyhow::bail!("compaction strategy {:?} has no picker implementation", options.compaction_strategy_name);
        }

        let sv = SuperVersion::new(Arc::new(Memtable::new()), Vec::new(), Arc::new(version));
        let shared = Arc::new(Shared {
            options,
            sv: RwLock::new(Arc::new(sv)),
            seq: AtomicU64::new(seq),
            write_mutex: Mutex::new(()),
            db_mutex: Mutex::new(()),
            flush_cv: Condvar::new(),
            compact_cv: Condvar::new(),
            stop_signal: AtomicBool::new(false),
            flush_flag: AtomicBool::new(false),
            compact_flag: AtomicBool::new(false),
            file_ids: FileNameGenerator::new(next_file_id),
            picker,
        });

        let threads = vec![
            {
                let shared = Arc::clone(&shared);
                thread::spawn(move || flush_worker::run(shared))
            },
            {
                let shared = Arc::clone(&shared);
                thread::spawn(move || compaction_worker::run(shared))
            },
        ];

        info!(path = %shared.options.db_path.display(), "database opened");
        Ok(Database { shared, threads })
    }

    /// Inserts or overwrites `key`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        debug!(key_len = key.len(), value_len = value.len(), "put");
        let _w = self.shared.write_mutex.lock().unwrap();
        let seq = self.shared.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let sv = self.shared.get_sv();
        sv.active_memtable.put(key, seq, value.to_vec());
        let over_budget = sv.active_memtable.approx_size() as u64 > self.shared.options.write_buffer_size;
        drop(sv);
        if over_budget {
            self.switch_memtable(false);
        }
        Ok(())
    }

    /// Records a tombstone for `key`.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _w = self.shared.write_mutex.lock().unwrap();
        let seq = self.shared.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let sv = self.shared.get_sv();
        sv.active_memtable.del(key, seq);
        let over_budget = sv.active_memtable.approx_size() as u64 > self.shared.options.write_buffer_size;
        drop(sv);
        if over_budget {
            self.switch_memtable(false);
        }
        Ok(())
    }

    /// Looks up the newest visible version of `key` as of the current
    /// sequence number.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        debug!(key_len = key.len(), "get");
        let sv = self.shared.get_sv();
        let seq = self.shared.seq.load(Ordering::SeqCst);
        match sv.get(key, seq)? {
            GetResult::Found(v) => Ok(Some(v)),
            GetResult::Deleted | GetResult::NotFound => Ok(None),
        }
    }

    /// An iterator over every live key in ascending order, as of the
    /// current sequence number: each user key appears exactly once, at its
    /// newest value as of that snapshot, with tombstones never surfaced.
    pub fn begin(&self) -> Result<DbIterator> {
        let seq = self.shared.seq.load(Ordering::SeqCst);
        Ok(DbIterator::new(self.shared.get_sv().iter()?, seq))
    }

    /// An iterator positioned at the first live key ≥ `key`, under the same
    /// snapshot-isolation and dedup guarantees as [`Database::begin`].
    pub fn seek(&self, key: &[u8]) -> Result<DbIterator> {
        let sv = self.shared.get_sv();
        let seq = self.shared.seq.load(Ordering::SeqCst);
        Ok(DbIterator::new(sv.seek(key, seq)?, seq))
    }

    /// Seals the active memtable into the immutable queue (under back-
    /// pressure if the queue is already at `max_immutable_count`), and
    /// wakes the flush worker.
    fn switch_memtable(&self, force: bool) {
        let mut guard = self.shared.db_mutex.lock().unwrap();
        loop {
            let sv = self.shared.get_sv();
            if (sv.immutable_memtables.len() as u64) < self.shared.options.max_immutable_count {
                break;
            }
            drop(guard);
            thread::sleep(Duration::from_millis(100));
            guard = self.shared.db_mutex.lock().unwrap();
        }

        let sv = self.shared.get_sv();
        let should_switch = (force && !sv.active_memtable.is_empty())
            || sv.active_memtable.approx_size() as u64 > self.shared.options.write_buffer_size;
        if should_switch {
            let mut new_imms = Vec::with_capacity(sv.immutable_memtables.len() + 1);
            new_imms.push(Arc::clone(&sv.active_memtable));
            new_imms.extend(sv.immutable_memtables.iter().cloned());
            let new_sv = SuperVersion::new(Arc::new(Memtable::new()), new_imms, Arc::clone(&sv.version));
            self.shared.install_sv(new_sv);
            self.shared.flush_cv.notify_one();
        }
        drop(guard);
    }

    /// Forces the active memtable out and blocks until every memtable has
    /// been flushed to an SSTable.
    pub fn flush_all(&self) {
        self.switch_memtable(true);
        loop {
            let sv = self.shared.get_sv();
            if sv.active_memtable.is_empty() && sv.immutable_memtables.is_empty() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    /// Blocks until neither worker thread is mid-job.
    pub fn wait_for_flush_and_compaction(&self) {
        loop {
            if !self.shared.flush_flag.load(Ordering::SeqCst) && !self.shared.compact_flag.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    /// A human-readable snapshot of the current tree shape: sequence
    /// number and, per level, how many sorted runs and SSTables it holds.
    pub fn stats(&self) -> String {
        let sv = self.shared.get_sv();
        let mut out = format!("seq={}", self.shared.seq.load(Ordering::SeqCst));
        for level in &sv.version.levels {
            let sst_count: usize = level.runs.iter().map(|r| r.ssts.len()).sum();
            out.push_str(&format!(", L{}(runs={}, ssts={})", level.level_id, level.runs.len(), sst_count));
        }
        out
    }

    /// Drops every key in the database and removes the on-disk SSTables
    /// that back them. Safe to unlink immediately: every `SSTableReader`
    /// keeps its own open file handle, and POSIX semantics keep that
    /// handle valid after the directory entry is removed.
    pub fn drop_all(&self) -> Result<()> {
        self.wait_for_flush_and_compaction();
        let _guard = self.shared.db_mutex.lock().unwrap();
        let old_sv = self.shared.get_sv();
        let new_sv = SuperVersion::new(Arc::new(Memtable::new()), Vec::new(), Arc::new(Version::new()));
        self.shared.install_sv(new_sv);
        for level in &old_sv.version.levels {
            for run in &level.runs {
                for sst in &run.ssts {
                    let _ = fs::remove_file(sst.path());
                }
            }
        }
        Ok(())
    }

    /// Serializes the current version into the binary metadata file.
    fn save_metadata(&self) -> Result<()> {
        let sv = self.shared.get_sv();
        let mut levels = Vec::with_capacity(sv.version.levels.len());
        for level in &sv.version.levels {
            let mut runs = Vec::with_capacity(level.runs.len());
            for run in &level.runs {
                let mut ssts = Vec::with_capacity(run.ssts.len());
                for sst in &run.ssts {
                    let trailer = sst.trailer();
                    let filename = sst
                        .path()
                        .file_name()
                        .and_then(|n| n.to_str())
                        .ok_or_else(|| anyhow::anyhow!("sstable path has no filename: {}", sst.path().display()))?
                        .to_string();
                    ssts.push(SstRecord {
                        count: sst.record_count(),
                        size: sst.file_size(),
                        sst_id: manifest::sst_id_from_path(sst.path())?,
                        index_offset: trailer.index_offset,
                        bloom_filter_offset: trailer.bloom_filter_offset,
                        filename,
                    });
                }
                runs.push(ssts);
            }
            levels.push(LevelRecord { level_id: level.level_id as u64, runs });
        }
        let metadata = Metadata {
            current_seq: self.shared.seq.load(Ordering::SeqCst),
            next_file_id: self.shared.file_ids.current(),
            levels,
        };
        let metadata_path = self.shared.options.db_path.join(manifest::METADATA_FILENAME);
        metadata.save(&metadata_path)
    }
}

impl Drop for Database {
    /// Flushes everything to disk, stops the worker threads, and persists
    /// the metadata file — the engine's only persistence point, since there
    /// is no write-ahead log.
    fn drop(&mut self) {
        self.flush_all();
        self.wait_for_flush_and_compaction();
        self.shared.stop_signal.store(true, Ordering::SeqCst);
        self.shared.flush_cv.notify_all();
        self.shared.compact_cv.notify_all();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        if let Err(e) = self.save_metadata() {
            tracing::error!(error = %e, "failed to persist metadata on shutdown");
        }
    }
}

/// Wraps the raw merge heap into the snapshot-isolated view `Database`
/// actually promises callers: versions newer than the snapshot's `seq` are
/// skipped, only the first (newest within the snapshot) version of each
/// user key is surfaced, and tombstones never reach the caller. Grounded
/// on the original engine's `DBIterator::SeekToFirst/Seek/Next`.
pub struct DbIterator {
    inner: SuperVersionIterator,
    seq: u64,
    current_key: Option<Vec<u8>>,
}

impl DbIterator {
    fn new(inner: SuperVersionIterator, seq: u64) -> Self {
        let mut it = DbIterator { inner, seq, current_key: None };
        it.settle();
        it
    }

    /// Skips forward past anything newer than `seq` or that repeats the
    /// user key already surfaced, then drops a tombstone landed on (and
    /// retries) until the cursor rests on a live record or runs out.
    fn settle(&mut self) {
        loop {
            while self.inner.valid() {
                let key = self.inner.key();
                let over_ceiling = key.seq() > self.seq;
                let repeats_current = self.current_key.as_deref() == Some(key.user_key());
                if over_ceiling || repeats_current {
                    self.inner.next();
                } else {
                    break;
                }
            }
            if !self.inner.valid() {
                self.current_key = None;
                return;
            }
            self.current_key = Some(self.inner.key().user_key().to_vec());
            if self.inner.key().record_type() == RecordType::Deletion {
                self.inner.next();
                continue;
            }
            return;
        }
    }
}

impl KvIter for DbIterator {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn key(&self) -> &InternalKey {
        self.inner.key()
    }

    fn value(&self) -> &[u8] {
        self.inner.value()
    }

    fn next(&mut self) {
        self.inner.next();
        self.settle();
    }
}

#[cfg(test)]
#[path = "tests/db_tests.rs"]
mod tests;
