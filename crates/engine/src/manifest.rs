//! Binary metadata file: the sole persistence mechanism across restarts.
//!
//! There is no write-ahead log here — the engine only ever persists state
//! on a clean shutdown (`Drop for Database`), and reads the file back once
//! at `Database::open`. Layout:
//!
//! ```text
//! [current_seq: u64][next_file_id: u64][num_levels: u64]
//! for each level:
//!   [level_id: u64][num_runs: u64]
//!   for each run:
//!     [num_ssts: u64]
//!     for each sst:
//!       [count:u64][size:u64][sst_id:u64][index_offset:u64]
//!       [bloom_filter_offset:u64][filename_len:u64][filename bytes]
//! ```
//!
//! A missing file means a fresh database — `load` returns `Ok(None)` rather
//! than an error.

use anyhow::Result;
use format::{read_bytes, read_u64, write_bytes, write_u64};
use std::fs::{rename, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Name of the metadata file within the database directory.
pub const METADATA_FILENAME: &str = "METADATA";

#[derive(Debug, Clone)]
pub struct SstRecord {
    pub count: u64,
    pub size: u64,
    pub sst_id: u64,
    pub index_offset: u64,
    pub bloom_filter_offset: u64,
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct LevelRecord {
    pub level_id: u64,
    /// One inner `Vec` per sorted run.
    pub runs: Vec<Vec<SstRecord>>,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub current_seq: u64,
    pub next_file_id: u64,
    pub levels: Vec<LevelRecord>,
}

impl Metadata {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u64(w, self.current_seq)?;
        write_u64(w, self.next_file_id)?;
        write_u64(w, self.levels.len() as u64)?;
        for level in &self.levels {
            write_u64(w, level.level_id)?;
            write_u64(w, level.runs.len() as u64)?;
            for run in &level.runs {
                write_u64(w, run.len() as u64)?;
                for sst in run {
                    write_u64(w, sst.count)?;
                    write_u64(w, sst.size)?;
                    write_u64(w, sst.sst_id)?;
                    write_u64(w, sst.index_offset)?;
                    write_u64(w, sst.bloom_filter_offset)?;
                    write_bytes(w, sst.filename.as_bytes())?;
                }
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let current_seq = read_u64(r)?;
        let next_file_id = read_u64(r)?;
        let num_levels = read_u64(r)?;
        let mut levels = Vec::with_capacity(num_levels as usize);
        for _ in 0..num_levels {
            let level_id = read_u64(r)?;
            let num_runs = read_u64(r)?;
            let mut runs = Vec::with_capacity(num_runs as usize);
            for _ in 0..num_runs {
                let num_ssts = read_u64(r)?;
                let mut ssts = Vec::with_capacity(num_ssts as usize);
                for _ in 0..num_ssts {
                    let count = read_u64(r)?;
                    let size = read_u64(r)?;
                    let sst_id = read_u64(r)?;
                    let index_offset = read_u64(r)?;
                    let bloom_filter_offset = read_u64(r)?;
                    let filename = String::from_utf8(read_bytes(r)?)
                        .map_err(|e| anyhow::anyhow!("metadata file has a non-utf8 filename: {e}"))?;
                    ssts.push(SstRecord { count, size, sst_id, index_offset, bloom_filter_offset, filename });
                }
                runs.push(ssts);
            }
            levels.push(LevelRecord { level_id, runs });
        }
        Ok(Metadata { current_seq, next_file_id, levels })
    }

    /// Writes the metadata file atomically: temp file, fsync, rename,
    /// fsync parent directory — the same crash-safety idiom `sstable`
    /// already uses for SSTable writes.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        {
            let f = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
            let mut w = BufWriter::new(f);
            self.write_to(&mut w)?;
            w.flush()?;
            w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        rename(&tmp_path, path)?;
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Returns `Ok(None)` if no metadata file exists yet (fresh database).
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let f = File::open(path)?;
        let mut r = BufReader::new(f);
        Ok(Some(Self::read_from(&mut r)?))
    }
}

/// Parses the `u64` id out of an SSTable filename of the form
/// `{:020}.sst`, as produced by `compaction_job::flush_chunk`.
pub fn sst_id_from_path(path: &Path) -> Result<u64> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("sstable path has no utf8 stem: {}", path.display()))?;
    stem.parse::<u64>()
        .map_err(|e| anyhow::anyhow!("sstable filename {:?} is not a numeric id: {e}", stem))
}

#[cfg(test)]
#[path = "tests/manifest_tests.rs"]
mod tests;
