//! Dedicated background thread that drains immutable memtables into new L0
//! sorted runs. Grounded on the original engine's `FlushThread`: park on
//! `flush_cv` until a memtable needs flushing, back off while L0 already
//! has too many runs for writers to keep landing on, then publish a fresh
//! `SuperVersion` once the new SSTables are on disk.

use crate::compaction_job;
use crate::db::Shared;
use crate::superversion::SuperVersion;
use crate::version::SortedRun;
use memtable::Memtable;
use sstable::SSTableReader;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) fn run(shared: Arc<Shared>) {
    loop {
        let mut guard = shared.db_mutex.lock().unwrap();
        if shared.stop_signal.load(Ordering::SeqCst) {
            shared.flush_flag.store(false, Ordering::SeqCst);
            return;
        }

        loop {
            let sv = shared.get_sv();
            let l0_runs = sv.version.level(0).map_or(0, |l| l.run_count() as u64);
            if l0_runs < shared.options.level0_stop_writes_trigger {
                break;
            }
            drop(guard);
            std::thread::sleep(Duration::from_millis(100));
            guard = shared.db_mutex.lock().unwrap();
            if shared.stop_signal.load(Ordering::SeqCst) {
                shared.flush_flag.store(false, Ordering::SeqCst);
                return;
            }
        }

        let sv = shared.get_sv();
        let imms: Vec<Arc<Memtable>> =
            sv.immutable_memtables.iter().filter(|imm| !imm.flush_in_progress()).cloned().collect();

        if imms.is_empty() {
            shared.flush_flag.store(false, Ordering::SeqCst);
            let (_guard, _timeout) =
                shared.flush_cv.wait_timeout(guard, Duration::from_millis(200)).unwrap();
            continue;
        }

        for imm in &imms {
            imm.set_flush_in_progress();
        }
        shared.flush_flag.store(true, Ordering::SeqCst);
        drop(guard);

        let mut new_runs = Vec::new();
        for imm in &imms {
            match compaction_job::run(
                imm.begin(),
                &shared.options.db_path,
                &shared.file_ids,
                shared.options.block_size as usize,
                shared.options.bloom_bits_per_key,
                shared.options.sst_file_size,
                false,
            ) {
                Ok(outputs) if !outputs.is_empty() => match outputs
                    .into_iter()
                    .map(|out| SSTableReader::open(&out.meta.path).map(Arc::new))
                    .collect::<anyhow::Result<Vec<_>>>()
                {
                    Ok(ssts) => new_runs.push(Arc::new(SortedRun::new(ssts))),
                    Err(e) => {
                        error!(error = %e, "failed to reopen a freshly flushed sstable, aborting");
                        std::process::abort();
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "flush job failed, aborting: a memtable that can't reach disk must not be dropped silently");
                    std::process::abort();
                }
            }
        }

        let guard = shared.db_mutex.lock().unwrap();
        for imm in &imms {
            imm.set_flush_complete();
        }
        let sv = shared.get_sv();
        let remaining: Vec<Arc<Memtable>> =
            sv.immutable_memtables.iter().filter(|imm| !imm.flush_complete()).cloned().collect();
        let mut new_version = (*sv.version).clone();
        new_version.append(0, new_runs);
        let new_sv = SuperVersion::new(Arc::clone(&sv.active_memtable), remaining, Arc::new(new_version));
        shared.install_sv(new_sv);
        info!(flushed = imms.len(), "flush complete, new L0 run installed");
        shared.compact_cv.notify_one();
        drop(guard);
    }
}
