//! Dedicated background thread that runs one [`Compaction`] job at a time,
//! chosen by the configured [`CompactionPicker`]. Grounded on the original
//! engine's `CompactionThread`: park on `compact_cv` until the picker finds
//! work, merge the inputs (unless it's a trivial move), then install a new
//! `Version` with the source level's consumed inputs removed and the merged
//! output installed at the target level.

use crate::compaction_job;
use crate::compaction_picker::Compaction;
use crate::db::Shared;
use crate::superversion::SuperVersion;
use crate::version::SortedRun;
use anyhow::Result;
use sstable::{SSTableCursor, SSTableReader};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) fn run(shared: Arc<Shared>) {
    let Some(picker) = shared.picker.as_ref() else {
        return;
    };

    loop {
        let guard = shared.db_mutex.lock().unwrap();
        if shared.stop_signal.load(Ordering::SeqCst) {
            shared.compact_flag.store(false, Ordering::SeqCst);
            return;
        }

        let sv = shared.get_sv();
        let Some(compaction) = picker.pick(&sv.version, &shared.options) else {
            shared.compact_flag.store(false, Ordering::SeqCst);
            let (_guard, _timeout) =
                shared.compact_cv.wait_timeout(guard, Duration::from_millis(200)).unwrap();
            continue;
        };
        shared.compact_flag.store(true, Ordering::SeqCst);
        drop(guard);

        if let Err(e) = run_one(&shared, compaction) {
            error!(error = %e, "compaction job failed, aborting: an on-disk tree this worker cannot trust is worse than no tree");
            std::process::abort();
        }
    }
}

fn run_one(shared: &Shared, compaction: Compaction) -> Result<()> {
    let levels_before = shared.get_sv().version.levels.len();
    let is_bottom_level = compaction.target_level + 1 >= levels_before;

    let output_ssts: Vec<Arc<SSTableReader>> = if compaction.trivial_move {
        compaction.all_inputs()
    } else {
        let mut heap = format::IteratorHeap::new();
        for sst in compaction.all_inputs() {
            heap.push(SSTableCursor::new(sst)?);
        }
        let outputs = compaction_job::run(
            heap,
            &shared.options.db_path,
            &shared.file_ids,
            shared.options.block_size as usize,
            shared.options.bloom_bits_per_key,
            shared.options.sst_file_size,
            is_bottom_level,
        )?;
        outputs
            .into_iter()
            .map(|o| SSTableReader::open(&o.meta.path).map(Arc::new))
            .collect::<Result<Vec<_>>>()?
    };

    let guard = shared.db_mutex.lock().unwrap();
    let current = shared.get_sv();
    let mut new_version = (*current.version).clone();

    let consumed: Vec<Arc<SSTableReader>> = compaction
        .input_runs
        .iter()
        .flat_map(|r| r.ssts.iter().cloned())
        .chain(compaction.input_ssts.iter().cloned())
        .collect();
    if let Some(src) = new_version.levels.get(compaction.source_level).cloned() {
        let remaining_runs: Vec<Arc<SortedRun>> = src
            .runs
            .iter()
            .filter_map(|run| {
                let kept: Vec<Arc<SSTableReader>> = run
                    .ssts
                    .iter()
                    .filter(|s| !consumed.iter().any(|c| Arc::ptr_eq(c, s)))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Arc::new(SortedRun::new(kept)))
                }
            })
            .collect();
        new_version.replace_level(compaction.source_level, remaining_runs);
    }

    let mut target_ssts: Vec<Arc<SSTableReader>> = new_version
        .levels
        .get(compaction.target_level)
        .map(|l| l.runs.iter().flat_map(|r| r.ssts.iter().cloned()).collect())
        .unwrap_or_default();
    target_ssts.retain(|s| !compaction.target_ssts.iter().any(|c| Arc::ptr_eq(c, s)));
    target_ssts.extend(output_ssts);
    target_ssts.sort_by(|a, b| a.smallest_key().as_parsed().cmp(&b.smallest_key().as_parsed()));
    new_version.replace_level(compaction.target_level, vec![Arc::new(SortedRun::new(target_ssts))]);

    let new_sv = SuperVersion::new(
        Arc::clone(&current.active_memtable),
        current.immutable_memtables.clone(),
        Arc::new(new_version),
    );
    shared.install_sv(new_sv);
    info!(
        strategy = compaction.strategy_tag,
        source_level = compaction.source_level,
        target_level = compaction.target_level,
        trivial_move = compaction.trivial_move,
        "compaction complete"
    );
    drop(guard);
    Ok(())
}
