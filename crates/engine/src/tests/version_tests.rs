use super::*;
use format::GetResult;
use memtable::Memtable;
use sstable::{SSTableBuilder, SSTableReader};
use std::sync::Arc;
use tempfile::tempdir;

fn write_sst(dir: &std::path::Path, name: &str, entries: &[(&[u8], u64, &[u8])]) -> Arc<SSTableReader> {
    let mem = Memtable::new();
    for (k, seq, v) in entries {
        mem.put(k, *seq, v.to_vec());
    }
    let path = dir.join(name);
    SSTableBuilder::new(4096, 10).build(&path, mem.begin()).unwrap();
    Arc::new(SSTableReader::open(&path).unwrap())
}

#[test]
fn sorted_run_binary_searches_to_the_right_sstable() {
    let dir = tempdir().unwrap();
    let a = write_sst(dir.path(), "a.sst", &[(b"a", 1, b"1"), (b"b", 1, b"2")]);
    let b = write_sst(dir.path(), "b.sst", &[(b"m", 1, b"3"), (b"n", 1, b"4")]);
    let run = SortedRun::new(vec![a, b]);

    assert_eq!(run.get(b"a", 10).unwrap(), GetResult::Found(b"1".to_vec()));
    assert_eq!(run.get(b"n", 10).unwrap(), GetResult::Found(b"4".to_vec()));
    assert_eq!(run.get(b"zzz", 10).unwrap(), GetResult::NotFound);
}

#[test]
fn level_prefers_the_most_recently_appended_run() {
    let dir = tempdir().unwrap();
    let old_run = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "old.sst", &[(b"k", 1, b"old")])]));
    let new_run = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "new.sst", &[(b"k", 2, b"new")])]));

    let mut level = Level::new(0);
    level.append(old_run);
    level.append(new_run);

    assert_eq!(level.get(b"k", 10).unwrap(), GetResult::Found(b"new".to_vec()));
}

#[test]
fn version_walks_levels_in_order() {
    let dir = tempdir().unwrap();
    let l0_run = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "l0.sst", &[(b"k", 2, b"l0")])]));
    let l1_run = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "l1.sst", &[(b"k", 1, b"l1"), (b"other", 1, b"v")])]));

    let mut version = Version::new();
    version.append(0, vec![l0_run]);
    version.append(1, vec![l1_run]);

    assert_eq!(version.get(b"k", 10).unwrap(), GetResult::Found(b"l0".to_vec()), "L0 shadows deeper levels");
    assert_eq!(version.get(b"other", 10).unwrap(), GetResult::Found(b"v".to_vec()));
    assert_eq!(version.get(b"missing", 10).unwrap(), GetResult::NotFound);
}

#[test]
fn append_grows_intermediate_levels_lazily() {
    let mut version = Version::new();
    version.append(2, Vec::<Arc<SortedRun>>::new());
    assert_eq!(version.levels.len(), 3);
    assert_eq!(version.levels[0].level_id, 0);
    assert_eq!(version.levels[2].level_id, 2);
}

#[test]
fn replace_level_swaps_runs_wholesale() {
    let dir = tempdir().unwrap();
    let run_a = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "a.sst", &[(b"k", 1, b"a")])]));
    let run_b = Arc::new(SortedRun::new(vec![write_sst(dir.path(), "b.sst", &[(b"k", 2, b"b")])]));

    let mut version = Version::new();
    version.append(0, vec![run_a]);
    version.replace_level(0, vec![run_b]);

    assert_eq!(version.level(0).unwrap().run_count(), 1);
    assert_eq!(version.get(b"k", 10).unwrap(), GetResult::Found(b"b".to_vec()));
}

#[test]
fn byte_size_sums_real_file_sizes() {
    let dir = tempdir().unwrap();
    let sst = write_sst(dir.path(), "sized.sst", &[(b"k", 1, b"value")]);
    let expected = sst.file_size();
    let run = SortedRun::new(vec![sst]);
    assert_eq!(run.byte_size(), expected);
}
