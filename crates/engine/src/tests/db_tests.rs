use super::*;
use config::Options;
use format::KvIter;
use tempfile::tempdir;

fn options_at(dir: &std::path::Path) -> Options {
    Options { db_path: dir.to_path_buf(), write_buffer_size: 64 * 1024, ..Options::default() }
}

#[test]
fn put_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"k", b"v").unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn delete_shadows_an_earlier_put() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"k", b"v").unwrap();
    db.delete(b"k").unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
}

#[test]
fn missing_key_reads_as_none() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    assert_eq!(db.get(b"nope").unwrap(), None);
}

#[test]
fn flush_all_moves_data_out_of_memtables_and_into_an_sstable() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    for i in 0..50u32 {
        db.put(format!("k{:04}", i).as_bytes(), b"value").unwrap();
    }
    db.flush_all();
    db.wait_for_flush_and_compaction();

    // The data is still visible after flushing out of the memtables.
    assert_eq!(db.get(b"k0000").unwrap(), Some(b"value".to_vec()));

    let sst_files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "sst"))
        .collect();
    assert!(!sst_files.is_empty(), "flush should have produced at least one sstable on disk");
}

#[test]
fn begin_iterates_every_live_key_in_order() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"b", b"2").unwrap();
    db.put(b"a", b"1").unwrap();
    db.put(b"c", b"3").unwrap();

    let mut it = db.begin().unwrap();
    let mut keys = Vec::new();
    while it.valid() {
        keys.push(it.key().user_key().to_vec());
        it.next();
    }
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn begin_dedups_overwrites_and_drops_tombstones() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"a", b"1").unwrap();
    db.put(b"b", b"1").unwrap();
    db.put(b"b", b"2").unwrap(); // overwrite: only "2" should surface
    db.put(b"c", b"1").unwrap();
    db.delete(b"c").unwrap(); // tombstoned: "c" should never surface

    let mut it = db.begin().unwrap();
    let mut seen = Vec::new();
    while it.valid() {
        seen.push((it.key().user_key().to_vec(), it.value().to_vec()));
        it.next();
    }
    assert_eq!(seen, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
}

#[test]
fn begin_never_observes_a_key_written_after_the_snapshot_was_taken() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"a", b"1").unwrap();

    let it = db.begin().unwrap();
    db.put(b"z", b"late").unwrap();

    let mut keys = Vec::new();
    let mut it = it;
    while it.valid() {
        keys.push(it.key().user_key().to_vec());
        it.next();
    }
    assert_eq!(keys, vec![b"a".to_vec()]);
}

#[test]
fn drop_all_clears_every_key() {
    let dir = tempdir().unwrap();
    let db = Database::open(options_at(dir.path())).unwrap();
    db.put(b"k", b"v").unwrap();
    db.flush_all();
    db.wait_for_flush_and_compaction();

    db.drop_all().unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
}

#[test]
fn metadata_survives_a_reopen() {
    let dir = tempdir().unwrap();
    {
        let db = Database::open(options_at(dir.path())).unwrap();
        db.put(b"persisted", b"value").unwrap();
        db.flush_all();
        db.wait_for_flush_and_compaction();
    } // Drop persists the metadata file here.

    let db = Database::open(options_at(dir.path())).unwrap();
    assert_eq!(db.get(b"persisted").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn open_rejects_a_tiered_strategy() {
    let dir = tempdir().unwrap();
    let options = Options {
        db_path: dir.path().to_path_buf(),
        compaction_strategy_name: config::CompactionStrategy::Tiered,
        ..Options::default()
    };
    assert!(Database::open(options).is_err());
}
