use super::*;

#[test]
fn put_then_get_returns_value() {
    let mem = Memtable::new();
    mem.put(b"hello", 1, b"world".to_vec());
    assert_eq!(mem.get(b"hello", 1), GetResult::Found(b"world".to_vec()));
}

#[test]
fn missing_key_is_not_found() {
    let mem = Memtable::new();
    assert_eq!(mem.get(b"nope", 1), GetResult::NotFound);
}

#[test]
fn del_masks_prior_put_at_later_snapshot() {
    let mem = Memtable::new();
    mem.put(b"k", 1, b"v1".to_vec());
    mem.del(b"k", 2);
    assert_eq!(mem.get(b"k", 2), GetResult::Deleted);
}

#[test]
fn older_snapshot_unaffected_by_later_write() {
    let mem = Memtable::new();
    mem.put(b"k", 1, b"v1".to_vec());
    mem.del(b"k", 2);
    assert_eq!(mem.get(b"k", 1), GetResult::Found(b"v1".to_vec()), "seq=1 snapshot must not see the seq=2 tombstone");
}

#[test]
fn multiple_versions_resolve_to_highest_seq_at_or_below_snapshot() {
    let mem = Memtable::new();
    mem.put(b"k", 1, b"v1".to_vec());
    mem.put(b"k", 5, b"v5".to_vec());
    mem.put(b"k", 9, b"v9".to_vec());
    assert_eq!(mem.get(b"k", 5), GetResult::Found(b"v5".to_vec()));
    assert_eq!(mem.get(b"k", 6), GetResult::Found(b"v5".to_vec()));
    assert_eq!(mem.get(b"k", 100), GetResult::Found(b"v9".to_vec()));
    assert_eq!(mem.get(b"k", 0), GetResult::NotFound);
}

#[test]
fn begin_yields_ascending_internal_key_order() {
    let mem = Memtable::new();
    mem.put(b"c", 1, b"3".to_vec());
    mem.put(b"a", 1, b"1".to_vec());
    mem.put(b"b", 1, b"2".to_vec());

    let mut it = mem.begin();
    let mut seen = Vec::new();
    while it.valid() {
        seen.push((it.key().user_key().to_vec(), it.value().to_vec()));
        it.next();
    }
    assert_eq!(seen, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec()), (b"c".to_vec(), b"3".to_vec())]);
}

#[test]
fn begin_does_not_see_writes_after_snapshot() {
    let mem = Memtable::new();
    mem.put(b"a", 1, b"1".to_vec());
    let mut it = mem.begin();
    mem.put(b"b", 1, b"2".to_vec());
    let mut count = 0;
    while it.valid() {
        count += 1;
        it.next();
    }
    assert_eq!(count, 1, "snapshot must not observe the later write");
}

#[test]
fn approx_size_grows_with_each_insert() {
    let mem = Memtable::new();
    assert_eq!(mem.approx_size(), 0);
    mem.put(b"k", 1, b"value".to_vec());
    assert!(mem.approx_size() > 0);
    let after_one = mem.approx_size();
    mem.put(b"k2", 2, b"value2".to_vec());
    assert!(mem.approx_size() > after_one);
}

#[test]
fn len_counts_tombstones() {
    let mem = Memtable::new();
    mem.put(b"a", 1, b"x".to_vec());
    mem.del(b"a", 2);
    assert_eq!(mem.len(), 2, "two distinct internal keys: Value@1 and Deletion@2");
}

#[test]
fn flush_flags_default_false_and_are_settable() {
    let mem = Memtable::new();
    assert!(!mem.flush_in_progress());
    assert!(!mem.flush_complete());
    mem.set_flush_in_progress();
    assert!(mem.flush_in_progress());
    mem.set_flush_complete();
    assert!(mem.flush_complete());
}

#[test]
fn seek_positions_at_first_key_at_or_after_target() {
    let mem = Memtable::new();
    mem.put(b"a", 1, b"1".to_vec());
    mem.put(b"b", 5, b"2".to_vec());
    mem.put(b"c", 1, b"3".to_vec());

    let mut it = mem.begin();
    it.seek(b"b", 10);
    assert!(it.valid());
    assert_eq!(it.key().user_key(), b"b");
}
