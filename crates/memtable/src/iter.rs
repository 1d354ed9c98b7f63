use format::{InternalKey, KvIter};

/// A snapshot iterator over a memtable's entries at the time [`Memtable::begin`](crate::Memtable::begin)
/// was called.
///
/// Backed by an owned `Vec` rather than a live cursor into the map: the
/// memtable may keep accepting writes from other threads while this
/// iterator is alive, and the snapshot contract requires those writes stay
/// invisible to it.
pub struct MemtableIter {
    items: Vec<(InternalKey, Vec<u8>)>,
    pos: usize,
}

impl MemtableIter {
    pub(crate) fn new(items: Vec<(InternalKey, Vec<u8>)>) -> Self {
        MemtableIter { items, pos: 0 }
    }

    pub fn seek_to_first(&mut self) {
        self.pos = 0;
    }

    /// Advances to the first entry with internal key ≥ `(user_key, seq, Value)`.
    pub fn seek(&mut self, user_key: &[u8], seq: u64) {
        let target = format::ParsedKey::new(user_key, seq, format::RecordType::Value);
        self.pos = self
            .items
            .partition_point(|(k, _)| k.as_parsed() < target);
    }
}

impl KvIter for MemtableIter {
    fn valid(&self) -> bool {
        self.pos < self.items.len()
    }

    fn key(&self) -> &InternalKey {
        &self.items[self.pos].0
    }

    fn value(&self) -> &[u8] {
        &self.items[self.pos].1
    }

    fn next(&mut self) {
        self.pos += 1;
    }
}
