//! The three-way outcome of a point lookup against one storage layer.

/// Outcome of searching one layer (a memtable, an SSTable, a level) for a
/// user key at a given snapshot sequence.
///
/// `NotFound` means "keep looking in the next, older layer" — it is the
/// only outcome that does not terminate the search. `Found` and `Deleted`
/// both terminate it: a tombstone is a definite negative, not a signal to
/// fall through to an older, shadowed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResult {
    Found(Vec<u8>),
    Deleted,
    NotFound,
}

impl GetResult {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GetResult::NotFound)
    }

    /// Collapses the result to the public `Option<Vec<u8>>` surface exposed
    /// by `Database::get` — `Deleted` and `NotFound` are indistinguishable
    /// to a caller outside the storage core.
    pub fn into_option(self) -> Option<Vec<u8>> {
        match self {
            GetResult::Found(v) => Some(v),
            GetResult::Deleted | GetResult::NotFound => None,
        }
    }
}
