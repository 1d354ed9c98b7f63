use thiserror::Error;

/// Typed failure modes specific to reading and writing SSTable files.
/// Everything else (a missing file, a permission error) stays a plain
/// `std::io::Error` wrapped here rather than re-described.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt sstable: {0}")]
    Corrupt(String),
}
