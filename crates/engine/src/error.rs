use thiserror::Error;

/// Typed errors originating inside the engine crate itself. Sstable and I/O
/// failures are propagated as `anyhow::Error` at the public boundary
/// (`Database`'s methods all return `anyhow::Result`); this enum covers the
/// few failure modes that are specific to version/metadata bookkeeping and
/// worth matching on.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(#[from] config::ConfigError),

    #[error(transparent)]
    Sstable(#[from] sstable::Error),

    #[error("metadata file corrupt: {0}")]
    Corrupt(String),
}
