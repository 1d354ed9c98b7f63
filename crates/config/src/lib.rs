//! Engine configuration: the enumerated knobs controlling storage layout,
//! flush/compaction thresholds, and which compaction strategy runs.
//!
//! `Options` is plain data — no I/O happens here. `from_env()` layers
//! environment variables on top of `Default::default()`, and `validate()`
//! rejects combinations the engine cannot start with (an unsupported
//! compaction strategy, a zero-valued size threshold).

use std::path::PathBuf;
use thiserror::Error;

/// Which compaction picker the engine installs at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStrategy {
    Leveled,
    Tiered,
    LazyLeveling,
    Fluid,
}

impl CompactionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompactionStrategy::Leveled => "leveled",
            CompactionStrategy::Tiered => "tiered",
            CompactionStrategy::LazyLeveling => "lazyleveling",
            CompactionStrategy::Fluid => "fluid",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "leveled" => Ok(CompactionStrategy::Leveled),
            "tiered" => Ok(CompactionStrategy::Tiered),
            "lazyleveling" => Ok(CompactionStrategy::LazyLeveling),
            "fluid" => Ok(CompactionStrategy::Fluid),
            other => Err(ConfigError::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl Default for CompactionStrategy {
    fn default() -> Self {
        CompactionStrategy::Leveled
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported compaction strategy: {0:?} (engine refuses to start in tiered mode)")]
    UnsupportedStrategy(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// All tunables the engine reads at startup. See §6 of the design for the
/// exact field list this mirrors.
#[derive(Debug, Clone)]
pub struct Options {
    pub create_new: bool,
    pub db_path: PathBuf,
    pub block_size: u64,
    pub sst_file_size: u64,
    pub write_buffer_size: u64,
    pub bloom_bits_per_key: u64,
    pub compaction_size_ratio: f64,
    pub level0_compaction_trigger: u64,
    pub level0_stop_writes_trigger: u64,
    pub max_immutable_count: u64,
    pub compaction_strategy_name: CompactionStrategy,
    pub use_direct_io: bool,
    /// Fluid-strategy-only: target run-count alpha for intermediate levels.
    pub target_alpha_part3: u64,
    /// Fluid-strategy-only: target scan length used alongside `target_alpha_part3`.
    pub target_scan_length_part3: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            create_new: true,
            db_path: PathBuf::from("data"),
            block_size: 4096,
            sst_file_size: 4 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            bloom_bits_per_key: 10,
            compaction_size_ratio: 10.0,
            level0_compaction_trigger: 4,
            level0_stop_writes_trigger: 12,
            max_immutable_count: 4,
            compaction_strategy_name: CompactionStrategy::Leveled,
            use_direct_io: false,
            target_alpha_part3: 2,
            target_scan_length_part3: 2,
        }
    }
}

impl Options {
    /// Checks invariants the engine relies on at startup. Called once from
    /// `engine::Database::open`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compaction_strategy_name == CompactionStrategy::Tiered {
            return Err(ConfigError::UnsupportedStrategy("tiered".to_string()));
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidValue { field: "block_size", reason: "must be > 0".to_string() });
        }
        if self.sst_file_size == 0 {
            return Err(ConfigError::InvalidValue { field: "sst_file_size", reason: "must be > 0".to_string() });
        }
        if self.write_buffer_size == 0 {
            return Err(ConfigError::InvalidValue { field: "write_buffer_size", reason: "must be > 0".to_string() });
        }
        if self.bloom_bits_per_key == 0 {
            return Err(ConfigError::InvalidValue { field: "bloom_bits_per_key", reason: "must be > 0".to_string() });
        }
        if self.level0_stop_writes_trigger < self.level0_compaction_trigger {
            return Err(ConfigError::InvalidValue {
                field: "level0_stop_writes_trigger",
                reason: "must be >= level0_compaction_trigger".to_string(),
            });
        }
        Ok(())
    }

    /// Layers `RIPTIDE_*` environment variables on top of the defaults,
    /// following the naming convention the CLI already used for its own
    /// ad hoc settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut opts = Options::default();

        if let Ok(v) = std::env::var("RIPTIDE_DB_PATH") {
            opts.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RIPTIDE_BLOCK_SIZE") {
            opts.block_size = parse_env("RIPTIDE_BLOCK_SIZE", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_SST_FILE_SIZE") {
            opts.sst_file_size = parse_env("RIPTIDE_SST_FILE_SIZE", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_WRITE_BUFFER_SIZE") {
            opts.write_buffer_size = parse_env("RIPTIDE_WRITE_BUFFER_SIZE", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_BLOOM_BITS_PER_KEY") {
            opts.bloom_bits_per_key = parse_env("RIPTIDE_BLOOM_BITS_PER_KEY", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_COMPACTION_SIZE_RATIO") {
            opts.compaction_size_ratio = v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "compaction_size_ratio",
                reason: format!("{v:?} is not a valid f64"),
            })?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_LEVEL0_COMPACTION_TRIGGER") {
            opts.level0_compaction_trigger = parse_env("RIPTIDE_LEVEL0_COMPACTION_TRIGGER", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_LEVEL0_STOP_WRITES_TRIGGER") {
            opts.level0_stop_writes_trigger = parse_env("RIPTIDE_LEVEL0_STOP_WRITES_TRIGGER", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_MAX_IMMUTABLE_COUNT") {
            opts.max_immutable_count = parse_env("RIPTIDE_MAX_IMMUTABLE_COUNT", &v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_COMPACTION_STRATEGY") {
            opts.compaction_strategy_name = CompactionStrategy::parse(&v)?;
        }
        if let Ok(v) = std::env::var("RIPTIDE_USE_DIRECT_IO") {
            opts.use_direct_io = v.parse().unwrap_or(false);
        }

        Ok(opts)
    }
}

fn parse_env(field: &'static str, v: &str) -> Result<u64, ConfigError> {
    v.parse()
        .map_err(|_| ConfigError::InvalidValue { field, reason: format!("{v:?} is not a valid u64") })
}

#[cfg(test)]
mod tests;
