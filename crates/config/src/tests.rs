use super::*;

#[test]
fn defaults_validate_cleanly() {
    let opts = Options::default();
    assert!(opts.validate().is_ok());
}

#[test]
fn tiered_strategy_is_rejected() {
    let mut opts = Options::default();
    opts.compaction_strategy_name = CompactionStrategy::Tiered;
    match opts.validate() {
        Err(ConfigError::UnsupportedStrategy(s)) => assert_eq!(s, "tiered"),
        other => panic!("expected UnsupportedStrategy, got {other:?}"),
    }
}

#[test]
fn zero_valued_size_thresholds_are_rejected() {
    for field in ["block_size", "sst_file_size", "write_buffer_size", "bloom_bits_per_key"] {
        let mut opts = Options::default();
        match field {
            "block_size" => opts.block_size = 0,
            "sst_file_size" => opts.sst_file_size = 0,
            "write_buffer_size" => opts.write_buffer_size = 0,
            "bloom_bits_per_key" => opts.bloom_bits_per_key = 0,
            _ => unreachable!(),
        }
        assert!(opts.validate().is_err(), "{field} = 0 should fail validation");
    }
}

#[test]
fn stop_writes_trigger_below_compaction_trigger_is_rejected() {
    let mut opts = Options::default();
    opts.level0_compaction_trigger = 8;
    opts.level0_stop_writes_trigger = 4;
    assert!(opts.validate().is_err());
}

#[test]
fn strategy_parse_round_trips_through_as_str() {
    for s in ["leveled", "tiered", "lazyleveling", "fluid"] {
        let parsed = CompactionStrategy::parse(s).unwrap();
        assert_eq!(parsed.as_str(), s);
    }
    assert!(CompactionStrategy::parse("bogus").is_err());
}

#[test]
fn from_env_layers_over_defaults() {
    std::env::set_var("RIPTIDE_BLOCK_SIZE", "8192");
    std::env::set_var("RIPTIDE_COMPACTION_STRATEGY", "lazyleveling");
    let opts = Options::from_env().unwrap();
    assert_eq!(opts.block_size, 8192);
    assert_eq!(opts.compaction_strategy_name, CompactionStrategy::LazyLeveling);
    // Untouched fields keep their defaults.
    assert_eq!(opts.bloom_bits_per_key, 10);
    std::env::remove_var("RIPTIDE_BLOCK_SIZE");
    std::env::remove_var("RIPTIDE_COMPACTION_STRATEGY");
}

#[test]
fn from_env_rejects_a_malformed_numeric_value() {
    std::env::set_var("RIPTIDE_BLOCK_SIZE", "not-a-number");
    assert!(Options::from_env().is_err());
    std::env::remove_var("RIPTIDE_BLOCK_SIZE");
}
