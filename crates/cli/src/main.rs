//! # CLI - RiptideKV Interactive Shell
//!
//! A REPL-style command-line interface for the RiptideKV storage engine.
//! Reads commands from stdin, executes them against the engine, and prints
//! results to stdout. Designed for both interactive use and scripted testing
//! (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! SCAN [start] [end] Range scan (inclusive start, exclusive end)
//! FLUSH              Force-flush every memtable to an SSTable
//! STATS              Print a snapshot of the current tree shape
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via `RIPTIDE_*` environment variables, layered
//! on top of `config::Options::default()` — see `config::Options::from_env`
//! for the full list. Logging is controlled the usual `tracing_subscriber`
//! way via `RUST_LOG` (default: `info`).
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! RiptideKV started (seq=0, db_path=data, strategy=leveled)
//! > SET name Alice
//! OK
//! > GET name
//! Alice
//! > SCAN
//! name -> Alice
//! (1 entries)
//! > EXIT
//! bye
//! ```
use anyhow::Result;
use engine::Database;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = config::Options::from_env()?;
    let db_path = options.db_path.display().to_string();
    let strategy = options.compaction_strategy_name.as_str();
    let db = Database::open(options)?;

    println!("RiptideKV started (db_path={}, strategy={})", db_path, strategy);
    println!("Commands: SET key value | GET key | DEL key | SCAN [start] [end]");
    println!("          FLUSH | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: SET key value");
                        } else {
                            match db.put(k.as_bytes(), v.as_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR set failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: SET key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match db.get(k.as_bytes()) {
                            Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match db.delete(k.as_bytes()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "SCAN" => {
                    let start = parts.next().unwrap_or("");
                    let end = parts.next().map(|s| s.as_bytes().to_vec());
                    match scan(&db, start.as_bytes(), end.as_deref()) {
                        Ok(results) => {
                            if results.is_empty() {
                                println!("(empty)");
                            } else {
                                for (k, v) in &results {
                                    println!("{} -> {}", String::from_utf8_lossy(k), String::from_utf8_lossy(v));
                                }
                                println!("({} entries)", results.len());
                            }
                        }
                        Err(e) => println!("ERR scan failed: {}", e),
                    }
                }
                "FLUSH" => {
                    db.flush_all();
                    db.wait_for_flush_and_compaction();
                    println!("OK ({})", db.stats());
                }
                "STATS" => {
                    println!("{}", db.stats());
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}

/// Collects every live key in `[start, end)` (an empty `end` means
/// unbounded) by walking `Database::seek`'s already-deduped,
/// tombstone-free, snapshot-isolated iterator from `start`.
fn scan(db: &Database, start: &[u8], end: Option<&[u8]>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    use format::KvIter;

    let mut it = db.seek(start)?;
    let mut results = Vec::new();
    while it.valid() {
        let key = it.key().user_key().to_vec();
        if let Some(end) = end {
            if !end.is_empty() && key.as_slice() >= end {
                break;
            }
        }
        results.push((key, it.value().to_vec()));
        it.next();
    }
    Ok(results)
}
