//! # CLI - caskstore Interactive Shell
//!
//! A REPL-style command-line interface for the caskstore engine. Reads
//! commands from stdin, executes them against a read-write datastore, and
//! prints results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value   Store a key-value pair
//! GET key         Look up a key (prints value or "(nil)")
//! DEL key         Delete a key (appends a tombstone)
//! KEYS            List every live key
//! MERGE           Compact the datastore
//! SYNC            Flush the active segment to disk
//! EXIT / QUIT     Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! CASK_DIR    datastore directory            (default: "data/cask")
//! CASK_SYNC   fsync every put ("true"/"false", default: "false")
//! RUST_LOG    tracing filter                 (default: "info")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! caskstore started (dir=data/cask, sync_on_put=false)
//! > SET name Alice
//! OK
//! > GET name
//! Alice
//! > DEL name
//! OK
//! > GET name
//! (nil)
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use engine::{Engine, Error, OpenOption};
use std::io::{self, BufRead, Write};
use tracing_subscriber::{fmt, EnvFilter};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();

    let dir = env_or("CASK_DIR", "data/cask");
    let sync_on_put: bool = env_or("CASK_SYNC", "false").parse().unwrap_or(false);

    let mut options = vec![OpenOption::ReadWrite];
    if sync_on_put {
        options.push(OpenOption::SyncOnPut);
    }

    let engine = Engine::open(&dir, &options)?;
    tracing::info!(dir = %dir, sync_on_put, "datastore ready");
    println!("caskstore started (dir={dir}, sync_on_put={sync_on_put})");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            print!("> ");
            stdout.flush()?;
            continue;
        }

        let command = parts[0].to_ascii_uppercase();
        match (command.as_str(), parts.len()) {
            ("SET", 3) => match engine.put(parts[1].as_bytes(), parts[2].as_bytes()) {
                Ok(()) => println!("OK"),
                Err(e) => println!("ERR {e}"),
            },
            ("SET", _) => println!("ERR wrong number of arguments for 'SET'"),

            ("GET", 2) => match engine.get(parts[1].as_bytes()) {
                Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
                Err(Error::KeyNotFound { .. }) => println!("(nil)"),
                Err(e) => println!("ERR {e}"),
            },
            ("GET", _) => println!("ERR wrong number of arguments for 'GET'"),

            ("DEL", 2) => match engine.delete(parts[1].as_bytes()) {
                Ok(()) => println!("OK"),
                Err(Error::KeyNotFound { .. }) => println!("(nil)"),
                Err(e) => println!("ERR {e}"),
            },
            ("DEL", _) => println!("ERR wrong number of arguments for 'DEL'"),

            ("KEYS", 1) => {
                let mut keys = engine.list_keys();
                keys.sort();
                for key in &keys {
                    println!("{}", String::from_utf8_lossy(key));
                }
                println!("({} keys)", keys.len());
            }

            ("MERGE", 1) => match engine.merge() {
                Ok(()) => println!("OK"),
                Err(e) => println!("ERR {e}"),
            },

            ("SYNC", 1) => match engine.sync() {
                Ok(()) => println!("OK"),
                Err(e) => println!("ERR {e}"),
            },

            ("EXIT", 1) | ("QUIT", 1) => break,

            _ => println!("ERR unknown command: {}", parts[0]),
        }

        print!("> ");
        stdout.flush()?;
    }

    engine.close()?;
    println!("bye");

    Ok(())
}
