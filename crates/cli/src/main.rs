//! # CLI - Krati Interactive Shell
//!
//! A REPL-style command-line interface for a `RecoverableArray`. Reads
//! commands from stdin, executes them against the array, and prints results
//! to stdout. Designed for both interactive use and scripted testing (pipe
//! commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET index value scn   Write value at index, tagged with sequence number scn
//! GET index             Read the value at index (prints value or an error)
//! SAVEHWMARK end         Advance (or rewind) the high water mark to end
//! SYNC                   Seal and apply pending entries; fsync water marks
//! CLEAR                  Zero every cell and reset both water marks
//! STATS                  Print length and water marks
//! EXIT / QUIT            Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! KRATI_DIR             Array directory            (default: "data/krati")
//! KRATI_SUB_ARRAY_BITS  Sub-array size exponent     (default: 16)
//! KRATI_MAX_ENTRY_SIZE  Records per Entry           (default: 10000)
//! KRATI_MAX_ENTRIES     Entries kept in the pool    (default: 5)
//! KRATI_ELEMENT_WIDTH   "int" or "long"             (default: "long")
//! ```
//!
//! Diagnostics go through `log`/`env_logger`; set `RUST_LOG=krati_engine=debug`
//! (or similar) to see recovery, rollover, and backpressure-apply messages.
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! Krati array opened (dir=data/krati, length=65536, lwm=0, hwm=0)
//! > SET 0 100 1
//! OK
//! > GET 0
//! 100
//! > SYNC
//! OK (lwm=1, hwm=1)
//! > EXIT
//! bye
//! ```
use anyhow::{bail, Result};
use config::{ArrayConfig, ElementWidth};
use krati_engine::RecoverableArray;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn config_from_env() -> Result<ArrayConfig> {
    let dir = env_or("KRATI_DIR", "data/krati");
    let sub_array_bits: u32 = env_or("KRATI_SUB_ARRAY_BITS", "16").parse().unwrap_or(16);
    let max_entry_size: usize = env_or("KRATI_MAX_ENTRY_SIZE", "10000")
        .parse()
        .unwrap_or(10_000);
    let max_entries: usize = env_or("KRATI_MAX_ENTRIES", "5").parse().unwrap_or(5);
    let element_width = match env_or("KRATI_ELEMENT_WIDTH", "long").to_lowercase().as_str() {
        "int" => ElementWidth::Int,
        "long" => ElementWidth::Long,
        other => bail!("unrecognized KRATI_ELEMENT_WIDTH: {other} (expected \"int\" or \"long\")"),
    };

    Ok(ArrayConfig::new(dir)
        .with_sub_array_bits(sub_array_bits)
        .with_max_entry_size(max_entry_size)
        .with_max_entries(max_entries)
        .with_element_width(element_width))
}

fn main() -> Result<()> {
    env_logger::init();
    let config = config_from_env()?;
    let dir = config.directory.display().to_string();

    let mut array = RecoverableArray::new(config)?;
    array.open()?;

    println!(
        "Krati array opened (dir={}, length={}, lwm={}, hwm={})",
        dir,
        array.length(),
        array.get_lwmark()?,
        array.get_hwmark()?
    );
    println!("Commands: SET index value scn | GET index | SAVEHWMARK end");
    println!("          SYNC | CLEAR | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => {
                    let args: Vec<&str> = parts.collect();
                    match args.as_slice() {
                        [index, value, scn] => {
                            match (index.parse(), value.parse(), scn.parse()) {
                                (Ok(index), Ok(value), Ok(scn)) => {
                                    match array.set(index, value, scn) {
                                        Ok(()) => println!("OK"),
                                        Err(e) => println!("ERR set failed: {e}"),
                                    }
                                }
                                _ => println!("ERR usage: SET index value scn (all integers)"),
                            }
                        }
                        _ => println!("ERR usage: SET index value scn"),
                    }
                }
                "GET" => match parts.next() {
                    Some(index) => match index.parse() {
                        Ok(index) => match array.get(index) {
                            Ok(value) => println!("{value}"),
                            Err(e) => println!("ERR get failed: {e}"),
                        },
                        Err(_) => println!("ERR usage: GET index (integer)"),
                    },
                    None => println!("ERR usage: GET index"),
                },
                "SAVEHWMARK" => match parts.next() {
                    Some(end) => match end.parse() {
                        Ok(end) => match array.save_hwmark(end) {
                            Ok(()) => println!("OK (hwm={})", array.get_hwmark()?),
                            Err(e) => println!("ERR savehwmark failed: {e}"),
                        },
                        Err(_) => println!("ERR usage: SAVEHWMARK end (integer)"),
                    },
                    None => println!("ERR usage: SAVEHWMARK end"),
                },
                "SYNC" => match array.sync() {
                    Ok(()) => println!(
                        "OK (lwm={}, hwm={})",
                        array.get_lwmark()?,
                        array.get_hwmark()?
                    ),
                    Err(e) => println!("ERR sync failed: {e}"),
                },
                "CLEAR" => match array.clear() {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("ERR clear failed: {e}"),
                },
                "STATS" => {
                    println!(
                        "length={} lwm={} hwm={} open={}",
                        array.length(),
                        array.get_lwmark()?,
                        array.get_hwmark()?,
                        array.is_open()
                    );
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {other}");
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
