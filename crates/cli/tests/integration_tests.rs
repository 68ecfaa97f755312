//! Black-box integration tests for the Krati CLI.
//!
//! Spawns the `cli` binary itself (rather than calling into the library) so
//! these exercise the real stdin/stdout contract, the same way the teacher's
//! `cli/tests/integration_tests.rs` drives its REPL via `cargo run -p cli`.

use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Runs the CLI against a fresh array directory, feeding it `commands` over
/// stdin, and returns everything printed to stdout.
fn run_cli_command(dir: &Path, commands: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "cli", "--"])
        .env("KRATI_DIR", dir)
        .env("KRATI_SUB_ARRAY_BITS", "4")
        .env("KRATI_MAX_ENTRY_SIZE", "8")
        .env("KRATI_MAX_ENTRIES", "3")
        .env("KRATI_ELEMENT_WIDTH", "long")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn cli");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(commands.as_bytes())
            .expect("failed to write commands");
        stdin.write_all(b"EXIT\n").expect("failed to write EXIT");
    }

    let output = child.wait_with_output().expect("failed to read output");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_basic_set_get() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "SET 0 100 1\nGET 0\n");

    assert!(output.contains("OK"));
    assert!(output.contains("100"));
}

#[test]
fn test_multiple_indexes() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 10 1\nSET 5 50 2\nSET 9 90 3\nGET 0\nGET 5\nGET 9\n";
    let output = run_cli_command(dir.path(), commands);

    assert!(output.contains("10"));
    assert!(output.contains("50"));
    assert!(output.contains("90"));
}

#[test]
fn test_overwrite_index() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 1 1\nGET 0\nSET 0 2 2\nGET 0\n";
    let output = run_cli_command(dir.path(), commands);

    let values: Vec<&str> = output
        .lines()
        .filter(|l| l.trim().chars().all(|c| c.is_ascii_digit()) && !l.trim().is_empty())
        .collect();
    assert!(values.contains(&"1"));
    assert!(values.contains(&"2"));
}

#[test]
fn test_sync_reports_matching_water_marks() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 1 5\nSET 1 2 7\nSYNC\n";
    let output = run_cli_command(dir.path(), commands);

    assert!(output.contains("OK (lwm=7, hwm=7)"));
}

#[test]
fn test_savehwmark_advances_hwm() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 1 5\nSAVEHWMARK 100\n";
    let output = run_cli_command(dir.path(), commands);

    assert!(output.contains("OK (hwm=100)"));
}

#[test]
fn test_clear_resets_cells() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 42 1\nCLEAR\nGET 0\n";
    let output = run_cli_command(dir.path(), commands);

    assert!(output.contains("OK"));
    let last_numeric_line = output
        .lines()
        .rev()
        .find(|l| l.trim().parse::<i64>().is_ok())
        .unwrap();
    assert_eq!(last_numeric_line.trim(), "0");
}

#[test]
fn test_stats_output_contains_length_and_water_marks() {
    let dir = tempdir().unwrap();
    let commands = "SET 0 1 1\nSYNC\nSTATS\n";
    let output = run_cli_command(dir.path(), commands);

    assert!(output.contains("length="));
    assert!(output.contains("lwm="));
    assert!(output.contains("hwm="));
    assert!(output.contains("open=true"));
}

#[test]
fn test_get_out_of_range_reports_error_not_panic() {
    let dir = tempdir().unwrap();
    // length starts at 16 (sub_array_bits=4); index 1000 is out of range
    // until something grows the array.
    let output = run_cli_command(dir.path(), "GET 1000\n");

    assert!(output.contains("ERR get failed"));
}

#[test]
fn test_quit_command() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "SET 0 1 1\nQUIT\n");

    assert!(output.contains("OK"));
    assert!(output.contains("bye"));
}

#[test]
fn test_unknown_command_does_not_crash() {
    let dir = tempdir().unwrap();
    let output = run_cli_command(dir.path(), "BOGUS\nGET 0\n");

    assert!(output.contains("unknown command: BOGUS"));
    assert!(output.contains('0'));
}

#[test]
fn test_persistence_across_restarts() {
    let dir = tempdir().unwrap();

    run_cli_command(dir.path(), "SET 3 777 1\nSYNC\n");
    assert!(fs::metadata(dir.path().join("indexes.dat")).is_ok());

    let output = run_cli_command(dir.path(), "GET 3\n");
    assert!(output.contains("777"));
}

#[test]
fn test_rollover_across_many_writes_still_readable() {
    let dir = tempdir().unwrap();
    // max_entry_size=8, max_entries=3: 20 writes force at least one
    // rollover and one inline apply before the data is queried back.
    let mut commands = String::new();
    for i in 0..20u32 {
        commands.push_str(&format!("SET {i} {} {}\n", i * 10, i + 1));
    }
    for i in 0..20u32 {
        commands.push_str(&format!("GET {i}\n"));
    }
    let output = run_cli_command(dir.path(), &commands);

    for i in 0..20u32 {
        assert!(output.contains(&(i * 10).to_string()));
    }
}
