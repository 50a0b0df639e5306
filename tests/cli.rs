// Integration tests for the `helperlib` binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn helperlib(args: &[&str]) -> Output {
    // `cargo test` sets this env var to the path of the built binary
    let path = PathBuf::from(env!("CARGO_BIN_EXE_helperlib"));
    Command::new(&path)
        .args(args)
        .env_remove("HELPERLIB_LOG")
        .output()
        .expect("failed to run helperlib")
}

#[test]
fn check_passes_without_leaks() {
    let output = helperlib(&["check", "--verbose", "--track-allocs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");
    assert!(stdout.contains("ok    complex_adaptor"), "{stdout}");
    assert!(stdout.contains("0 failed"), "{stdout}");
}

#[test]
fn symbols_lists_core_helpers() {
    let output = helperlib(&["symbols"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["complex_adaptor", "extract_record_data", "recreate_record", "fptoui"] {
        assert!(stdout.contains(name), "{name} missing from:\n{stdout}");
    }
}

#[test]
fn symbols_filter_narrows_output() {
    let output = helperlib(&["symbols", "--filter", "roundf"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("roundf_even"));
    assert!(!stdout.contains("sdiv"));
    assert!(stdout.contains("1 of "));
}

#[test]
fn constants_are_printed() {
    let output = helperlib(&["constants"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("buffer_view_size"));
    assert!(stdout.contains("long_min"));
    assert!(stdout.contains("long_max"));
}

#[test]
fn version_names_the_tool() {
    let output = helperlib(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("helperlib "), "{stdout}");
}
