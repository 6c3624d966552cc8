use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use assert_cmd::prelude::*; // Add methods on commands
use tempfile::{Builder, TempDir};

mod one_off;

const TEST_CONFIG_FILE: &str = "dbadmin-test.toml";

fn setup_temp_config(base_url: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let temp_dir = Builder::new()
        .prefix("dbadmin-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    let file_path = temp_dir.path().join(TEST_CONFIG_FILE);
    fs::write(
        &file_path,
        format!(
            r#"[backend]
base_url = "{base_url}"

[ui]
export_file_name = "bookings.xlsx"
"#
        ),
    )?;

    Ok((temp_dir, file_path))
}

fn run_one_off(config: &PathBuf, commands: &str, extra: &[&str]) -> Output {
    Command::cargo_bin("dbadmin")
        .expect("dbadmin bin exists")
        .arg("-c")
        .arg(config)
        .arg("--one-off")
        .arg(commands)
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("dbadmin ran")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .lines()
        .map(String::from)
        .collect()
}
