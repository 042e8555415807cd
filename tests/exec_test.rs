//! End-to-end execution tests using shell-script stand-ins for the pdftk
//! binary, so no real pdftk installation is required.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use tempfile::TempDir;

use pdftk::{Config, Error};

/// Capture engine logs in test output (honors `RUST_LOG`).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write an executable shell script standing in for the tool.
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-pdftk");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Config pointing at a script, with staging isolated under the same dir.
fn config_for(dir: &Path, script_body: &str) -> Config {
    init_logging();
    Config {
        tool: "fake-pdftk".into(),
        tool_path: Some(fake_tool(dir, script_body)),
        temp_dir: Some(dir.join("staging")),
    }
}

fn fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.4").unwrap();
    path
}

#[tokio::test]
async fn captures_stdout_on_success() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "printf 'result-bytes'");
    let input = fixture(dir.path(), "a.pdf");

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .cat("1-end")
        .output()
        .await
        .unwrap();
    assert_eq!(out, b"result-bytes");
}

#[tokio::test]
async fn delivers_full_argument_vector() {
    let dir = TempDir::new().unwrap();
    // Echo each argument on its own line so the test can read them back.
    let config = config_for(dir.path(), r#"printf '%s\n' "$@""#);
    let a = fixture(dir.path(), "a.pdf");
    let b = fixture(dir.path(), "b.pdf");

    let out = pdftk::input_with(config, [a.clone(), b.clone()])
        .unwrap()
        .cat("1-5 end")
        .output()
        .await
        .unwrap();

    let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
    assert_eq!(
        lines,
        vec![
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "cat",
            "1-5",
            "end",
            "output",
            "-",
        ]
    );
}

#[tokio::test]
async fn feeds_stdin_payload_and_closes_the_pipe() {
    let dir = TempDir::new().unwrap();
    // `cat` only terminates once stdin reaches EOF, so this also proves
    // the pipe is closed after the payload is written.
    let config = config_for(dir.path(), "cat");
    let input = fixture(dir.path(), "form.pdf");

    let expected = pdftk::codec::encode_form_data([("name", "Jo")]);
    let out = pdftk::input_with(config, [input])
        .unwrap()
        .fill_form([("name", "Jo")])
        .unwrap()
        .output()
        .await
        .unwrap();
    assert_eq!(out, expected);
}

#[tokio::test]
async fn persists_output_buffer_to_file() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "printf 'persisted'");
    let input = fixture(dir.path(), "a.pdf");
    let dest = dir.path().join("out.pdf");

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .cat("1-end")
        .output_to_file(&dest)
        .await
        .unwrap();
    assert_eq!(out, b"persisted");
    assert_eq!(fs::read(&dest).unwrap(), b"persisted");
}

#[tokio::test]
async fn tool_destination_and_write_file_combine() {
    let dir = TempDir::new().unwrap();
    // The stand-in honors the `output <dest>` operand like the real tool,
    // then emits something else on stdout.
    let config = config_for(
        dir.path(),
        r#"while [ $# -gt 1 ]; do
  if [ "$1" = output ] && [ "$2" != - ]; then printf 'tool-side' > "$2"; fi
  shift
done
printf 'host-side'"#,
    );
    let input = fixture(dir.path(), "a.pdf");
    let tool_dest = dir.path().join("tool.pdf");
    let host_copy = dir.path().join("host.pdf");

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .cat("1-end")
        .destination(&tool_dest)
        .output_to_file(&host_copy)
        .await
        .unwrap();

    // The tool wrote its own destination; the captured stdout buffer was
    // returned and persisted host-side, independently.
    assert_eq!(fs::read(&tool_dest).unwrap(), b"tool-side");
    assert_eq!(out, b"host-side");
    assert_eq!(fs::read(&host_copy).unwrap(), b"host-side");
}

#[tokio::test]
async fn write_failure_overrides_success() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "printf 'x'");
    let input = fixture(dir.path(), "a.pdf");

    let result = pdftk::input_with(config, [input])
        .unwrap()
        .cat("1-end")
        .output_to_file("/no/such/dir/out.pdf")
        .await;
    assert_matches!(result, Err(Error::Io { .. }));
}

#[tokio::test]
async fn any_stderr_output_is_fatal() {
    let dir = TempDir::new().unwrap();
    // Exit status zero; stderr content alone must fail the request.
    let config = config_for(dir.path(), "echo 'Warning: something' >&2; exit 0");
    let input = fixture(dir.path(), "a.pdf");

    let result = pdftk::input_with(config, [input])
        .unwrap()
        .dump_data()
        .output()
        .await;
    assert_matches!(result, Err(Error::ToolStderr { ref stderr, .. }) => {
        assert!(stderr.contains("Warning: something"));
    });
}

#[tokio::test]
async fn non_zero_exit_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "exit 3");
    let input = fixture(dir.path(), "a.pdf");

    let result = pdftk::input_with(config, [input])
        .unwrap()
        .cat("1-end")
        .output()
        .await;
    assert_matches!(result, Err(Error::NonZeroExit { code: 3, .. }));
}

#[tokio::test]
async fn staged_inputs_are_removed_on_success() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "printf 'ok'");
    let staging = config.staging_dir();

    pdftk::input_with(config, [b"%PDF-1.4 buffer".to_vec()])
        .unwrap()
        .cat("1-end")
        .output()
        .await
        .unwrap();

    let leftovers: Vec<_> = fs::read_dir(&staging).unwrap().collect();
    assert!(leftovers.is_empty(), "staging dir not cleaned: {leftovers:?}");
}

#[tokio::test]
async fn staged_inputs_are_removed_on_failure() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "exit 1");
    let staging = config.staging_dir();

    let result = pdftk::input_with(config, [b"%PDF-1.4 buffer".to_vec()])
        .unwrap()
        .cat("1-end")
        .output()
        .await;
    assert!(result.is_err());

    let leftovers: Vec<_> = fs::read_dir(&staging).unwrap().collect();
    assert!(leftovers.is_empty(), "staging dir not cleaned: {leftovers:?}");
}

#[tokio::test]
async fn missing_tool_still_cleans_staged_inputs() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        tool: "nonexistent_tool_xyz_12345".into(),
        tool_path: None,
        temp_dir: Some(dir.path().join("staging")),
    };
    let staging = config.staging_dir();

    let result = pdftk::input_with(config, [b"%PDF-1.4".to_vec()])
        .unwrap()
        .cat("1-end")
        .output()
        .await;
    assert_matches!(result, Err(Error::ToolNotFound { .. }));

    let leftovers: Vec<_> = fs::read_dir(&staging).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn burst_appends_page_pattern_destination() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), r#"printf '%s\n' "$@""#);
    let input = fixture(dir.path(), "a.pdf");
    let out_dir = dir.path().join("pages");

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .burst(&out_dir)
        .await
        .unwrap();

    let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
    assert_eq!(lines[1], "burst");
    assert_eq!(lines[2], "output");
    assert_eq!(lines[3], out_dir.join("pg_%04d.pdf").to_str().unwrap());
}

#[tokio::test]
async fn unpack_files_targets_directory() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), r#"printf '%s\n' "$@""#);
    let input = fixture(dir.path(), "a.pdf");
    let out_dir = dir.path().join("attachments");

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .unpack_files(&out_dir)
        .await
        .unwrap();

    let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
    assert_eq!(lines[1], "unpack_files");
    assert_eq!(lines[3], out_dir.to_str().unwrap());
}

#[tokio::test]
async fn interleaved_io_does_not_deadlock() {
    let dir = TempDir::new().unwrap();
    // Echo stdin back in chunks while the payload is still being written.
    let config = config_for(dir.path(), "cat");
    let input = fixture(dir.path(), "form.pdf");

    // A payload comfortably larger than a pipe buffer.
    let big: Vec<(String, String)> = (0..20_000)
        .map(|i| (format!("field{i}"), format!("value{i}")))
        .collect();
    let expected = pdftk::codec::encode_form_data(
        big.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );

    let out = pdftk::input_with(config, [input])
        .unwrap()
        .fill_form(big.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .unwrap()
        .output()
        .await
        .unwrap();
    assert_eq!(out.len(), expected.len());
    assert_eq!(out, expected);
}
