//! Asynchronous process execution.
//!
//! Spawns pdftk with the rendered argument vector, feeds the stdin payload
//! and drains stdout/stderr concurrently so interleaved tool I/O cannot
//! deadlock, then maps the terminal state: any stderr output is fatal,
//! non-zero exit is fatal, otherwise the stdout buffer is the result.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::config::Config;
use crate::error::{Error, Result};

/// Run the tool to completion and return the captured stdout buffer.
///
/// When `write_file` is set, the buffer is persisted there after a
/// successful run; a write failure at that point overrides success.
pub(crate) async fn run(
    config: &Config,
    args: Vec<String>,
    stdin_payload: Option<Vec<u8>>,
    write_file: Option<PathBuf>,
) -> Result<Vec<u8>> {
    let tool = config.resolve_tool()?;
    let tool_name = config.tool.clone();

    tracing::debug!("{tool_name} args: {args:?}");

    let mut cmd = Command::new(&tool);
    cmd.args(&args);
    cmd.stdin(if stdin_payload.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::tool_failed(&tool_name, format!("failed to spawn: {e}")))?;

    let mut stdin_pipe = child.stdin.take();
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    // Feed stdin and drain both output streams concurrently. The tool may
    // read and write interleaved, so neither direction may block the other.
    let feed = async {
        if let (Some(pipe), Some(data)) = (stdin_pipe.as_mut(), stdin_payload.as_ref()) {
            // The tool may exit before consuming all of stdin; a broken
            // pipe here is reported through stderr/exit status instead.
            match pipe.write_all(data).await {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other?,
            }
            let _ = pipe.shutdown().await;
        }
        // Close the pipe; the tool blocks reading stdin until EOF.
        drop(stdin_pipe.take());
        Ok::<(), std::io::Error>(())
    };

    let drain_stdout = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    };

    let drain_stderr = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    };

    let (feed_result, stdout_result, stderr_result) =
        tokio::join!(feed, drain_stdout, drain_stderr);

    feed_result
        .map_err(|e| Error::tool_failed(&tool_name, format!("failed to write stdin: {e}")))?;
    let stdout_buf = stdout_result
        .map_err(|e| Error::tool_failed(&tool_name, format!("failed to read stdout: {e}")))?;
    let stderr_buf = stderr_result
        .map_err(|e| Error::tool_failed(&tool_name, format!("failed to read stderr: {e}")))?;

    let status = child
        .wait()
        .await
        .map_err(|e| Error::tool_failed(&tool_name, format!("failed to wait: {e}")))?;

    // Conservative policy: any stderr output is fatal, even on exit 0.
    // pdftk is quiet on clean runs, so warnings signal real trouble.
    if !stderr_buf.is_empty() {
        return Err(Error::ToolStderr {
            tool: tool_name,
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        });
    }

    if !status.success() {
        return Err(Error::NonZeroExit {
            tool: tool_name,
            code: status.code().unwrap_or(-1),
        });
    }

    if let Some(path) = write_file {
        tokio::fs::write(&path, &stdout_buf).await?;
        tracing::debug!("wrote {} bytes to {}", stdout_buf.len(), path.display());
    }

    Ok(stdout_buf)
}

/// Remove staged input files, best-effort. Failures are logged, never
/// surfaced: cleanup is unconditional, not guaranteed-visible.
pub(crate) async fn cleanup(staged: &[PathBuf]) {
    for path in staged {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("removed staged input {}", path.display()),
            Err(e) => tracing::warn!("failed to remove staged input {}: {e}", path.display()),
        }
    }
}
