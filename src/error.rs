//! Unified error type for the pdftk wrapper.
//!
//! Construction-time failures (missing inputs, staging errors) and
//! execution-time failures (spawn errors, stderr output, non-zero exit) all
//! funnel into [`Error`] so callers have a single type to match on.

use std::path::PathBuf;

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or executing a pdftk request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input document path does not exist.
    #[error("input file not found: {}", path.display())]
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The request is malformed (empty input list, empty attachment list,
    /// conflicting stdin-commands operations, bad configuration).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Writing a buffer input to the staging directory failed.
    #[error("failed to stage buffer input: {source}")]
    Staging {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The pdftk binary could not be located.
    #[error("tool not found: {tool}; is it installed and in PATH?")]
    ToolNotFound {
        /// Name of the binary that was searched for.
        tool: String,
    },

    /// Spawning or talking to the process failed.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The process wrote to its error stream. Any stderr output is treated
    /// as fatal regardless of the eventual exit code.
    #[error("{tool} reported: {stderr}")]
    ToolStderr {
        /// Name of the tool.
        tool: String,
        /// Captured stderr content (lossy UTF-8).
        stderr: String,
    },

    /// The process exited with a non-zero status and an empty error stream.
    #[error("{tool} exited with code {code}")]
    NonZeroExit {
        /// Name of the tool.
        tool: String,
        /// Numeric exit code, or -1 when terminated by a signal.
        code: i32,
    },

    /// An I/O operation failed (e.g. persisting the output buffer to disk).
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::FileNotFound`].
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Convenience constructor for [`Error::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Convenience constructor for [`Error::ToolFailed`].
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
