//! Execution configuration.
//!
//! [`Config`] carries the two knobs a caller may want to inject: where the
//! pdftk binary lives and where buffer inputs are staged. Every field
//! defaults sensibly so `Config::default()` is ready to use.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default binary name, resolved via the executable search path.
pub const DEFAULT_TOOL: &str = "pdftk";

/// Configuration for building and executing requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Binary name looked up in `PATH` when no explicit path is set.
    pub tool: String,
    /// Explicit path to the binary. Takes precedence over `tool` when the
    /// path exists; otherwise lookup falls back to `PATH`.
    pub tool_path: Option<PathBuf>,
    /// Directory where buffer inputs are staged. Defaults to
    /// `$TMPDIR/pdftk-rs`. Unique random file names avoid collisions between
    /// concurrent requests sharing this directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            tool_path: None,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// String-based so the caller can read the file however it sees fit
    /// (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::invalid_request(format!("config parse error: {e}")))
    }

    /// Resolve the path to the pdftk binary.
    pub fn resolve_tool(&self) -> Result<PathBuf> {
        if let Some(path) = &self.tool_path {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        which::which(&self.tool).map_err(|_| Error::ToolNotFound {
            tool: self.tool.clone(),
        })
    }

    /// The directory buffer inputs are staged under.
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pdftk-rs"))
    }
}
