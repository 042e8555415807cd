//! # pdftk
//!
//! Fluent command builder and async execution engine for the `pdftk` CLI.
//!
//! A [`Request`] accumulates document operations (concatenation, form
//! filling, metadata update, stamping, attachments, ...) and output options,
//! then executes the tool once with the fully assembled argument vector,
//! optionally streaming a payload to its stdin and capturing its stdout.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> pdftk::Result<()> {
//! let merged = pdftk::input(["a.pdf", "b.pdf"])?
//!     .cat("1-5 end")
//!     .output()
//!     .await?;
//!
//! pdftk::input(["form.pdf"])?
//!     .fill_form([("name", "Jo"), ("city", "Oslo")])?
//!     .flatten()
//!     .output_to_file("filled.pdf")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Raw byte buffers are accepted as inputs; they are staged as temp files
//! (pdftk only reads paths) and removed after execution, success or failure.
//! Inputs can also be `(handle, path)` pairs for multi-document ranges.
//!
//! Failure policy: any stderr output from the tool is fatal, as is a
//! non-zero exit code. There is no timeout; wrap the returned future in
//! [`tokio::time::timeout`] for bounded latency.

pub mod codec;
pub mod config;
pub mod error;
mod exec;
pub mod request;
mod staging;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, Result};
pub use request::{FileSource, InputSource, IntoRanges, Request};

/// Build a [`Request`] from input documents using the default [`Config`].
///
/// Accepts paths, `(handle, path)` pairs, and raw byte buffers, mixed
/// freely. Fails synchronously on a missing path, an empty input list, or a
/// staging error; no process is spawned and no temp file survives a failed
/// construction.
pub fn input<I, S>(sources: I) -> Result<Request>
where
    I: IntoIterator<Item = S>,
    S: Into<InputSource>,
{
    Request::with_config(Config::default(), sources)
}

/// Build a [`Request`] with an explicit [`Config`] (custom binary location
/// or staging directory).
pub fn input_with<I, S>(config: Config, sources: I) -> Result<Request>
where
    I: IntoIterator<Item = S>,
    S: Into<InputSource>,
{
    Request::with_config(config, sources)
}
