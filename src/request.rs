//! Fluent request builder.
//!
//! A [`Request`] accumulates typed operation records and output options,
//! rendering them to pdftk's positional argument grammar only when the
//! terminal `output` call executes the tool. Fallible builder methods return
//! `Result<Self>` so chains compose with `?` and every construction-time
//! error surfaces before a process is spawned.

use std::path::{Path, PathBuf};

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec;
use crate::staging;

/// An input document supplied at construction time.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Bare path to a document on disk.
    Path(PathBuf),
    /// `handle=path` pair, letting page-range expressions reference this
    /// document by handle when several inputs are supplied.
    Handled {
        /// Short identifier used in range expressions (conventionally `A`,
        /// `B`, ...).
        handle: String,
        /// Path to the document.
        path: PathBuf,
    },
    /// Raw document bytes, staged to a temp file during construction.
    Buffer(Vec<u8>),
}

impl From<&str> for InputSource {
    fn from(path: &str) -> Self {
        InputSource::Path(PathBuf::from(path))
    }
}

impl From<String> for InputSource {
    fn from(path: String) -> Self {
        InputSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for InputSource {
    fn from(path: &Path) -> Self {
        InputSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::Path(path)
    }
}

impl From<Vec<u8>> for InputSource {
    fn from(bytes: Vec<u8>) -> Self {
        InputSource::Buffer(bytes)
    }
}

impl From<(&str, &str)> for InputSource {
    fn from((handle, path): (&str, &str)) -> Self {
        InputSource::Handled {
            handle: handle.to_string(),
            path: PathBuf::from(path),
        }
    }
}

impl From<(String, String)> for InputSource {
    fn from((handle, path): (String, String)) -> Self {
        InputSource::Handled {
            handle,
            path: PathBuf::from(path),
        }
    }
}

impl From<(&str, PathBuf)> for InputSource {
    fn from((handle, path): (&str, PathBuf)) -> Self {
        InputSource::Handled {
            handle: handle.to_string(),
            path,
        }
    }
}

/// A background/stamp source: either a path read at call time or bytes used
/// directly. Both end up as the request's stdin payload.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Path to a document on disk.
    Path(PathBuf),
    /// Raw document bytes.
    Buffer(Vec<u8>),
}

impl From<&str> for FileSource {
    fn from(path: &str) -> Self {
        FileSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        FileSource::Path(path)
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(bytes: Vec<u8>) -> Self {
        FileSource::Buffer(bytes)
    }
}

impl FileSource {
    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            FileSource::Buffer(bytes) => Ok(bytes),
            FileSource::Path(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound { path });
                }
                Ok(std::fs::read(&path)?)
            }
        }
    }
}

/// Page-range input for `cat`, `shuffle`, and `rotate`: either one
/// whitespace-delimited string or an explicit token list. Both forms render
/// to identical argument vectors.
pub trait IntoRanges {
    /// Convert into individual range tokens.
    fn into_ranges(self) -> Vec<String>;
}

impl IntoRanges for &str {
    fn into_ranges(self) -> Vec<String> {
        self.split_whitespace().map(str::to_string).collect()
    }
}

impl IntoRanges for String {
    fn into_ranges(self) -> Vec<String> {
        self.as_str().into_ranges()
    }
}

impl IntoRanges for Vec<String> {
    fn into_ranges(self) -> Vec<String> {
        self
    }
}

impl IntoRanges for Vec<&str> {
    fn into_ranges(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoRanges for &[&str] {
    fn into_ranges(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

/// A normalized input after construction (buffers replaced by staged paths).
#[derive(Debug, Clone)]
enum SourceSpec {
    Path(PathBuf),
    Handled { handle: String, path: PathBuf },
}

impl SourceSpec {
    fn token(&self) -> String {
        match self {
            SourceSpec::Path(path) => path.to_string_lossy().into_owned(),
            SourceSpec::Handled { handle, path } => {
                format!("{handle}={}", path.display())
            }
        }
    }
}

/// A document operation, rendered to tokens at execution time.
#[derive(Debug, Clone)]
enum Operation {
    Cat(Vec<String>),
    Shuffle(Vec<String>),
    Rotate(Vec<String>),
    FillForm,
    Background,
    MultiBackground,
    Stamp,
    MultiStamp,
    UpdateInfo,
    UpdateInfoUtf8,
    DumpData,
    DumpDataUtf8,
    DumpDataFields,
    DumpDataFieldsUtf8,
    DumpDataAnnots,
    GenerateFdf,
    AttachFiles {
        files: Vec<PathBuf>,
        to_page: Option<u32>,
    },
    Burst,
    UnpackFiles,
}

impl Operation {
    fn render(&self, args: &mut Vec<String>) {
        match self {
            Operation::Cat(ranges) => {
                args.push("cat".into());
                args.extend(ranges.iter().cloned());
            }
            Operation::Shuffle(ranges) => {
                args.push("shuffle".into());
                args.extend(ranges.iter().cloned());
            }
            Operation::Rotate(ranges) => {
                args.push("rotate".into());
                args.extend(ranges.iter().cloned());
            }
            // Stdin-commands operations take their data on stdin, marked `-`.
            Operation::FillForm => args.extend(["fill_form".into(), "-".into()]),
            Operation::Background => args.extend(["background".into(), "-".into()]),
            Operation::MultiBackground => {
                args.extend(["multibackground".into(), "-".into()])
            }
            Operation::Stamp => args.extend(["stamp".into(), "-".into()]),
            Operation::MultiStamp => args.extend(["multistamp".into(), "-".into()]),
            Operation::UpdateInfo => args.extend(["update_info".into(), "-".into()]),
            Operation::UpdateInfoUtf8 => {
                args.extend(["update_info_utf8".into(), "-".into()])
            }
            Operation::DumpData => args.push("dump_data".into()),
            Operation::DumpDataUtf8 => args.push("dump_data_utf8".into()),
            Operation::DumpDataFields => args.push("dump_data_fields".into()),
            Operation::DumpDataFieldsUtf8 => args.push("dump_data_fields_utf8".into()),
            Operation::DumpDataAnnots => args.push("dump_data_annots".into()),
            Operation::GenerateFdf => args.push("generate_fdf".into()),
            Operation::AttachFiles { files, to_page } => {
                args.push("attach_files".into());
                args.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
                if let Some(page) = to_page {
                    args.push("to_page".into());
                    args.push(page.to_string());
                }
            }
            Operation::Burst => args.push("burst".into()),
            Operation::UnpackFiles => args.push("unpack_files".into()),
        }
    }
}

/// An output-shaping option, rendered after `output <dest>` in call order.
#[derive(Debug, Clone)]
enum OutputOption {
    Flatten,
    NeedAppearances,
    Compress,
    Uncompress,
    KeepFirstId,
    KeepFinalId,
    DropXfa,
    Verbose,
    DoAsk,
    DontAsk,
    Encrypt40Bit,
    Encrypt128Bit,
    Allow(Vec<String>),
    OwnerPw(String),
    UserPw(String),
}

impl OutputOption {
    fn render(&self, args: &mut Vec<String>) {
        match self {
            OutputOption::Flatten => args.push("flatten".into()),
            OutputOption::NeedAppearances => args.push("need_appearances".into()),
            OutputOption::Compress => args.push("compress".into()),
            OutputOption::Uncompress => args.push("uncompress".into()),
            OutputOption::KeepFirstId => args.push("keep_first_id".into()),
            OutputOption::KeepFinalId => args.push("keep_final_id".into()),
            OutputOption::DropXfa => args.push("drop_xfa".into()),
            OutputOption::Verbose => args.push("verbose".into()),
            OutputOption::DoAsk => args.push("do_ask".into()),
            OutputOption::DontAsk => args.push("dont_ask".into()),
            OutputOption::Encrypt40Bit => args.push("encrypt_40bit".into()),
            OutputOption::Encrypt128Bit => args.push("encrypt_128bit".into()),
            OutputOption::Allow(perms) => {
                args.push("allow".into());
                args.extend(perms.iter().cloned());
            }
            OutputOption::OwnerPw(pw) => {
                args.push("owner_pw".into());
                args.push(pw.clone());
            }
            OutputOption::UserPw(pw) => {
                args.push("user_pw".into());
                args.push(pw.clone());
            }
        }
    }
}

/// A single pdftk invocation under construction.
///
/// Created by [`input`](crate::input) or [`Request::with_config`], mutated by
/// chained operation calls, and consumed by one of the terminal methods
/// ([`output`](Request::output), [`output_to_file`](Request::output_to_file),
/// [`burst`](Request::burst), [`unpack_files`](Request::unpack_files)).
#[derive(Debug)]
pub struct Request {
    config: Config,
    sources: Vec<SourceSpec>,
    input_passwords: Vec<String>,
    operations: Vec<Operation>,
    output_options: Vec<OutputOption>,
    stdin_payload: Option<Vec<u8>>,
    staged: Vec<PathBuf>,
    destination: Option<PathBuf>,
    write_file: Option<PathBuf>,
}

impl Request {
    /// Build a request with an explicit [`Config`].
    ///
    /// Normalizes heterogeneous inputs: bare paths and `handle=path` pairs
    /// are validated to exist, raw buffers are staged to temp files under
    /// the configured staging directory. Any failure aborts construction;
    /// files already staged for this request are removed first.
    pub fn with_config<I, S>(config: Config, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<InputSource>,
    {
        let sources: Vec<InputSource> = sources.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(Error::invalid_request("at least one input is required"));
        }

        // Validate paths before staging anything so an invalid request
        // never leaves temp files behind.
        for source in &sources {
            let path = match source {
                InputSource::Path(path) => path,
                InputSource::Handled { path, .. } => path,
                InputSource::Buffer(_) => continue,
            };
            if !path.exists() {
                return Err(Error::FileNotFound { path: path.clone() });
            }
        }

        let staging_dir = config.staging_dir();
        let mut specs = Vec::with_capacity(sources.len());
        let mut staged = Vec::new();

        for source in sources {
            match source {
                InputSource::Path(path) => specs.push(SourceSpec::Path(path)),
                InputSource::Handled { handle, path } => {
                    specs.push(SourceSpec::Handled { handle, path })
                }
                InputSource::Buffer(bytes) => {
                    match staging::stage_buffer(&staging_dir, &bytes) {
                        Ok(path) => {
                            staged.push(path.clone());
                            specs.push(SourceSpec::Path(path));
                        }
                        Err(e) => {
                            for p in &staged {
                                let _ = std::fs::remove_file(p);
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(Self {
            config,
            sources: specs,
            input_passwords: Vec::new(),
            operations: Vec::new(),
            output_options: Vec::new(),
            stdin_payload: None,
            staged,
            destination: None,
            write_file: None,
        })
    }

    // ---- page-range operations ----

    /// Concatenate pages (`cat`).
    pub fn cat(mut self, ranges: impl IntoRanges) -> Self {
        self.operations.push(Operation::Cat(ranges.into_ranges()));
        self
    }

    /// Collate pages (`shuffle`).
    pub fn shuffle(mut self, ranges: impl IntoRanges) -> Self {
        self.operations.push(Operation::Shuffle(ranges.into_ranges()));
        self
    }

    /// Rotate pages (`rotate`).
    pub fn rotate(mut self, ranges: impl IntoRanges) -> Self {
        self.operations.push(Operation::Rotate(ranges.into_ranges()));
        self
    }

    // ---- stdin-commands operations ----

    /// Fill form fields from key/value pairs, encoded as FDF.
    pub fn fill_form<I, K, V>(self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.fill_form_raw(codec::encode_form_data(fields))
    }

    /// Fill form fields from a pre-formed FDF or XFDF payload.
    pub fn fill_form_raw(mut self, payload: impl Into<Vec<u8>>) -> Result<Self> {
        self = self.set_stdin(payload.into())?;
        self.operations.push(Operation::FillForm);
        Ok(self)
    }

    /// Apply a background layer (`background`). Accepts a path or raw bytes.
    pub fn background(self, source: impl Into<FileSource>) -> Result<Self> {
        self.stdin_file_op(Operation::Background, source.into())
    }

    /// Apply backgrounds page-by-page (`multibackground`).
    pub fn multi_background(self, source: impl Into<FileSource>) -> Result<Self> {
        self.stdin_file_op(Operation::MultiBackground, source.into())
    }

    /// Overlay a stamp (`stamp`).
    pub fn stamp(self, source: impl Into<FileSource>) -> Result<Self> {
        self.stdin_file_op(Operation::Stamp, source.into())
    }

    /// Overlay stamps page-by-page (`multistamp`).
    pub fn multi_stamp(self, source: impl Into<FileSource>) -> Result<Self> {
        self.stdin_file_op(Operation::MultiStamp, source.into())
    }

    /// Update document metadata from key/value pairs (`update_info`).
    pub fn update_info<I, K, V>(self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.info_op(Operation::UpdateInfo, codec::encode_info_text(entries))
    }

    /// Update document metadata, UTF-8 aware (`update_info_utf8`).
    pub fn update_info_utf8<I, K, V>(self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.info_op(Operation::UpdateInfoUtf8, codec::encode_info_text(entries))
    }

    /// Update document metadata from a pre-formed info-text payload.
    pub fn update_info_raw(self, payload: impl Into<Vec<u8>>) -> Result<Self> {
        self.info_op(Operation::UpdateInfo, payload.into())
    }

    /// Update document metadata from a pre-formed info-text payload, UTF-8
    /// aware (`update_info_utf8`).
    pub fn update_info_utf8_raw(self, payload: impl Into<Vec<u8>>) -> Result<Self> {
        self.info_op(Operation::UpdateInfoUtf8, payload.into())
    }

    fn info_op(mut self, op: Operation, payload: Vec<u8>) -> Result<Self> {
        self = self.set_stdin(payload)?;
        self.operations.push(op);
        Ok(self)
    }

    fn stdin_file_op(mut self, op: Operation, source: FileSource) -> Result<Self> {
        self = self.set_stdin(source.into_bytes()?)?;
        self.operations.push(op);
        Ok(self)
    }

    fn set_stdin(mut self, payload: Vec<u8>) -> Result<Self> {
        // At most one stdin-commands operation per request. The alternative
        // (silently overwriting the earlier payload) hides caller mistakes.
        if self.stdin_payload.is_some() {
            return Err(Error::invalid_request(
                "stdin payload already set by an earlier operation",
            ));
        }
        self.stdin_payload = Some(payload);
        Ok(self)
    }

    // ---- dump operations ----

    /// Report document metadata (`dump_data`).
    pub fn dump_data(mut self) -> Self {
        self.operations.push(Operation::DumpData);
        self
    }

    /// Report document metadata, UTF-8 aware (`dump_data_utf8`).
    pub fn dump_data_utf8(mut self) -> Self {
        self.operations.push(Operation::DumpDataUtf8);
        self
    }

    /// Report form field statistics (`dump_data_fields`).
    pub fn dump_data_fields(mut self) -> Self {
        self.operations.push(Operation::DumpDataFields);
        self
    }

    /// Report form field statistics, UTF-8 aware (`dump_data_fields_utf8`).
    pub fn dump_data_fields_utf8(mut self) -> Self {
        self.operations.push(Operation::DumpDataFieldsUtf8);
        self
    }

    /// Report link annotations (`dump_data_annots`).
    pub fn dump_data_annots(mut self) -> Self {
        self.operations.push(Operation::DumpDataAnnots);
        self
    }

    /// Generate an FDF file from the input form (`generate_fdf`).
    pub fn generate_fdf(mut self) -> Self {
        self.operations.push(Operation::GenerateFdf);
        self
    }

    // ---- attachments ----

    /// Attach files to the document (`attach_files`).
    ///
    /// An empty list is rejected here, before any process is spawned.
    pub fn attach_files<I, P>(self, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.attach(files, None)
    }

    /// Attach files to a specific page (`attach_files ... to_page <n>`).
    pub fn attach_files_to_page<I, P>(self, files: I, page: u32) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.attach(files, Some(page))
    }

    fn attach<I, P>(mut self, files: I, to_page: Option<u32>) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        if files.is_empty() {
            return Err(Error::invalid_request("attachment list is empty"));
        }
        self.operations.push(Operation::AttachFiles { files, to_page });
        Ok(self)
    }

    // ---- passwords ----

    /// Supply a password for opening the input documents (`input_pw`).
    pub fn input_pw(mut self, password: impl Into<String>) -> Self {
        self.input_passwords.push(password.into());
        self
    }

    /// Set the owner password on the output (`owner_pw`).
    pub fn owner_pw(mut self, password: impl Into<String>) -> Self {
        self.output_options
            .push(OutputOption::OwnerPw(password.into()));
        self
    }

    /// Set the user password on the output (`user_pw`).
    pub fn user_pw(mut self, password: impl Into<String>) -> Self {
        self.output_options
            .push(OutputOption::UserPw(password.into()));
        self
    }

    // ---- output-shaping options ----

    /// Merge form fields into the page content (`flatten`).
    pub fn flatten(mut self) -> Self {
        self.output_options.push(OutputOption::Flatten);
        self
    }

    /// Ask the viewer to regenerate field appearances (`need_appearances`).
    pub fn need_appearances(mut self) -> Self {
        self.output_options.push(OutputOption::NeedAppearances);
        self
    }

    /// Restore compression on page streams (`compress`).
    pub fn compress(mut self) -> Self {
        self.output_options.push(OutputOption::Compress);
        self
    }

    /// Remove compression from page streams (`uncompress`).
    pub fn uncompress(mut self) -> Self {
        self.output_options.push(OutputOption::Uncompress);
        self
    }

    /// Keep the document ID of the first input (`keep_first_id`).
    pub fn keep_first_id(mut self) -> Self {
        self.output_options.push(OutputOption::KeepFirstId);
        self
    }

    /// Keep the document ID of the final input (`keep_final_id`).
    pub fn keep_final_id(mut self) -> Self {
        self.output_options.push(OutputOption::KeepFinalId);
        self
    }

    /// Discard XFA form data (`drop_xfa`).
    pub fn drop_xfa(mut self) -> Self {
        self.output_options.push(OutputOption::DropXfa);
        self
    }

    /// Enable verbose tool output (`verbose`).
    pub fn verbose(mut self) -> Self {
        self.output_options.push(OutputOption::Verbose);
        self
    }

    /// Prompt interactively on conflicts (`do_ask`).
    pub fn do_ask(mut self) -> Self {
        self.output_options.push(OutputOption::DoAsk);
        self
    }

    /// Never prompt interactively (`dont_ask`).
    pub fn dont_ask(mut self) -> Self {
        self.output_options.push(OutputOption::DontAsk);
        self
    }

    /// Use 40-bit encryption (`encrypt_40bit`).
    pub fn encrypt_40bit(mut self) -> Self {
        self.output_options.push(OutputOption::Encrypt40Bit);
        self
    }

    /// Use 128-bit encryption (`encrypt_128bit`).
    pub fn encrypt_128bit(mut self) -> Self {
        self.output_options.push(OutputOption::Encrypt128Bit);
        self
    }

    /// Grant permissions on an encrypted output (`allow`), e.g. `Printing`.
    pub fn allow<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_options.push(OutputOption::Allow(
            permissions.into_iter().map(Into::into).collect(),
        ));
        self
    }

    // ---- output ----

    /// Direct the tool itself to write its result to `path` instead of
    /// stdout. The captured stdout buffer will then usually be empty.
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Execute the request and return the captured stdout buffer.
    pub async fn output(mut self) -> Result<Vec<u8>> {
        let args = self.render_args();
        let staged = std::mem::take(&mut self.staged);
        let result = exec::run(
            &self.config,
            args,
            self.stdin_payload.take(),
            self.write_file.take(),
        )
        .await;
        // Staged inputs are removed on every terminal path, success or not.
        exec::cleanup(&staged).await;
        result
    }

    /// Execute the request, persist the captured stdout buffer to `path`,
    /// and return the buffer. A persistence failure overrides success.
    pub async fn output_to_file(mut self, path: impl Into<PathBuf>) -> Result<Vec<u8>> {
        self.write_file = Some(path.into());
        self.output().await
    }

    /// Split the document into one file per page under `dir` (`burst`).
    ///
    /// Terminal shortcut: consumes the builder and executes immediately.
    pub async fn burst(mut self, dir: impl Into<PathBuf>) -> Result<Vec<u8>> {
        self.operations.push(Operation::Burst);
        self.destination = Some(dir.into().join("pg_%04d.pdf"));
        self.output().await
    }

    /// Extract attachments into `dir` (`unpack_files`).
    ///
    /// Terminal shortcut: consumes the builder and executes immediately.
    pub async fn unpack_files(mut self, dir: impl Into<PathBuf>) -> Result<Vec<u8>> {
        self.operations.push(Operation::UnpackFiles);
        self.destination = Some(dir.into());
        self.output().await
    }

    /// Render the final argument vector: sources, input passwords, operation
    /// tokens, the `output` marker with its destination (stdout by default),
    /// then the trailing options in call order.
    fn render_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for source in &self.sources {
            args.push(source.token());
        }
        for password in &self.input_passwords {
            args.push("input_pw".into());
            args.push(password.clone());
        }
        for op in &self.operations {
            op.render(&mut args);
        }

        args.push("output".into());
        args.push(match &self.destination {
            Some(path) => path.to_string_lossy().into_owned(),
            None => "-".into(),
        });

        for option in &self.output_options {
            option.render(&mut args);
        }

        args
    }
}

impl Drop for Request {
    /// Staged inputs must not outlive the request. Execution empties
    /// `staged` before cleanup, so this only fires for requests that were
    /// built but never run. Best-effort, like all staged-file removal.
    fn drop(&mut self) {
        for path in &self.staged {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("failed to remove staged input {}: {e}", path.display());
            }
        }
    }
}
