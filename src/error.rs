//! Error types for the seclist library.
//!
//! Every failure is reported through a single enum, [`SeclistError`]. Unlike a
//! best-effort text converter, a securities list is either parsed completely
//! and reconciled against its declared total, or it is rejected: there is no
//! per-page or per-row partial success. Each variant therefore names the page,
//! line, or value at fault so the caller can decide whether to skip the
//! document, log it, or abort a batch.
//!
//! [`SeclistError::kind`] groups the variants into the coarse taxonomy used by
//! orchestration code ([`ErrorKind`]).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All errors returned by the seclist library.
#[derive(Debug, Error)]
pub enum SeclistError {
    // ── Render errors ─────────────────────────────────────────────────────
    /// Input document was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The external text renderer could not be started.
    #[error(
        "Text renderer '{program}' could not be started: {source}\n\
Install poppler-utils (provides `pdftotext`) or pass --pdftotext <PATH>."
    )]
    RendererUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran but exited unsuccessfully.
    #[error("Rendering '{path}' failed ({status}): {detail}")]
    RenderFailed {
        path: PathBuf,
        status: String,
        detail: String,
    },

    /// The renderer did not finish within the configured timeout.
    #[error("Rendering '{path}' timed out after {limit:?}\nIncrease --render-timeout.")]
    RenderTimeout { path: PathBuf, limit: Duration },

    // ── Structural errors ─────────────────────────────────────────────────
    /// No page within the search bound carries the index header.
    #[error("No securities index found in the first {searched} pages of '{path}' (more cover pages than expected)")]
    IndexNotFound { path: PathBuf, searched: u32 },

    /// A page chunk does not end with the form-feed byte.
    #[error("Page chunk {chunk}: form feed should be the final byte")]
    MissingPageFeed { chunk: usize },

    /// A page chunk is not valid UTF-8.
    #[error("Page chunk {chunk}: text is not valid UTF-8: {source}")]
    InvalidText {
        chunk: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    // ── Page errors ───────────────────────────────────────────────────────
    /// The four-line page header does not have the expected shape.
    ///
    /// `chunk` counts index pages from the first one; `after_page` is the
    /// printed number of the last page that parsed, when there was one.
    #[error("Page chunk {chunk}{}: malformed page header: {detail}", after_suffix(.after_page))]
    HeaderValidation {
        chunk: usize,
        after_page: Option<usize>,
        detail: String,
    },

    /// The header's first line carries no `Run Date: m/d/yyyy` token.
    #[error("Page chunk {chunk}{}: no run date found in header line {line:?}", after_suffix(.after_page))]
    DateExtraction {
        chunk: usize,
        after_page: Option<usize>,
        line: String,
    },

    /// The header's first line carries no `Page N` token.
    #[error("Page chunk {chunk}{}: no page number found in header line {line:?}", after_suffix(.after_page))]
    PageNumberExtraction {
        chunk: usize,
        after_page: Option<usize>,
        line: String,
    },

    /// A `total count` footer without a usable number.
    #[error("Page {page}: unreadable total count footer {line:?}")]
    TotalCountExtraction { page: usize, line: String },

    /// A data line whose CUSIP does not have the `XXXXXX XX X` shape.
    #[error("Page {page}, line {line_no}: malformed CUSIP {cusip:?}")]
    MalformedRecord {
        page: usize,
        line_no: usize,
        cusip: String,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// Parsed record count disagrees with the declared total.
    #[error("Total securities {parsed} does not match expectation {expected}")]
    CountMismatch { parsed: usize, expected: usize },

    /// No page declared a total count, so the document cannot be reconciled.
    #[error("Total securities {parsed} cannot be checked: no 'total count' footer found")]
    MissingTotalCount { parsed: usize },

    /// A document in a batch was rejected; wraps the underlying error.
    #[error("Document '{path}' rejected: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: Box<SeclistError>,
    },

    // ── Download errors ───────────────────────────────────────────────────
    /// An HTTP request failed or returned a non-success status.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// An HTTP request exceeded the configured timeout on every attempt.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write, or remove an output file or directory.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`SeclistError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The renderer is missing, failed, timed out, or the input does not exist.
    Render,
    /// The document text does not have the expected page structure.
    Structural,
    /// A page header is not in the expected format.
    HeaderValidation,
    /// A page header carries no run date.
    DateExtraction,
    /// A page header carries no page number.
    PageNumberExtraction,
    /// A data or footer line could not be parsed.
    MalformedRecord,
    /// The record count could not be reconciled with the declared total.
    CountMismatch,
    /// Fetching a remote document failed.
    Download,
    /// Local file-system output failed.
    Io,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl SeclistError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use SeclistError::*;
        match self {
            FileNotFound { .. }
            | RendererUnavailable { .. }
            | RenderFailed { .. }
            | RenderTimeout { .. } => ErrorKind::Render,
            IndexNotFound { .. } | MissingPageFeed { .. } | InvalidText { .. } => {
                ErrorKind::Structural
            }
            HeaderValidation { .. } => ErrorKind::HeaderValidation,
            DateExtraction { .. } => ErrorKind::DateExtraction,
            PageNumberExtraction { .. } => ErrorKind::PageNumberExtraction,
            MalformedRecord { .. } | TotalCountExtraction { .. } => ErrorKind::MalformedRecord,
            CountMismatch { .. } | MissingTotalCount { .. } => ErrorKind::CountMismatch,
            Document { source, .. } => source.kind(),
            DownloadFailed { .. } | DownloadTimeout { .. } => ErrorKind::Download,
            OutputWriteFailed { .. } => ErrorKind::Io,
            InvalidConfig(_) => ErrorKind::Config,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Record the printed number of the page before a failing page header.
    ///
    /// Other variants already name a printed page and are returned unchanged.
    pub(crate) fn after_printed_page(mut self, page: usize) -> Self {
        use SeclistError::*;
        match &mut self {
            HeaderValidation { after_page, .. }
            | DateExtraction { after_page, .. }
            | PageNumberExtraction { after_page, .. } => *after_page = Some(page),
            _ => {}
        }
        self
    }
}

fn after_suffix(page: &Option<usize>) -> String {
    page.map(|p| format!(" (after printed page {p})"))
        .unwrap_or_default()
}
