//! Document-level parsing entry points.
//!
//! A document is accepted only as a whole: records from every page are
//! concatenated, and the total must equal the count declared by the last
//! `total count` footer. Any page error, or a count disagreement, rejects the
//! document and no records are returned.

use crate::config::ParseConfig;
use crate::error::SeclistError;
use crate::export;
use crate::output::{ParseOutput, ParseStats, ParsedDocument};
use crate::pipeline::extract::extract_page;
use crate::pipeline::locate::locate_index;
use crate::pipeline::render::{PageRange, PdftotextRenderer, Renderer};
use crate::pipeline::segment;
use crate::progress::ProgressCallback;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Parse a securities-list PDF with the `pdftotext` renderer from `config`.
///
/// # Errors
/// Returns the first error encountered; see [`crate::error::ErrorKind`] for
/// the taxonomy. Every error rejects the whole document.
pub async fn parse_document(
    pdf_path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseOutput, SeclistError> {
    let renderer = PdftotextRenderer::from_config(config);
    parse_document_with(&renderer, pdf_path, config).await
}

/// Parse a securities-list PDF with any [`Renderer`].
pub async fn parse_document_with<R: Renderer>(
    renderer: &R,
    pdf_path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseOutput, SeclistError> {
    let total_start = Instant::now();
    let pdf_path = pdf_path.as_ref();
    info!("Parsing securities list: {}", pdf_path.display());

    // ── Step 1: Locate the first index page ──────────────────────────────
    let first_page = locate_index(renderer, pdf_path, config).await?;

    // ── Step 2: Render from there to the end ─────────────────────────────
    let text = renderer.render(pdf_path, PageRange::starting_at(first_page)).await?;
    let render_duration_ms = total_start.elapsed().as_millis() as u64;
    debug!("Rendered {} bytes in {}ms", text.len(), render_duration_ms);

    // ── Step 3: Segment, extract, reconcile ──────────────────────────────
    let parse_start = Instant::now();
    let name = document_name(pdf_path);
    let document = aggregate(&text, &name, config.progress_callback.as_ref())?;
    let parse_duration_ms = parse_start.elapsed().as_millis() as u64;

    let stats = ParseStats {
        first_index_page: first_page,
        pages: document.page_count,
        records: document.records.len(),
        render_duration_ms,
        parse_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Parsed {} securities from {} pages in {}ms",
        stats.records, stats.pages, stats.total_duration_ms
    );

    Ok(ParseOutput { document, stats })
}

/// Parse already-rendered document text (starting at or before the first
/// index page).
///
/// This is the pure core of the parser: no subprocess, no I/O.
pub fn parse_text(text: &[u8]) -> Result<ParsedDocument, SeclistError> {
    aggregate(text, "<text>", None)
}

/// Parse and write the records as CSV to `output_path`.
///
/// Uses atomic write (temp file + rename) so a rejected document never leaves
/// a partial CSV behind.
pub async fn parse_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseStats, SeclistError> {
    let output = parse_document(pdf_path, config).await?;
    export::write_csv_file(output_path.as_ref(), output.records()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`parse_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn parse_document_sync(
    pdf_path: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<ParseOutput, SeclistError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SeclistError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(parse_document(pdf_path, config))
}

/// Parse PDF bytes held in memory.
///
/// The renderer needs a file path, so the bytes go to a managed
/// [`tempfile`] that is removed when this returns.
pub async fn parse_bytes(bytes: &[u8], config: &ParseConfig) -> Result<ParseOutput, SeclistError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| SeclistError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| SeclistError::Internal(format!("tempfile write: {e}")))?;
    tmp.flush()
        .map_err(|e| SeclistError::Internal(format!("tempfile flush: {e}")))?;
    parse_document(tmp.path(), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Walk every page chunk, concatenate records, and check the declared total.
///
/// The last declared total in document order wins.
fn aggregate(
    text: &[u8],
    name: &str,
    progress: Option<&ProgressCallback>,
) -> Result<ParsedDocument, SeclistError> {
    let mut records = Vec::new();
    let mut expected_total = None;
    let mut page_count = 0usize;
    let mut last_page = None;

    for chunk in segment::pages(text) {
        let page = extract_page(&chunk).map_err(|e| match last_page {
            Some(prev) => e.after_printed_page(prev),
            None => e,
        })?;
        last_page = Some(page.page);
        if let Some(cb) = progress {
            cb.on_page_parsed(name, page.page, page.records.len());
        }
        if page.declared_total.is_some() {
            expected_total = page.declared_total;
        }
        records.extend(page.records);
        page_count += 1;
    }

    let parsed = records.len();
    match expected_total {
        Some(expected) if expected == parsed => Ok(ParsedDocument {
            records,
            expected_total: expected,
            page_count,
        }),
        Some(expected) => Err(SeclistError::CountMismatch { parsed, expected }),
        None => Err(SeclistError::MissingTotalCount { parsed }),
    }
}

/// Display name used in progress events and logs.
pub(crate) fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const LABELS: &str = "CUSIP NO    ISSUER NAME                   ISSUER DESCRIPTION        STATUS";

    fn page(num: usize, rows: &[&str], footer: Option<&str>) -> String {
        let mut s = format!(
            "Run Date: 1/2/2020      List of 13F Securities      Page {num}\n\
             Run Time: 10:00                                   Year 2020\n\n{LABELS}\n"
        );
        for row in rows {
            s.push_str(row);
            s.push('\n');
        }
        if let Some(f) = footer {
            s.push_str(f);
            s.push('\n');
        }
        s.push('\x0c');
        s
    }

    const ROW_A: &str = "123456 78 9 ACME CORP                     WIDGET MAKER";
    const ROW_B: &str = "98765A 43 2*BETA INC                      COM                       ADDED";

    #[test]
    fn last_footer_wins() {
        let text = page(1, &[ROW_A], Some("Total Count: 7")) + &page(2, &[ROW_B], Some("Total Count: 2"));
        let doc = parse_text(text.as_bytes()).unwrap();
        assert_eq!(doc.records.len(), 2);
        assert_eq!(doc.expected_total, 2);
        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.records[0].page, 1);
        assert_eq!(doc.records[1].page, 2);
    }

    #[test]
    fn missing_footer_is_rejected() {
        let text = page(1, &[ROW_A], None);
        let err = parse_text(text.as_bytes()).unwrap_err();
        assert!(matches!(err, SeclistError::MissingTotalCount { parsed: 1 }));
        assert_eq!(err.kind(), ErrorKind::CountMismatch);
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = parse_text(b"").unwrap_err();
        assert!(matches!(err, SeclistError::MissingTotalCount { parsed: 0 }));
    }

    #[test]
    fn count_mismatch_reports_both_numbers() {
        let text = page(1, &[ROW_A], Some("Total Count: 2"));
        match parse_text(text.as_bytes()).unwrap_err() {
            SeclistError::CountMismatch { parsed, expected } => assert_eq!((parsed, expected), (1, 2)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn document_name_uses_file_name() {
        assert_eq!(document_name(Path::new("/data/raw/1_2020.pdf")), "1_2020.pdf");
    }
}
