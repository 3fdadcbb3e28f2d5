//! End-to-end parsing tests over an in-memory renderer.
//!
//! `FakeRenderer` serves pre-rendered page text per file name, so these tests
//! exercise location, segmentation, extraction, reconciliation, batch mode and
//! CSV output without poppler installed.

use seclist::{
    parse_directory_with, parse_document_with, ErrorKind, PageRange, ParseConfig,
    ParseProgressCallback, Renderer, SeclistError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const LABELS: &str = "CUSIP NO    ISSUER NAME                   ISSUER DESCRIPTION        STATUS";

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Serves `docs[file_name][page - 1]` for each requested page.
#[derive(Default)]
struct FakeRenderer {
    docs: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl FakeRenderer {
    fn with(mut self, name: &str, pages: Vec<String>) -> Self {
        self.docs.insert(name.to_string(), pages);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for FakeRenderer {
    async fn render(&self, pdf_path: &Path, pages: PageRange) -> Result<Vec<u8>, SeclistError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let doc = self.docs.get(name).ok_or_else(|| SeclistError::RenderFailed {
            path: pdf_path.to_path_buf(),
            status: "exit status: 1".into(),
            detail: "Syntax Error: Couldn't find trailer dictionary".into(),
        })?;
        let last = pages
            .last
            .map(|l| l as usize)
            .unwrap_or(doc.len())
            .min(doc.len());
        let mut out = Vec::new();
        for page in doc.iter().take(last).skip(pages.first as usize - 1) {
            out.extend_from_slice(page.as_bytes());
        }
        Ok(out)
    }
}

fn row(cusip: &str, issuer: &str, description: &str) -> String {
    format!("{cusip:<12}{issuer:<30}{description}")
}

fn cover_page() -> String {
    "                OFFICIAL LIST OF SECTION 13(f) SECURITIES\n\n\
     The list is published quarterly.\n\x0c"
        .to_string()
}

fn index_page_with(labels: &str, num: usize, rows: &[String], footer: Option<&str>) -> String {
    let mut s = format!(
        "Run Date: 1/2/2020          List of Section 13F Securities          Page {num}\n\
         Run Time: 10:00                                                    Year 2020\n\
         \n\
         {labels}\n"
    );
    for r in rows {
        s.push_str(r);
        s.push('\n');
    }
    if let Some(f) = footer {
        s.push('\n');
        s.push_str(f);
        s.push('\n');
    }
    s.push('\x0c');
    s
}

fn index_page(num: usize, rows: &[String], footer: Option<&str>) -> String {
    index_page_with(LABELS, num, rows, footer)
}

fn acme() -> String {
    row("123456 78 9", "ACME CORP", "WIDGET MAKER")
}

fn config() -> ParseConfig {
    ParseConfig::default()
}

// ── Single documents ─────────────────────────────────────────────────────

#[tokio::test]
async fn single_record_after_cover_page() {
    let renderer = FakeRenderer::default().with(
        "1_2020.pdf",
        vec![cover_page(), index_page(1, &[acme()], Some("total count: 1"))],
    );

    let output = parse_document_with(&renderer, "1_2020.pdf", &config())
        .await
        .unwrap();

    assert_eq!(output.stats.first_index_page, 2);
    assert_eq!(output.stats.pages, 1);
    assert_eq!(output.document.expected_total, 1);

    let records = output.records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.cusip, "123456 78 9");
    assert_eq!(r.issuer, "ACME CORP");
    assert_eq!(r.description, "WIDGET MAKER");
    assert_eq!(r.date, "1/2/2020");
    assert_eq!(r.page, 1);
    assert!(!r.optionable && !r.added && !r.deleted);
}

#[tokio::test]
async fn flags_are_read_and_stripped() {
    let rows = [
        row("98765A 43 2*", "BETA INC", &format!("{:<26}ADDED", "COM")),
        row("11111B 22 3", "GAMMA LTD", &format!("{:<26}DELETED", "SHS CL A")),
    ];
    let renderer =
        FakeRenderer::default().with("q.pdf", vec![index_page(1, &rows, Some("Total Count: 2"))]);

    let output = parse_document_with(&renderer, "q.pdf", &config()).await.unwrap();
    let records = output.records();

    assert_eq!(records[0].cusip, "98765A 43 2");
    assert_eq!(records[0].description, "COM");
    assert!(records[0].optionable && records[0].added && !records[0].deleted);

    assert_eq!(records[1].description, "SHS CL A");
    assert!(!records[1].optionable && !records[1].added && records[1].deleted);
}

#[tokio::test]
async fn marker_inside_cusip_leaves_too_few_characters() {
    let rows = [row("1234*6 78 9", "ACME CORP", "WIDGET MAKER")];
    let renderer =
        FakeRenderer::default().with("q.pdf", vec![index_page(1, &rows, Some("total count: 1"))]);

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    match err {
        SeclistError::MalformedRecord { cusip, page, .. } => {
            assert_eq!(cusip, "12346 78 9");
            assert_eq!(page, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn declared_total_mismatch_rejects_document() {
    let renderer = FakeRenderer::default()
        .with("q.pdf", vec![index_page(1, &[acme()], Some("total count: 2"))]);

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    assert!(
        matches!(err, SeclistError::CountMismatch { parsed: 1, expected: 2 }),
        "got {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::CountMismatch);
}

#[tokio::test]
async fn missing_status_label_rejects_document() {
    let labels = "CUSIP NO    ISSUER NAME                   ISSUER DESCRIPTION";
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![index_page_with(labels, 1, &[acme()], Some("total count: 1"))],
    );

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeaderValidation);
    assert!(err.to_string().contains("STATUS"), "got {err}");
}

#[tokio::test]
async fn records_span_pages_in_order() {
    let page_one = [acme(), row("22222C 33 4", "DELTA CO", "NOTE 5.0% 2030")];
    let page_two = [row("33333D 44 5*", "EPSILON PLC", "ADR")];
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![
            index_page(1, &page_one, None),
            index_page(2, &page_two, Some("Total Count:      3")),
        ],
    );

    let output = parse_document_with(&renderer, "q.pdf", &config()).await.unwrap();
    let pages: Vec<_> = output.records().iter().map(|r| r.page).collect();
    let issuers: Vec<_> = output.records().iter().map(|r| r.issuer.as_str()).collect();
    assert_eq!(pages, [1, 1, 2]);
    assert_eq!(issuers, ["ACME CORP", "DELTA CO", "EPSILON PLC"]);
    assert_eq!(output.stats.pages, 2);
}

#[tokio::test]
async fn column_offsets_are_read_per_page() {
    // Page two's grid sits two columns to the right of page one's.
    let shifted_labels = format!("  {LABELS}");
    let shifted_row = format!("  {}", row("654321 87 6", "BETA INC", "GADGET"));
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![
            index_page(1, &[acme()], None),
            index_page_with(&shifted_labels, 2, &[shifted_row], Some("total count: 2")),
        ],
    );

    let output = parse_document_with(&renderer, "q.pdf", &config()).await.unwrap();
    let second = &output.records()[1];
    assert_eq!(second.cusip, "654321 87 6");
    assert_eq!(second.issuer, "BETA INC");
    assert_eq!(second.description, "GADGET");
    assert_eq!(output.records()[0].issuer, "ACME CORP");
}

#[tokio::test]
async fn bad_header_names_preceding_printed_page() {
    let labels = "CUSIP NO    ISSUER NAME                   ISSUER DESCRIPTION";
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![
            cover_page(),
            index_page(7, &[acme()], None),
            index_page_with(labels, 8, &[acme()], Some("total count: 2")),
        ],
    );

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            SeclistError::HeaderValidation { chunk: 2, after_page: Some(7), .. }
        ),
        "got {err:?}"
    );
    assert!(err.to_string().contains("after printed page 7"), "got {err}");
}

#[tokio::test]
async fn thousands_separator_in_footer() {
    let rows: Vec<String> = (0..3)
        .map(|i| row(&format!("00000{i} 00 0"), "ISSUER", "COM"))
        .collect();
    // "1,003" reads as 1003, so three records cannot satisfy it.
    let renderer = FakeRenderer::default()
        .with("q.pdf", vec![index_page(1, &rows, Some("Total Count: 1,003"))]);

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    assert!(
        matches!(err, SeclistError::CountMismatch { parsed: 3, expected: 1003 }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn parsing_is_repeatable() {
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![index_page(1, &[acme()], Some("total count: 1"))],
    );

    let first = parse_document_with(&renderer, "q.pdf", &config()).await.unwrap();
    let second = parse_document_with(&renderer, "q.pdf", &config()).await.unwrap();
    assert_eq!(first.document, second.document);
}

// ── Locator ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn too_many_cover_pages_is_index_not_found() {
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![
            cover_page(),
            cover_page(),
            cover_page(),
            index_page(1, &[acme()], Some("total count: 1")),
        ],
    );

    let err = parse_document_with(&renderer, "q.pdf", &config())
        .await
        .unwrap_err();
    assert!(
        matches!(err, SeclistError::IndexNotFound { searched: 3, .. }),
        "got {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(renderer.calls(), 3);
}

#[tokio::test]
async fn wider_cover_allowance_finds_later_index() {
    let renderer = FakeRenderer::default().with(
        "q.pdf",
        vec![
            cover_page(),
            cover_page(),
            cover_page(),
            index_page(1, &[acme()], Some("total count: 1")),
        ],
    );
    let config = ParseConfig::builder().max_cover_pages(3).build().unwrap();

    let output = parse_document_with(&renderer, "q.pdf", &config).await.unwrap();
    assert_eq!(output.stats.first_index_page, 4);
    // Four single-page probes, then one render to the end.
    assert_eq!(renderer.calls(), 5);
}

#[tokio::test]
async fn render_failure_propagates() {
    let renderer = FakeRenderer::default();
    let err = parse_document_with(&renderer, "unknown.pdf", &config())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
}

// ── Batch mode ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ParseProgressCallback for Recorder {
    fn on_batch_start(&self, total_documents: usize) {
        self.push(format!("batch_start {total_documents}"));
    }
    fn on_document_skipped(&self, name: &str) {
        self.push(format!("skipped {name}"));
    }
    fn on_document_complete(&self, name: &str, count: usize) {
        self.push(format!("complete {name} {count}"));
    }
    fn on_document_error(&self, name: &str, _error: &str) {
        self.push(format!("error {name}"));
    }
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.push(format!("batch_complete {total_documents} {success_count}"));
    }
}

fn batch_renderer() -> FakeRenderer {
    FakeRenderer::default()
        .with(
            "1_2020.pdf",
            vec![index_page(1, &[acme()], Some("total count: 1"))],
        )
        .with(
            "2_2020.pdf",
            vec![index_page(1, &[acme()], Some("total count: 5"))],
        )
}

fn raw_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["1_2020.pdf", "2_2020.pdf", "README.txt"] {
        std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
    }
    dir
}

#[tokio::test]
async fn batch_collects_failures_when_asked() {
    let raw = raw_dir();
    let out = tempfile::tempdir().unwrap();
    let parsed_dir = out.path().join("parsed");
    let recorder = Arc::new(Recorder::default());
    let config = ParseConfig::builder()
        .continue_on_error(true)
        .concurrency(1)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let summary = parse_directory_with(&batch_renderer(), raw.path(), &parsed_dir, &config)
        .await
        .unwrap();

    assert_eq!(summary.parsed.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].source.ends_with("2_2020.pdf"));
    assert_eq!(summary.total_records(), 1);

    let csv = std::fs::read_to_string(parsed_dir.join("1_2020.csv")).unwrap();
    assert_eq!(
        csv,
        "cusip,issuer,description,date,page,optionable,added,deleted\n\
         123456 78 9,ACME CORP,WIDGET MAKER,1/2/2020,1,False,False,False\n"
    );
    assert!(!parsed_dir.join("2_2020.csv").exists());
    assert!(!parsed_dir.join("README.csv").exists());

    let events = recorder.events();
    assert_eq!(events.first().map(String::as_str), Some("batch_start 2"));
    assert!(events.contains(&"complete 1_2020.pdf 1".to_string()));
    assert!(events.contains(&"error 2_2020.pdf".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("batch_complete 2 1"));
}

#[tokio::test]
async fn batch_aborts_on_first_failure_by_default() {
    let raw = raw_dir();
    let out = tempfile::tempdir().unwrap();
    let config = ParseConfig::builder().concurrency(1).build().unwrap();

    let err = parse_directory_with(&batch_renderer(), raw.path(), out.path(), &config)
        .await
        .unwrap_err();

    match &err {
        SeclistError::Document { path, .. } => assert!(path.ends_with("2_2020.pdf")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::CountMismatch);
}

#[tokio::test]
async fn batch_skips_existing_outputs() {
    let raw = raw_dir();
    let out = tempfile::tempdir().unwrap();
    let config = ParseConfig::builder().continue_on_error(true).build().unwrap();
    let renderer = batch_renderer();

    parse_directory_with(&renderer, raw.path(), out.path(), &config)
        .await
        .unwrap();
    let calls_after_first = renderer.calls();

    let recorder = Arc::new(Recorder::default());
    let config = ParseConfig::builder()
        .continue_on_error(true)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let summary = parse_directory_with(&renderer, raw.path(), out.path(), &config)
        .await
        .unwrap();

    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].ends_with("1_2020.pdf"));
    assert!(summary.parsed.is_empty());
    assert_eq!(summary.failed.len(), 1);
    // Only the failing document was rendered again: one probe plus one full render.
    assert_eq!(renderer.calls(), calls_after_first + 2);
    assert!(recorder.events().contains(&"skipped 1_2020.pdf".to_string()));
}

#[tokio::test]
async fn batch_replace_existing_reparses_everything() {
    let raw = raw_dir();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(out.path().join("1_2020.csv"), "stale").unwrap();
    std::fs::write(out.path().join("orphan.csv"), "stale").unwrap();

    let config = ParseConfig::builder()
        .continue_on_error(true)
        .replace_existing(true)
        .build()
        .unwrap();
    let summary = parse_directory_with(&batch_renderer(), raw.path(), out.path(), &config)
        .await
        .unwrap();

    assert_eq!(summary.parsed.len(), 1);
    assert!(summary.skipped.is_empty());
    assert!(!out.path().join("orphan.csv").exists());
    let csv = std::fs::read_to_string(out.path().join("1_2020.csv")).unwrap();
    assert!(csv.starts_with("cusip,"));
}

#[tokio::test]
async fn batch_missing_input_dir() {
    let out = tempfile::tempdir().unwrap();
    let err = parse_directory_with(
        &FakeRenderer::default(),
        out.path().join("nope"),
        out.path().join("parsed"),
        &config(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SeclistError::FileNotFound { .. }), "got {err:?}");
}
