//! Result types: parsed records, per-page results, and document summaries.

use serde::{Deserialize, Serialize};

/// One row of the securities list.
///
/// Field order matches the column order of the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityRecord {
    /// Normalised CUSIP, e.g. `"037833 10 0"`.
    pub cusip: String,
    /// Issuer name.
    pub issuer: String,
    /// Issue description with `ADDED` / `DELETED` status markers removed.
    pub description: String,
    /// Run date printed in the page header (`m/d/yyyy`).
    pub date: String,
    /// Page number printed in the page header.
    pub page: usize,
    /// The raw CUSIP carried the `*` optionable marker.
    pub optionable: bool,
    /// The raw description carried `ADDED`.
    pub added: bool,
    /// The raw description carried `DELETED`.
    pub deleted: bool,
}

impl SecurityRecord {
    /// Column names, in export order.
    pub const FIELDS: [&'static str; 8] = [
        "cusip",
        "issuer",
        "description",
        "date",
        "page",
        "optionable",
        "added",
        "deleted",
    ];
}

/// Everything extracted from one page chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecords {
    /// Page number printed in the header.
    pub page: usize,
    /// Run date printed in the header.
    pub date: String,
    /// Records in line order.
    pub records: Vec<SecurityRecord>,
    /// Value of the page's `total count` footer, if it has one.
    pub declared_total: Option<usize>,
}

/// A fully parsed and reconciled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// All records, in document order.
    pub records: Vec<SecurityRecord>,
    /// Total declared by the last `total count` footer. Always equals
    /// `records.len()`.
    pub expected_total: usize,
    /// Number of page chunks processed.
    pub page_count: usize,
}

/// Timing and size statistics for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Physical (1-based) page where the index starts.
    pub first_index_page: u32,
    /// Page chunks parsed.
    pub pages: usize,
    /// Records extracted.
    pub records: usize,
    /// Wall-clock time spent locating the index and rendering text.
    pub render_duration_ms: u64,
    /// Wall-clock time spent segmenting and extracting.
    pub parse_duration_ms: u64,
    /// Total wall-clock time.
    pub total_duration_ms: u64,
}

/// Result of [`crate::parse::parse_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutput {
    pub document: ParsedDocument,
    pub stats: ParseStats,
}

impl ParseOutput {
    /// Shorthand for `self.document.records`.
    pub fn records(&self) -> &[SecurityRecord] {
        &self.document.records
    }
}
