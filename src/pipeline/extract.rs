//! Record extraction: turn one validated page chunk into security records.
//!
//! Columns are positional. `pdftotext -layout` reproduces the printed grid, so
//! every data line lines up under the labels of the page's fourth header line:
//!
//! ```text
//! CUSIP NO    ISSUER NAME                   ISSUER DESCRIPTION        STATUS
//! 037833 10 0*APPLE INC                     COM                       ADDED
//! ^           ^                             ^
//! cusip       issuer                        description (to end of line)
//! ```
//!
//! Offsets are measured in characters, not bytes, and re-derived for every
//! page because some quarters shift the grid between pages. The STATUS column
//! has no boundary of its own; it falls inside the description slice, which is
//! why `ADDED` / `DELETED` are detected and then stripped from the description.

use crate::error::SeclistError;
use crate::output::{PageRecords, SecurityRecord};
use crate::pipeline::header::{validate_header, HEADER_LINES};
use crate::pipeline::segment::{PageChunk, PAGE_FEED};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Character appended to a CUSIP to flag an optionable security.
pub const OPTIONABLE_MARKER: char = '*';

const ADDED: &str = "ADDED";
const DELETED: &str = "DELETED";

static RE_RUN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)run\s*?date:\s*?[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}").unwrap()
});

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}").unwrap());

static RE_PAGE_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)page\s*?([0-9]{1,40})").unwrap());

static RE_CUSIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{6} [A-Za-z0-9]{2} [A-Za-z0-9]$").unwrap());

/// Whether `cusip` has the normalised `XXXXXX XX X` shape.
pub fn is_valid_cusip(cusip: &str) -> bool {
    RE_CUSIP.is_match(cusip)
}

/// Extract the `m/d/yyyy` run date from the first header line.
pub fn extract_date(line: &str, chunk: usize) -> Result<String, SeclistError> {
    RE_RUN_DATE
        .find(line)
        .and_then(|token| RE_DATE.find(token.as_str()))
        .map(|date| date.as_str().to_string())
        .ok_or_else(|| SeclistError::DateExtraction {
            chunk,
            after_page: None,
            line: line.to_string(),
        })
}

/// Extract the printed page number from the first header line.
pub fn extract_page_number(line: &str, chunk: usize) -> Result<usize, SeclistError> {
    RE_PAGE_NUM
        .captures(line)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .ok_or_else(|| SeclistError::PageNumberExtraction {
            chunk,
            after_page: None,
            line: line.to_string(),
        })
}

/// Character offsets where each column starts, taken from the label line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub cusip: usize,
    pub issuer: usize,
    pub description: usize,
}

impl ColumnLayout {
    /// Derive the layout from the fourth header line.
    pub fn from_header(labels: &str, chunk: usize) -> Result<Self, SeclistError> {
        let offset = |label: &str| {
            labels
                .find(label)
                .map(|byte_idx| labels[..byte_idx].chars().count())
                .ok_or_else(|| SeclistError::HeaderValidation {
                    chunk,
                    after_page: None,
                    detail: format!("column label '{label}' missing"),
                })
        };
        Ok(Self {
            cusip: offset("CUSIP NO")?,
            issuer: offset("ISSUER NAME")?,
            description: offset("ISSUER DESCRIPTION")?,
        })
    }

    /// Split a data line into raw `(cusip, issuer, description)` slices.
    pub fn slice<'l>(&self, line: &'l str) -> (&'l str, &'l str, &'l str) {
        (
            slice_chars(line, self.cusip, Some(self.issuer)),
            slice_chars(line, self.issuer, Some(self.description)),
            slice_chars(line, self.description, None),
        )
    }
}

/// `line[start..end]` in character positions, clamped to the line like a
/// sequence slice: out-of-range bounds shrink, inverted bounds give `""`.
fn slice_chars(line: &str, start: usize, end: Option<usize>) -> &str {
    let byte_at = |n: usize| {
        line.char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    };
    let s = byte_at(start);
    let e = end.map(byte_at).unwrap_or(line.len());
    if s >= e {
        ""
    } else {
        &line[s..e]
    }
}

/// Whether a line is the `total count` footer.
pub fn is_total_count_line(line: &str) -> bool {
    line.to_lowercase().contains("total count")
}

/// Read the declared total from a footer line: every digit, concatenated.
pub fn parse_total_count(line: &str, page: usize) -> Result<usize, SeclistError> {
    let digits: String = line.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<usize>()
        .map_err(|_| SeclistError::TotalCountExtraction {
            page,
            line: line.to_string(),
        })
}

/// Parse one data line into a record.
///
/// `line_no` is the 1-based line within the page, used only for errors.
pub fn parse_record(
    line: &str,
    layout: &ColumnLayout,
    date: &str,
    page: usize,
    line_no: usize,
) -> Result<SecurityRecord, SeclistError> {
    let (raw_cusip, raw_issuer, raw_description) = layout.slice(line);

    let cusip = raw_cusip.replace(OPTIONABLE_MARKER, "").trim().to_string();
    if !is_valid_cusip(&cusip) {
        return Err(SeclistError::MalformedRecord {
            page,
            line_no,
            cusip,
        });
    }

    let description = raw_description
        .replace(ADDED, "")
        .replace(DELETED, "")
        .trim()
        .to_string();

    Ok(SecurityRecord {
        cusip,
        issuer: raw_issuer.trim().to_string(),
        description,
        date: date.to_string(),
        page,
        optionable: raw_cusip.contains(OPTIONABLE_MARKER),
        added: raw_description.contains(ADDED),
        deleted: raw_description.contains(DELETED),
    })
}

/// Extract every record from one page chunk.
///
/// The chunk must end with the form feed. Header validation runs before any
/// record is produced; any failure rejects the whole page.
pub fn extract_page(chunk: &PageChunk<'_>) -> Result<PageRecords, SeclistError> {
    let body = match chunk.bytes.split_last() {
        Some((&PAGE_FEED, body)) => body,
        _ => return Err(SeclistError::MissingPageFeed { chunk: chunk.index }),
    };
    let text = std::str::from_utf8(body).map_err(|source| SeclistError::InvalidText {
        chunk: chunk.index,
        source,
    })?;

    let lines: Vec<&str> = text.split('\n').collect();
    validate_header(&lines[..lines.len().min(HEADER_LINES)], chunk.index)?;

    let date = extract_date(lines[0], chunk.index)?;
    let page = extract_page_number(lines[0], chunk.index)?;
    let layout = ColumnLayout::from_header(lines[3], chunk.index)?;

    let mut records = Vec::new();
    let mut declared_total = None;

    for (offset, line) in lines.iter().enumerate().skip(HEADER_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        if is_total_count_line(line) {
            declared_total = Some(parse_total_count(line, page)?);
            continue;
        }
        records.push(parse_record(line, &layout, &date, page, offset + 1)?);
    }

    debug!(
        "Page {} ({}): {} records, declared total {:?}",
        page,
        date,
        records.len(),
        declared_total
    );

    Ok(PageRecords {
        page,
        date,
        records,
        declared_total,
    })
}
