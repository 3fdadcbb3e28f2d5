//! Page header validation.
//!
//! Every index page begins with the same four-line block:
//!
//! ```text
//! RUN DATE: 3/31/2021                 ...               PAGE 1
//! RUN TIME: 10:00                     ...          YEAR 2021
//!
//! CUSIP NO    ISSUER NAME            ISSUER DESCRIPTION      STATUS
//! ```
//!
//! Column offsets are derived from line 3, so a page whose header drifts
//! from this shape cannot be sliced safely and is rejected outright.

use crate::error::SeclistError;

/// Number of header lines preceding the data rows.
pub const HEADER_LINES: usize = 4;

/// Column labels required on the fourth header line (case-sensitive).
pub const COLUMN_LABELS: [&str; 4] = ["CUSIP NO", "ISSUER NAME", "ISSUER DESCRIPTION", "STATUS"];

/// Check the first four lines of a page against the expected header layout.
///
/// `chunk` is the page's position within the document and is only used to
/// label the error.
pub fn validate_header<S: AsRef<str>>(lines: &[S], chunk: usize) -> Result<(), SeclistError> {
    let fail = |detail: String| SeclistError::HeaderValidation {
        chunk,
        after_page: None,
        detail,
    };

    if lines.len() < HEADER_LINES {
        return Err(fail(format!(
            "expected {HEADER_LINES} header lines, found {}",
            lines.len()
        )));
    }

    let first = lines[0].as_ref().to_lowercase();
    for label in ["run date", "page"] {
        if !first.contains(label) {
            return Err(fail(format!("line 1 lacks '{label}'")));
        }
    }

    let second = lines[1].as_ref().to_lowercase();
    for label in ["run time", "year"] {
        if !second.contains(label) {
            return Err(fail(format!("line 2 lacks '{label}'")));
        }
    }

    if !lines[2].as_ref().is_empty() {
        return Err(fail(format!(
            "line 3 should be empty, found {:?}",
            lines[2].as_ref()
        )));
    }

    let labels = lines[3].as_ref();
    for label in COLUMN_LABELS {
        if !labels.contains(label) {
            return Err(fail(format!("column label '{label}' missing")));
        }
    }

    Ok(())
}
