//! CSV export of parsed records.
//!
//! One header row (`cusip,issuer,description,date,page,optionable,added,deleted`)
//! followed by one row per record. Booleans are written as `True` / `False`
//! so files line up with previously published datasets.

use crate::error::SeclistError;
use crate::output::SecurityRecord;
use std::io::{self, Write};
use std::path::Path;

const SEP: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn bool_cell(v: bool) -> &'static str {
    if v {
        "True"
    } else {
        "False"
    }
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, "{SEP}")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Write the header row and every record.
pub fn write_records<W: Write>(mut w: W, records: &[SecurityRecord]) -> io::Result<()> {
    write_row(&mut w, &SecurityRecord::FIELDS)?;
    for r in records {
        let page = r.page.to_string();
        write_row(
            &mut w,
            &[
                r.cusip.as_str(),
                r.issuer.as_str(),
                r.description.as_str(),
                r.date.as_str(),
                page.as_str(),
                bool_cell(r.optionable),
                bool_cell(r.added),
                bool_cell(r.deleted),
            ],
        )?;
    }
    Ok(())
}

/// Render the records as a CSV string.
pub fn records_to_string(records: &[SecurityRecord]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_records(&mut buf, records);
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

/// Write the records to `path` atomically (temp file + rename).
pub async fn write_csv_file(path: &Path, records: &[SecurityRecord]) -> Result<(), SeclistError> {
    let write_err = |source: io::Error| SeclistError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, records_to_string(records))
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
