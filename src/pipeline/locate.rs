//! Page location: find the first page carrying the securities index.
//!
//! Quarterly lists open with zero to two cover pages (title, explanatory
//! notes) before the first `Run Date` header. Rendering each candidate page on
//! its own is cheap and avoids segmenting cover text as if it were data.

use crate::config::ParseConfig;
use crate::error::SeclistError;
use crate::pipeline::render::{PageRange, Renderer};
use crate::pipeline::segment::contains_index_page;
use std::path::Path;
use tracing::{debug, info};

/// Return the 1-based page number where the index begins.
///
/// Probes pages `1..=config.search_pages()` in order, rendering each once.
///
/// # Errors
/// - [`SeclistError::IndexNotFound`] when no probed page carries the header.
/// - Any render error from the first failing probe.
pub async fn locate_index<R: Renderer>(
    renderer: &R,
    pdf_path: &Path,
    config: &ParseConfig,
) -> Result<u32, SeclistError> {
    let searched = config.search_pages();
    for page in 1..=searched {
        let text = renderer.render(pdf_path, PageRange::single(page)).await?;
        if contains_index_page(&text) {
            info!("Index starts on page {} of {}", page, pdf_path.display());
            return Ok(page);
        }
        debug!("Page {} of {} is a cover page", page, pdf_path.display());
    }
    Err(SeclistError::IndexNotFound {
        path: pdf_path.to_path_buf(),
        searched,
    })
}
