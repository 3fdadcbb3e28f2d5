//! Page segmentation: split rendered text into per-page chunks.
//!
//! Every index page starts with a `Run Date` header line and the renderer
//! terminates each page with a form feed, so a page is the shortest span from
//! a `run date` label to the next `0x0C`. Cover pages and other noise before
//! the first header are never yielded.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Form-feed byte emitted by the renderer after every page.
pub const PAGE_FEED: u8 = 0x0C;

/// `run date` (any spaces between the words, any case) through the next form
/// feed, spanning newlines. Byte-oriented so stray non-UTF-8 bytes in
/// unrelated pages cannot stop the scan.
pub(crate) static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is-u)run *?date.*?\x0c").unwrap());

/// Whether `text` contains at least one index page.
pub fn contains_index_page(text: &[u8]) -> bool {
    RE_PAGE_MARKER.is_match(text)
}

/// One rendered page, header first, form-feed terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk<'a> {
    /// 1-based position of the chunk within the document's index pages.
    pub index: usize,
    /// Raw page bytes including the trailing form feed.
    pub bytes: &'a [u8],
}

/// Lazy, single-pass cursor over the page chunks of a rendered document.
///
/// Deliberately not `Clone`: a segmenter is consumed once, in document order.
#[derive(Debug)]
pub struct PageSegmenter<'a> {
    text: &'a [u8],
    pos: usize,
    yielded: usize,
}

impl<'a> PageSegmenter<'a> {
    pub fn new(text: &'a [u8]) -> Self {
        Self {
            text,
            pos: 0,
            yielded: 0,
        }
    }
}

impl<'a> Iterator for PageSegmenter<'a> {
    type Item = PageChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos > self.text.len() {
            return None;
        }
        let m = RE_PAGE_MARKER.find_at(self.text, self.pos)?;
        // The pattern always consumes at least the form feed, so this advances.
        self.pos = m.end();
        self.yielded += 1;
        Some(PageChunk {
            index: self.yielded,
            bytes: &self.text[m.start()..m.end()],
        })
    }
}

impl std::iter::FusedIterator for PageSegmenter<'_> {}

/// Convenience constructor mirroring `str::lines`.
pub fn pages(text: &[u8]) -> PageSegmenter<'_> {
    PageSegmenter::new(text)
}
