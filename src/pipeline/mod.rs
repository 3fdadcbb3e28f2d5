//! Pipeline stages for securities-list parsing.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the renderer can be swapped without touching the parser.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ locate ──▶ render ──▶ segment ──▶ header ──▶ extract
//! (1 page)   (marker)   (to end)   (chunks)   (4 lines)  (records)
//! ```
//!
//! 1. [`render`]  — layout-preserving text for a page range (`pdftotext`)
//! 2. [`locate`]  — first page whose text carries the `Run Date` marker
//! 3. [`segment`] — lazy split of the document text into form-feed-terminated
//!    page chunks
//! 4. [`header`]  — strict check of the four-line page header
//! 5. [`extract`] — positional column slicing into [`crate::SecurityRecord`]s
//!
//! Aggregation across pages and the count check live in [`crate::parse`].

pub mod extract;
pub mod header;
pub mod locate;
pub mod render;
pub mod segment;
