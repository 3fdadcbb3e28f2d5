//! Progress-callback trait for document and page events.
//!
//! Inject an [`Arc<dyn ParseProgressCallback>`] via
//! [`crate::config::ParseConfigBuilder::progress_callback`] (or the gather
//! equivalent) to receive events as a batch runs. Callers can forward them to
//! a terminal progress bar, a channel, or a log without the library knowing
//! how the host application reports progress.
//!
//! # Example
//!
//! ```rust
//! use seclist::{ParseConfig, ParseProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RecordCounter {
//!     records: AtomicUsize,
//! }
//!
//! impl ParseProgressCallback for RecordCounter {
//!     fn on_document_complete(&self, _name: &str, count: usize) {
//!         self.records.fetch_add(count, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(RecordCounter { records: AtomicUsize::new(0) });
//!
//! let config = ParseConfig::builder()
//!     .progress_callback(counter as Arc<dyn ParseProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the parse and gather pipelines as they process documents.
///
/// Implementations must be `Send + Sync`: in batch mode several documents are
/// in flight at once, so document- and page-level methods may be called from
/// concurrently running tasks. All methods default to no-ops.
pub trait ParseProgressCallback: Send + Sync {
    /// Called once before the first document, with the number of documents
    /// that will actually be processed (already-present outputs excluded).
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when work on a document begins.
    fn on_document_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after each page chunk has been extracted.
    ///
    /// # Arguments
    /// * `name`    — document name
    /// * `page`    — page number printed in the page header
    /// * `records` — records found on that page
    fn on_page_parsed(&self, name: &str, page: usize, records: usize) {
        let _ = (name, page, records);
    }

    /// Called when a document finished successfully.
    ///
    /// `count` is the number of records for parsing and the number of bytes
    /// written for downloads.
    fn on_document_complete(&self, name: &str, count: usize) {
        let _ = (name, count);
    }

    /// Called for a document whose output already exists.
    fn on_document_skipped(&self, name: &str) {
        let _ = name;
    }

    /// Called when a document was rejected.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after the batch ends (also when it aborts early).
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ParseProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn ParseProgressCallback>;
