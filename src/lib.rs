//! # seclist
//!
//! Parse the SEC's quarterly *Official List of Section 13(f) Securities* into
//! structured records, and keep a local mirror of the published lists.
//!
//! ## How it works
//!
//! The lists are fixed-width reports printed to PDF. Rather than interpreting
//! PDF drawing operators, the crate asks poppler's `pdftotext -layout` for
//! positional plain text and reads columns by character offset, using the
//! column labels in each page header to find the boundaries. A document is
//! accepted only when every page parses and the record count matches the
//! declared `Total Count`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Locate   probe the first pages for the `Run Date` index header
//!  ├─ 2. Render   pdftotext -layout from that page to the end
//!  ├─ 3. Segment  split on form feeds into page chunks
//!  ├─ 4. Extract  validate the header, slice columns, read flags and footer
//!  └─ 5. Check    concatenate pages, compare against the declared total
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seclist::{parse_document, ParseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ParseConfig::default();
//!     let output = parse_document("data/raw/1_2020.pdf", &config).await?;
//!     for record in output.records().iter().take(5) {
//!         println!("{} {} {}", record.cusip, record.issuer, record.description);
//!     }
//!     eprintln!("{} securities on {} pages", output.stats.records, output.stats.pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `seclist` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! seclist = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! `pdftotext` (poppler-utils) must be on `PATH`, or configured through
//! [`ParseConfigBuilder::renderer_program`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod gather;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{parse_directory, parse_directory_with, BatchFailure, BatchItem, BatchSummary};
pub use config::{GatherConfig, GatherConfigBuilder, ParseConfig, ParseConfigBuilder};
pub use error::{ErrorKind, SeclistError};
pub use gather::{download_missing, pull, scrape_index, GatherSummary, IndexEntry};
pub use output::{PageRecords, ParseOutput, ParseStats, ParsedDocument, SecurityRecord};
pub use parse::{
    parse_bytes, parse_document, parse_document_sync, parse_document_with, parse_text,
    parse_to_file,
};
pub use pipeline::render::{PageRange, PdftotextRenderer, Renderer};
pub use progress::{NoopProgressCallback, ParseProgressCallback, ProgressCallback};
