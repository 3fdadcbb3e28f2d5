//! Batch parsing: every PDF in a directory to one CSV each.
//!
//! Documents are independent, so they are parsed concurrently
//! (`config.concurrency` at a time). Documents whose CSV already exists are
//! skipped, which makes re-running a batch after adding new quarters cheap.
//!
//! Error policy is the caller's: by default the first rejected document
//! aborts the batch (in-flight renders are dropped and their subprocesses
//! killed); with `continue_on_error` failures are logged and collected.

use crate::config::ParseConfig;
use crate::error::SeclistError;
use crate::export;
use crate::output::ParseStats;
use crate::parse::{document_name, parse_document_with};
use crate::pipeline::render::{PdftotextRenderer, Renderer};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A document parsed and written successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub source: PathBuf,
    pub output: PathBuf,
    pub stats: ParseStats,
}

/// A document rejected while `continue_on_error` was set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a batch run. All lists are sorted by source path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub parsed: Vec<BatchItem>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    /// Total records written across all parsed documents.
    pub fn total_records(&self) -> usize {
        self.parsed.iter().map(|item| item.stats.records).sum()
    }
}

/// Parse every PDF in `input_dir` into `output_dir` with the `pdftotext`
/// renderer from `config`.
pub async fn parse_directory(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<BatchSummary, SeclistError> {
    let renderer = PdftotextRenderer::from_config(config);
    parse_directory_with(&renderer, input_dir, output_dir, config).await
}

/// Parse every PDF in `input_dir` into `output_dir` with any [`Renderer`].
///
/// # Errors
/// - Input directory missing or unreadable, output directory not writable.
/// - Without `continue_on_error`: the first rejected document, wrapped in
///   [`SeclistError::Document`].
pub async fn parse_directory_with<R: Renderer>(
    renderer: &R,
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ParseConfig,
) -> Result<BatchSummary, SeclistError> {
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();
    let progress = config.progress_callback.clone();

    prepare_output_dir(output_dir, config.replace_existing).await?;
    let documents = list_documents(input_dir).await?;

    let mut summary = BatchSummary::default();
    let mut pending = Vec::with_capacity(documents.len());
    for source in documents {
        let output = output_path_for(&source, output_dir);
        if output.exists() {
            if let Some(ref cb) = progress {
                cb.on_document_skipped(&document_name(&source));
            }
            summary.skipped.push(source);
        } else {
            pending.push((source, output));
        }
    }

    let total = pending.len();
    info!(
        "Parsing {} documents from {} ({} already parsed)",
        total,
        input_dir.display(),
        summary.skipped.len()
    );
    if let Some(ref cb) = progress {
        cb.on_batch_start(total);
    }

    let mut results = stream::iter(pending.into_iter().map(|(source, output)| {
        let progress = progress.clone();
        async move {
            let name = document_name(&source);
            if let Some(ref cb) = progress {
                cb.on_document_start(&name);
            }
            let result = match parse_document_with(renderer, &source, config).await {
                Ok(parsed) => export::write_csv_file(&output, parsed.records())
                    .await
                    .map(|_| parsed.stats),
                Err(e) => Err(e),
            };
            (source, output, result)
        }
    }))
    .buffer_unordered(config.concurrency);

    while let Some((source, output, result)) = results.next().await {
        let name = document_name(&source);
        match result {
            Ok(stats) => {
                if let Some(ref cb) = progress {
                    cb.on_document_complete(&name, stats.records);
                }
                summary.parsed.push(BatchItem {
                    source,
                    output,
                    stats,
                });
            }
            Err(e) => {
                if let Some(ref cb) = progress {
                    cb.on_document_error(&name, &e.to_string());
                }
                if !config.continue_on_error {
                    if let Some(ref cb) = progress {
                        cb.on_batch_complete(total, summary.parsed.len());
                    }
                    return Err(SeclistError::Document {
                        path: source,
                        source: Box::new(e),
                    });
                }
                warn!("Skipping {}: {}", name, e);
                summary.failed.push(BatchFailure {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }

    summary.parsed.sort_by(|a, b| a.source.cmp(&b.source));
    summary.failed.sort_by(|a, b| a.source.cmp(&b.source));

    info!(
        "Batch complete: {} parsed ({} records), {} skipped, {} failed",
        summary.parsed.len(),
        summary.total_records(),
        summary.skipped.len(),
        summary.failed.len()
    );
    if let Some(ref cb) = progress {
        cb.on_batch_complete(total, summary.parsed.len());
    }

    Ok(summary)
}

/// CSV path for a source document: `<output_dir>/<stem>.csv`.
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let mut name = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| source.as_os_str().to_os_string());
    // Appended, not `with_extension`: `q.1` and `q.2` must not both become `q.csv`.
    name.push(".csv");
    output_dir.join(name)
}

/// Wipe (when asked) and create the output directory.
pub(crate) async fn prepare_output_dir(dir: &Path, replace_existing: bool) -> Result<(), SeclistError> {
    let write_err = |source: std::io::Error| SeclistError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    };
    if replace_existing && dir.exists() {
        info!("Removing existing {}", dir.display());
        tokio::fs::remove_dir_all(dir).await.map_err(write_err)?;
    }
    tokio::fs::create_dir_all(dir).await.map_err(write_err)
}

/// Regular `.pdf` files directly inside `dir`, sorted by path.
async fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, SeclistError> {
    let not_found = || SeclistError::FileNotFound {
        path: dir.to_path_buf(),
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| not_found())?;
    let mut documents = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| not_found())? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_swaps_extension() {
        assert_eq!(
            output_path_for(Path::new("/raw/1_2020.pdf"), Path::new("/parsed")),
            PathBuf::from("/parsed/1_2020.csv")
        );
    }

    #[test]
    fn dotted_stems_keep_distinct_outputs() {
        let out = Path::new("/out");
        let first = output_path_for(Path::new("/raw/q.1.pdf"), out);
        let second = output_path_for(Path::new("/raw/q.2.pdf"), out);
        assert_ne!(first, second);
        assert_eq!(first, PathBuf::from("/out/q.1.csv"));
        assert_eq!(second, PathBuf::from("/out/q.2.csv"));
    }

    #[tokio::test]
    async fn lists_only_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2_2020.pdf", "1_2020.PDF", "notes.txt", "1_2020.pdf.tmp"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let docs = list_documents(dir.path()).await.unwrap();
        let names: Vec<_> = docs.iter().map(|p| document_name(p)).collect();
        assert_eq!(names, ["1_2020.PDF", "2_2020.pdf"]);
    }

    #[tokio::test]
    async fn missing_input_dir_is_file_not_found() {
        let err = list_documents(Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(err, SeclistError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn replace_existing_wipes_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("parsed");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("old.csv"), b"x").unwrap();

        prepare_output_dir(&out, false).await.unwrap();
        assert!(out.join("old.csv").exists());

        prepare_output_dir(&out, true).await.unwrap();
        assert!(out.exists());
        assert!(!out.join("old.csv").exists());
    }
}
