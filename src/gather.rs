//! Discovery and download of the quarterly securities lists.
//!
//! The SEC publishes one PDF per quarter, linked from a single index page
//! with anchor text such as `1st Quarter 2020`. [`pull`] mirrors every list
//! from `min_year` onward into a local directory as `{quarter}_{year}.pdf`,
//! downloading only files not already present.

use crate::batch::prepare_output_dir;
use crate::config::GatherConfig;
use crate::error::SeclistError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9])(st|nd|rd|th) quarter ([0-9]{4})").unwrap());

/// One quarterly list linked from the index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Absolute download URL.
    pub uri: String,
    /// Local file name, `{quarter}_{year}.pdf`.
    pub file_name: String,
    pub quarter: u32,
    pub year: u32,
}

/// Outcome of [`download_missing`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherSummary {
    /// Files fetched during this run.
    pub downloaded: Vec<PathBuf>,
    /// Files already present locally.
    pub skipped: Vec<PathBuf>,
    /// Bytes written.
    pub bytes: u64,
}

/// Build the HTTP client used for every SEC request.
pub fn build_client(config: &GatherConfig) -> Result<reqwest::Client, SeclistError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .gzip(true)
        .build()
        .map_err(|e| SeclistError::DownloadFailed {
            url: config.index_url.clone(),
            reason: format!("HTTP client: {e}"),
        })
}

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating and capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// GET `url` and return the body, retrying transient failures.
///
/// Connection errors, timeouts, `429` and `5xx` responses are retried up to
/// `config.max_retries` times with exponential backoff. Any other
/// non-success status fails immediately.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    config: &GatherConfig,
) -> Result<Vec<u8>, SeclistError> {
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Retrying {} (attempt {}/{}) after {}ms",
                url, attempt, config.max_retries, backoff
            );
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(request_error(url, &e, config));
                continue;
            }
        };

        let status = response.status();
        if is_retryable_status(status) {
            last_error = Some(SeclistError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
            continue;
        }
        if !status.is_success() {
            return Err(SeclistError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        match response.bytes().await {
            Ok(body) => {
                debug!("Fetched {} bytes from {}", body.len(), url);
                return Ok(body.to_vec());
            }
            Err(e) => last_error = Some(request_error(url, &e, config)),
        }
    }

    Err(last_error.unwrap_or_else(|| SeclistError::DownloadFailed {
        url: url.to_string(),
        reason: "no attempt made".into(),
    }))
}

/// Statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn request_error(url: &str, e: &reqwest::Error, config: &GatherConfig) -> SeclistError {
    if e.is_timeout() {
        SeclistError::DownloadTimeout {
            url: url.to_string(),
            secs: config.download_timeout_secs,
        }
    } else {
        SeclistError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Extract the quarterly list links from the index page HTML.
///
/// Entries come back in page order. Lists older than `min_year` are dropped,
/// and relative links are resolved against `base_url`.
pub fn scrape_index(html: &str, base_url: &str, min_year: u32) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    for caps in RE_ANCHOR.captures_iter(html) {
        let href = caps[1].trim();
        let text = anchor_text(&caps[2]);
        let Some(q) = RE_QUARTER.captures(&text) else {
            continue;
        };
        let (Ok(quarter), Ok(year)) = (q[1].parse::<u32>(), q[3].parse::<u32>()) else {
            continue;
        };
        if year < min_year {
            continue;
        }
        entries.push(IndexEntry {
            uri: resolve_uri(base_url, href),
            file_name: format!("{quarter}_{year}.pdf"),
            quarter,
            year,
        });
    }
    entries
}

/// Visible text of an anchor body, whitespace collapsed.
fn anchor_text(inner: &str) -> String {
    let text = RE_TAG.replace_all(inner, " ").replace("&nbsp;", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_uri(base_url: &str, href: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
    }
}

/// Fetch the index page and return every list from `config.min_year` on.
pub async fn fetch_index(
    client: &reqwest::Client,
    config: &GatherConfig,
) -> Result<Vec<IndexEntry>, SeclistError> {
    info!("Fetching securities list index: {}", config.index_url);
    let body = fetch_bytes(client, &config.index_url, config).await?;
    let html = String::from_utf8_lossy(&body);
    let entries = scrape_index(&html, &config.base_url, config.min_year);
    info!("Index lists {} quarterly documents", entries.len());
    Ok(entries)
}

/// Download every indexed list not already present in `output_dir`.
///
/// Files are written atomically (`.pdf.tmp` then rename), so an interrupted
/// run never leaves a truncated PDF that a later run would skip.
pub async fn download_missing(
    output_dir: impl AsRef<Path>,
    config: &GatherConfig,
) -> Result<GatherSummary, SeclistError> {
    let output_dir = output_dir.as_ref();
    let progress = config.progress_callback.clone();
    let client = build_client(config)?;
    let entries = fetch_index(&client, config).await?;

    let mut summary = GatherSummary::default();
    let mut pending = Vec::new();
    for entry in entries {
        let path = output_dir.join(&entry.file_name);
        if path.exists() {
            if let Some(ref cb) = progress {
                cb.on_document_skipped(&entry.file_name);
            }
            summary.skipped.push(path);
        } else {
            pending.push((entry, path));
        }
    }

    let total = pending.len();
    if let Some(ref cb) = progress {
        cb.on_batch_start(total);
    }

    for (i, (entry, path)) in pending.into_iter().enumerate() {
        if i > 0 && config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.request_delay_ms)).await;
        }
        if let Some(ref cb) = progress {
            cb.on_document_start(&entry.file_name);
        }

        let body = match fetch_bytes(&client, &entry.uri, config).await {
            Ok(b) => b,
            Err(e) => {
                if let Some(ref cb) = progress {
                    cb.on_document_error(&entry.file_name, &e.to_string());
                    cb.on_batch_complete(total, summary.downloaded.len());
                }
                return Err(e);
            }
        };
        write_atomic(&path, &body).await?;

        info!("Downloaded {} ({} bytes)", entry.file_name, body.len());
        if let Some(ref cb) = progress {
            cb.on_document_complete(&entry.file_name, body.len());
        }
        summary.bytes += body.len() as u64;
        summary.downloaded.push(path);
    }

    if let Some(ref cb) = progress {
        cb.on_batch_complete(total, summary.downloaded.len());
    }
    Ok(summary)
}

/// Prepare `output_dir` (wiping it when `replace_existing` is set) and
/// download every missing list into it.
pub async fn pull(
    output_dir: impl AsRef<Path>,
    config: &GatherConfig,
) -> Result<GatherSummary, SeclistError> {
    let output_dir = output_dir.as_ref();
    prepare_output_dir(output_dir, config.replace_existing).await?;
    let summary = download_missing(output_dir, config).await?;
    info!(
        "Pull complete: {} downloaded, {} already present",
        summary.downloaded.len(),
        summary.skipped.len()
    );
    Ok(summary)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SeclistError> {
    let write_err = |source: std::io::Error| SeclistError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}
