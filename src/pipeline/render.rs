//! Document text extraction through an external layout-preserving renderer.
//!
//! The parser only needs "positional plain text for a page range", so that
//! capability sits behind the one-method [`Renderer`] trait. The production
//! implementation, [`PdftotextRenderer`], shells out to poppler's
//! `pdftotext -layout`; tests substitute an in-memory renderer.
//!
//! ## Cancellation
//!
//! The subprocess is spawned with `kill_on_drop(true)`: dropping the returned
//! future (for example when a batch aborts, or the caller wraps it in its own
//! `tokio::time::timeout`) kills the child. A timeout from the configuration
//! is applied here as well and reported as [`SeclistError::RenderTimeout`].

use crate::config::ParseConfig;
use crate::error::SeclistError;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// A 1-based page range: a single page, or a start page through the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    /// Inclusive last page; `None` means "to the end of the document".
    pub last: Option<u32>,
}

impl PageRange {
    /// Exactly one page.
    pub fn single(page: u32) -> Self {
        Self {
            first: page,
            last: Some(page),
        }
    }

    /// From `first` to the end of the document.
    pub fn starting_at(first: u32) -> Self {
        Self { first, last: None }
    }
}

/// Produces layout-preserving text for a page range of a document.
///
/// Implementations must emit every rendered page followed by a form-feed
/// byte (`0x0C`), in page order.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        pdf_path: &Path,
        pages: PageRange,
    ) -> impl Future<Output = Result<Vec<u8>, SeclistError>> + Send;
}

/// [`Renderer`] backed by poppler's `pdftotext` command-line tool.
#[derive(Debug, Clone)]
pub struct PdftotextRenderer {
    program: String,
    timeout: Option<Duration>,
}

impl PdftotextRenderer {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Build from a [`ParseConfig`] (`render_timeout_secs == 0` disables the timeout).
    pub fn from_config(config: &ParseConfig) -> Self {
        let timeout = match config.render_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(config.renderer_program.clone(), timeout)
    }

    /// Argument vector for one invocation, without the program name.
    fn args(pdf_path: &Path, pages: PageRange) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec!["-f".into(), pages.first.to_string().into()];
        if let Some(last) = pages.last {
            args.push("-l".into());
            args.push(last.to_string().into());
        }
        args.push("-layout".into());
        args.push(pdf_path.as_os_str().to_owned());
        args.push("-".into());
        args
    }
}

impl Default for PdftotextRenderer {
    fn default() -> Self {
        Self::from_config(&ParseConfig::default())
    }
}

impl Renderer for PdftotextRenderer {
    async fn render(&self, pdf_path: &Path, pages: PageRange) -> Result<Vec<u8>, SeclistError> {
        if !pdf_path.exists() {
            return Err(SeclistError::FileNotFound {
                path: pdf_path.to_path_buf(),
            });
        }

        let mut command = Command::new(&self.program);
        command
            .args(Self::args(pdf_path, pages))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            "Rendering {} pages {}..{} with {}",
            pdf_path.display(),
            pages.first,
            pages.last.map(|l| l.to_string()).unwrap_or_else(|| "end".into()),
            self.program
        );

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| SeclistError::RenderTimeout {
                    path: pdf_path.to_path_buf(),
                    limit,
                })?,
            None => command.output().await,
        }
        .map_err(|e| SeclistError::RendererUnavailable {
            program: self.program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SeclistError::RenderFailed {
                path: pdf_path.to_path_buf(),
                status: output.status.to_string(),
                detail: if stderr.trim().is_empty() {
                    "malformed or unreadable document".to_string()
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        debug!("Rendered {} bytes of text", output.stdout.len());
        Ok(output.stdout)
    }
}
