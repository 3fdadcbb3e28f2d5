//! Configuration types for parsing and gathering.
//!
//! [`ParseConfig`] controls how documents are rendered and parsed;
//! [`GatherConfig`] controls how quarterly lists are discovered and
//! downloaded. Both are plain structs with documented defaults, built through
//! a consuming builder whose `build()` validates the combination.

use crate::error::SeclistError;
use crate::progress::ProgressCallback;
use std::fmt;

/// SEC page listing every published quarterly 13(f) securities list.
pub const DEFAULT_INDEX_URL: &str = "https://www.sec.gov/divisions/investment/13flists.htm";

/// Host prepended to relative links found on the index page.
pub const DEFAULT_BASE_URL: &str = "https://www.sec.gov";

/// Configuration for parsing securities-list documents.
///
/// # Example
/// ```rust
/// use seclist::ParseConfig;
///
/// let config = ParseConfig::builder()
///     .render_timeout_secs(30)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ParseConfig {
    /// Program invoked to render PDF pages to layout text. Default: `pdftotext`.
    pub renderer_program: String,

    /// Number of cover pages tolerated before the index. Default: 2.
    ///
    /// The locator probes pages `1..=max_cover_pages + 1`.
    pub max_cover_pages: u32,

    /// Per-invocation renderer timeout in seconds. `0` disables it. Default: 120.
    pub render_timeout_secs: u64,

    /// Documents parsed concurrently in batch mode. Default: 4.
    pub concurrency: usize,

    /// Wipe the output directory before a batch run. Default: false.
    pub replace_existing: bool,

    /// Keep going after a document fails in batch mode. Default: false.
    ///
    /// When false the first failing document aborts the batch.
    pub continue_on_error: bool,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            renderer_program: "pdftotext".to_string(),
            max_cover_pages: 2,
            render_timeout_secs: 120,
            concurrency: 4,
            replace_existing: false,
            continue_on_error: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseConfig")
            .field("renderer_program", &self.renderer_program)
            .field("max_cover_pages", &self.max_cover_pages)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("replace_existing", &self.replace_existing)
            .field("continue_on_error", &self.continue_on_error)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ParseProgressCallback>"),
            )
            .finish()
    }
}

impl ParseConfig {
    /// Create a new builder for `ParseConfig`.
    pub fn builder() -> ParseConfigBuilder {
        ParseConfigBuilder {
            config: Self::default(),
        }
    }

    /// Number of leading pages the locator probes.
    pub fn search_pages(&self) -> u32 {
        self.max_cover_pages + 1
    }
}

/// Builder for [`ParseConfig`].
#[derive(Debug)]
pub struct ParseConfigBuilder {
    config: ParseConfig,
}

impl ParseConfigBuilder {
    pub fn renderer_program(mut self, program: impl Into<String>) -> Self {
        self.config.renderer_program = program.into();
        self
    }

    pub fn max_cover_pages(mut self, n: u32) -> Self {
        self.config.max_cover_pages = n;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn replace_existing(mut self, v: bool) -> Self {
        self.config.replace_existing = v;
        self
    }

    pub fn continue_on_error(mut self, v: bool) -> Self {
        self.config.continue_on_error = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParseConfig, SeclistError> {
        let c = &self.config;
        if c.renderer_program.trim().is_empty() {
            return Err(SeclistError::InvalidConfig(
                "Renderer program must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(SeclistError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for discovering and downloading quarterly lists.
///
/// The SEC rejects anonymous automated traffic, so a descriptive
/// `user_agent` (name and contact e-mail) is mandatory.
#[derive(Clone)]
pub struct GatherConfig {
    /// `User-Agent` header sent with every request. Required.
    pub user_agent: String,

    /// Page listing the quarterly documents. Default: [`DEFAULT_INDEX_URL`].
    pub index_url: String,

    /// Prefix for relative links. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Oldest year to download. Default: 2004 (earlier lists use another layout).
    pub min_year: u32,

    /// Pause between consecutive downloads in milliseconds. Default: 200.
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Retries on transient HTTP failures. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Wipe the download directory first. Default: false.
    pub replace_existing: bool,

    /// Optional progress observer; `count` arguments are byte sizes.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            min_year: 2004,
            request_delay_ms: 200,
            download_timeout_secs: 120,
            max_retries: 3,
            retry_backoff_ms: 500,
            replace_existing: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GatherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatherConfig")
            .field("user_agent", &self.user_agent)
            .field("index_url", &self.index_url)
            .field("base_url", &self.base_url)
            .field("min_year", &self.min_year)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("replace_existing", &self.replace_existing)
            .finish()
    }
}

impl GatherConfig {
    /// Create a new builder; `user_agent` is the only required field.
    pub fn builder(user_agent: impl Into<String>) -> GatherConfigBuilder {
        GatherConfigBuilder {
            config: Self {
                user_agent: user_agent.into(),
                ..Self::default()
            },
        }
    }
}

/// Builder for [`GatherConfig`].
#[derive(Debug)]
pub struct GatherConfigBuilder {
    config: GatherConfig,
}

impl GatherConfigBuilder {
    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.config.index_url = url.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn min_year(mut self, year: u32) -> Self {
        self.config.min_year = year;
        self
    }

    pub fn request_delay_ms(mut self, ms: u64) -> Self {
        self.config.request_delay_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn replace_existing(mut self, v: bool) -> Self {
        self.config.replace_existing = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatherConfig, SeclistError> {
        let c = &self.config;
        if c.user_agent.trim().is_empty() {
            return Err(SeclistError::InvalidConfig(
                "A user agent (name and e-mail) is required for SEC requests".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(SeclistError::InvalidConfig(
                "Download timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}
