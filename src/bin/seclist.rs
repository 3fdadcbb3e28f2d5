//! CLI binary for seclist.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ParseConfig` / `GatherConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use seclist::{
    export, parse_directory, parse_document, pull, GatherConfig, ParseConfig,
    ParseProgressCallback, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over documents, one log line per document.
/// Documents may finish out of order in batch mode.
struct CliProgressCallback {
    bar: ProgressBar,
    /// "Parsing" or "Downloading".
    verb: &'static str,
    /// What `on_document_complete`'s count measures.
    unit: &'static str,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(verb: &'static str, unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            verb,
            unit,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(self.verb);
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, name: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(name))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ParseProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        if total_documents == 0 {
            self.bar.println(format!("{} Nothing to do", dim("◆")));
        }
    }

    fn on_document_start(&self, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(name.to_string(), Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, name: &str, count: usize) {
        let secs = self.elapsed_secs(name);
        self.bar.println(format!(
            "  {} {:<14}  {:<18}  {}",
            green("✓"),
            name,
            dim(&format!("{count:>8} {}", self.unit)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_skipped(&self, name: &str) {
        self.bar
            .println(format!("  {} {:<14}  {}", dim("·"), name, dim("already present")));
    }

    fn on_document_error(&self, name: &str, error: &str) {
        let secs = self.elapsed_secs(name);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<14}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {}/{} documents done",
                green("✔"),
                bold(&success_count.to_string()),
                total_documents
            );
        } else {
            eprintln!(
                "{} {}/{} documents done  ({} failed)",
                if success_count == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Mirror every quarterly list since 2004 (SEC requires a contact user agent)
  seclist pull -o data/raw -a "Jane Doe jane@example.com"

  # Parse every new PDF into one CSV per quarter
  seclist parse -i data/raw -o data/parsed

  # Re-parse everything, eight documents at a time, keep going on failures
  seclist parse -i data/raw -o data/parsed -r --concurrency 8 --continue-on-error

  # Print one document as JSON
  seclist inspect data/raw/1_2020.pdf --json > 1_2020.json

ENVIRONMENT VARIABLES:
  SECLIST_USER_AGENT      Name and e-mail sent to the SEC
  SECLIST_PDFTOTEXT       Path to the pdftotext binary
  SECLIST_RENDER_TIMEOUT  Per-render timeout in seconds (0 disables)
  SECLIST_CONCURRENCY     Documents parsed concurrently
  RUST_LOG                Overrides the log filter (e.g. seclist=debug)

SETUP:
  pdftotext ships with poppler:  apt install poppler-utils  |  brew install poppler
"#;

/// Download and parse the SEC 13(f) securities lists.
#[derive(Parser, Debug)]
#[command(
    name = "seclist",
    version,
    about = "Download and parse the SEC 13(f) securities lists",
    long_about = "Mirror the SEC's quarterly Official List of Section 13(f) Securities and \
parse each PDF into a CSV of CUSIP, issuer, description and status flags.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SECLIST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SECLIST_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "SECLIST_NO_PROGRESS")]
    no_progress: bool,

    /// pdftotext binary to run.
    #[arg(long = "pdftotext", global = true, env = "SECLIST_PDFTOTEXT", default_value = "pdftotext")]
    pdftotext: String,

    /// Per-render timeout in seconds (0 disables).
    #[arg(long, global = true, env = "SECLIST_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download quarterly lists that are not yet present locally.
    Pull {
        /// Directory receiving `{quarter}_{year}.pdf` files.
        #[arg(short, long)]
        output: PathBuf,

        /// Delete the output directory first.
        #[arg(short, long)]
        replace_existing: bool,

        /// Name and e-mail for the SEC user agent.
        #[arg(short = 'a', long, env = "SECLIST_USER_AGENT")]
        user_agent: String,

        /// Oldest year to download.
        #[arg(long, env = "SECLIST_MIN_YEAR", default_value_t = 2004)]
        min_year: u32,

        /// HTTP timeout in seconds.
        #[arg(long, env = "SECLIST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,

        /// Retries per request on transient failures.
        #[arg(long, env = "SECLIST_MAX_RETRIES", default_value_t = 3)]
        max_retries: u32,
    },

    /// Parse every PDF in a directory into one CSV each.
    Parse {
        /// Directory holding the raw PDFs.
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the CSVs.
        #[arg(short, long)]
        output: PathBuf,

        /// Delete the output directory first.
        #[arg(short, long)]
        replace_existing: bool,

        /// Documents parsed concurrently.
        #[arg(short, long, env = "SECLIST_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,

        /// Log failing documents and keep going.
        #[arg(long, env = "SECLIST_CONTINUE_ON_ERROR")]
        continue_on_error: bool,
    },

    /// Parse a single PDF and print it to stdout.
    Inspect {
        /// The PDF to parse.
        file: PathBuf,

        /// Print `ParseOutput` as JSON instead of CSV.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless verbose.
    let show_progress = !global.quiet
        && !global.no_progress
        && !matches!(cli.command, Command::Inspect { .. });
    let filter = if global.verbose {
        "debug"
    } else if global.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Pull {
            output,
            replace_existing,
            user_agent,
            min_year,
            download_timeout,
            max_retries,
        } => {
            let mut builder = GatherConfig::builder(user_agent.as_str())
                .replace_existing(*replace_existing)
                .min_year(*min_year)
                .download_timeout_secs(*download_timeout)
                .max_retries(*max_retries);
            if show_progress {
                builder = builder.progress_callback(progress("Downloading", "bytes"));
            }
            let config = builder.build().context("Invalid configuration")?;

            let summary = pull(output, &config)
                .await
                .with_context(|| format!("Failed to pull lists into {}", output.display()))?;

            if !global.quiet {
                eprintln!(
                    "{}  {} downloaded  {} already present  {}  →  {}",
                    green("✔"),
                    summary.downloaded.len(),
                    summary.skipped.len(),
                    dim(&format!("{} bytes", summary.bytes)),
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Parse {
            input,
            output,
            replace_existing,
            concurrency,
            continue_on_error,
        } => {
            let mut builder = parse_config(global)
                .replace_existing(*replace_existing)
                .concurrency(*concurrency)
                .continue_on_error(*continue_on_error);
            if show_progress {
                builder = builder.progress_callback(progress("Parsing", "records"));
            }
            let config = builder.build().context("Invalid configuration")?;

            let summary = parse_directory(input, output, &config)
                .await
                .with_context(|| format!("Failed to parse {}", input.display()))?;

            if !global.quiet {
                eprintln!(
                    "{}  {} parsed  {} skipped  {} failed  {}  →  {}",
                    if summary.failed.is_empty() {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    summary.parsed.len(),
                    summary.skipped.len(),
                    summary.failed.len(),
                    dim(&format!("{} records", summary.total_records())),
                    bold(&output.display().to_string()),
                );
                for failure in &summary.failed {
                    eprintln!("   {} {}: {}", red("✗"), failure.source.display(), failure.error);
                }
            }
        }

        Command::Inspect { file, json } => {
            let config = parse_config(global).build().context("Invalid configuration")?;
            let output = parse_document(file, &config)
                .await
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            if *json {
                let body =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                writeln!(handle, "{body}").context("Failed to write to stdout")?;
            } else {
                export::write_records(&mut handle, output.records())
                    .context("Failed to write to stdout")?;
            }

            if !global.quiet {
                eprintln!(
                    "Parsed {} securities from {} pages (index starts on page {}) in {}ms",
                    output.stats.records,
                    output.stats.pages,
                    output.stats.first_index_page,
                    output.stats.total_duration_ms
                );
            }
        }
    }

    Ok(())
}

/// Renderer settings shared by `parse` and `inspect`.
fn parse_config(global: &GlobalArgs) -> seclist::ParseConfigBuilder {
    ParseConfig::builder()
        .renderer_program(global.pdftotext.as_str())
        .render_timeout_secs(global.render_timeout)
}

fn progress(verb: &'static str, unit: &'static str) -> ProgressCallback {
    CliProgressCallback::new(verb, unit) as Arc<dyn ParseProgressCallback>
}
