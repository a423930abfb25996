//! CLI binary for pdf-fmt.
//!
//! A thin shim over the library crate: loads `pdf-fmt.yaml`, lets flags
//! override it, runs the pipeline and prints the text.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_fmt::{
    convert, convert_to_file, load_config, ConfigCache, PipelineConfig, ProgressCallback,
    RunProgressCallback, RunStats, SpellingLocale,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting, a page bar while formatting, then an image bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, prefix: &'static str, unit: &str, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
        self.bar.set_position(0);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar("Formatting", "pages", total_pages);
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _lines: usize) {
        self.bar.inc(1);
    }

    fn on_images_start(&self, total_images: usize) {
        self.activate_bar("Images", "images", total_images);
    }

    fn on_image_written(&self, _file_name: &str, _size_bytes: usize) {
        self.bar.inc(1);
    }

    fn on_image_skipped(&self, file_name: &str, reason: &str) {
        self.bar
            .println(format!("  {} {}  {}", yellow("⚠"), file_name, dim(reason)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, output_lines: usize) {
        self.bar.println(format!(
            "{} {} pages formatted into {} lines",
            green("✔"),
            bold(&total_pages.to_string()),
            output_lines
        ));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Format a PDF to stdout
  pdf-fmt document.pdf

  # Write to a file, British spelling
  pdf-fmt document.pdf -o document.txt --locale en-UK

  # Also extract, deduplicate and rename embedded images
  pdf-fmt document.pdf --images --image-dir ./figures

  # Full result with per-page data and statistics
  pdf-fmt --json document.pdf > document.json

CONFIGURATION:
  Settings are read from the first file found among
    $PDF_FMT_CONFIG_PATH
    <config dir>/pdf-fmt/pdf-fmt.yaml   (e.g. ~/.config/pdf-fmt/pdf-fmt.yaml)
    ./pdf-fmt.yaml
  Flags given on the command line override the file.

ENVIRONMENT VARIABLES:
  PDF_FMT_CONFIG_PATH   Explicit configuration file
  PDFIUM_LIB_PATH       Path to the pdfium shared library
  RUST_LOG              Log filter, overrides -v / -q
"#;

/// Extract, clean and reflow text from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-fmt",
    version,
    about = "Extract, clean and reflow text from PDF documents",
    long_about = "Extract text from a PDF (or a form-feed separated .txt file), drop footers \
and stray characters, rejoin and rewrap lines, and optionally normalise US/UK spelling. \
Embedded images can be extracted with near-duplicates removed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or .txt file to format.
    input: PathBuf,

    /// Write the text to this file instead of stdout.
    #[arg(short, long, env = "PDF_FMT_OUTPUT")]
    output: Option<PathBuf>,

    /// Configuration file (skips discovery).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extract embedded images.
    #[arg(long)]
    images: bool,

    /// Directory for extracted images (default: <input stem>_images).
    #[arg(long, requires = "images")]
    image_dir: Option<PathBuf>,

    /// Worker threads (default: cores - 1).
    #[arg(long, env = "PDF_FMT_WORKERS")]
    workers: Option<usize>,

    /// Spelling dialect: none, en-US, en-UK.
    #[arg(long, value_parser = parse_locale)]
    locale: Option<SpellingLocale>,

    /// Output structured JSON (FormattedOutput) instead of text.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_FMT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_locale(s: &str) -> std::result::Result<SpellingLocale, String> {
    SpellingLocale::parse(s).ok_or_else(|| format!("unknown locale '{s}' (expected none, en-US or en-UK)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RunProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Formatting failed")?;
        drop(config);
        if !cli.quiet {
            print_summary(&stats, Some(output_path));
        }
    } else {
        let output = convert(&cli.input, &config)
            .await
            .context("Formatting failed")?;
        // Drops the progress bar before anything reaches stdout.
        drop(config);

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.text.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        if !cli.quiet && !cli.json {
            print_summary(&output.stats, None);
        }
    }

    Ok(())
}

/// Config file (explicit or discovered), then CLI overrides.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut config = match cli.config {
        Some(ref path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => ConfigCache::new()
            .load_discovered()
            .context("Failed to load configuration")?,
    };

    if let Some(locale) = cli.locale {
        config.spelling_locale = locale;
    }
    if let Some(n) = cli.workers {
        config.workers = Some(n).filter(|&n| n > 0);
    }
    if cli.images {
        config.images.extract = true;
    }
    if let Some(ref dir) = cli.image_dir {
        config.images.output_dir = Some(dir.clone());
    }
    config.progress_callback = progress;
    Ok(config)
}

fn print_summary(stats: &RunStats, written_to: Option<&PathBuf>) {
    let target = written_to
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{}  {}/{} pages  {} lines  {}ms{}",
        green("✔"),
        stats.formatted_pages,
        stats.total_pages,
        stats.output_lines,
        stats.total_duration_ms,
        target
    );
    if stats.dropped_footers > 0 {
        eprintln!("   {}", dim(&format!("{} footer lines dropped", stats.dropped_footers)));
    }
    if let Some(ref images) = stats.images {
        eprintln!(
            "   {}",
            dim(&format!(
                "images: {} written, {} duplicates removed, {} skipped",
                images.written, images.duplicates_discarded, images.skipped
            ))
        );
    }
}
