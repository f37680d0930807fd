//! CLI binary for finstar-etl.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints per-stage progress.

use anyhow::{Context, Result};
use clap::Parser;
use finstar_etl::{
    run_pipeline, PipelineConfig, PipelineOptions, PipelineProgressCallback, ProgressCallback,
    SidecarReader, SqliteStore, Stage, StageReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner per stage plus per-item log lines.
/// The pipeline is sequential, so no out-of-order handling is needed.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("starting…");
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Stage: {stage}"))));
    }

    fn on_item_start(&self, _stage: Stage, _ordinal: usize, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_item_ok(&self, _stage: Stage, ordinal: usize, label: &str) {
        self.bar
            .println(format!("  {} {:>3}  {}", green("✓"), ordinal, dim(label)));
    }

    fn on_item_skipped(&self, _stage: Stage, ordinal: usize, label: &str, reason: &str) {
        // Truncate very long reasons to keep output tidy.
        let msg = if reason.chars().count() > 80 {
            let head: String = reason.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}  {}  {}",
            red("✗"),
            ordinal,
            label,
            red(&msg)
        ));
    }

    fn on_stage_complete(&self, stage: Stage, processed: usize, skipped: usize) {
        if skipped == 0 {
            self.bar.println(format!(
                "{} {stage}: {} items",
                green("✔"),
                bold(&processed.to_string())
            ));
        } else {
            self.bar.println(format!(
                "{} {stage}: {}/{} items  ({} skipped)",
                cyan("⚠"),
                bold(&processed.to_string()),
                processed + skipped,
                red(&skipped.to_string()),
            ));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline: extract, transform, load
  finstar --input-dir data/downloads --work-dir data --db data/finstar.db

  # Re-run only normalization against yesterday's extracted.json
  finstar --skip-extract --skip-load --work-dir data

  # Re-load the CSV artifacts after a store outage
  finstar --skip-extract --skip-transform --db data/finstar.db

LAYOUT:
  <input-dir>/<institution>/<statement>.pdf        the documents
  <input-dir>/<institution>/<statement>.tables.json  detected table grids
  <input-dir>/<institution>/<statement>.txt          first-page text

  The two sidecar files are produced by whatever table-detection tool runs
  upstream; finstar consumes them at rest and never opens the PDF itself.

ARTIFACTS (written to --work-dir):
  extracted.json       one record per document (JSON array)
  fact_report.csv      one fact row per record
  dim_assets.csv       + dim_liabilities.csv, dim_equity.csv, dim_income.csv

Re-running against unchanged input is idempotent: fact rows are matched by
(company, report_date) and dimension rows by fact id.
"#;

/// Normalize bank-statement table grids into a star schema.
#[derive(Parser, Debug)]
#[command(
    name = "finstar",
    version,
    about = "Extract standardized financial metrics into a star schema",
    long_about = "Locate financial line items inside pre-detected statement table grids, \
reconcile synonym labels across institutions into one canonical schema, and load \
fact/dimension rows keyed by (institution, reporting period).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory walked recursively for input documents.
    #[arg(long, env = "FINSTAR_INPUT_DIR", default_value = "data/downloads")]
    input_dir: PathBuf,

    /// Directory for stage artifacts (JSON + CSVs).
    #[arg(long, env = "FINSTAR_WORK_DIR", default_value = "data")]
    work_dir: PathBuf,

    /// SQLite database file for the load stage.
    #[arg(long, env = "FINSTAR_DB", default_value = "data/finstar.db")]
    db: PathBuf,

    /// Skip the extract stage (reuse an existing extracted.json).
    #[arg(long)]
    skip_extract: bool,

    /// Skip the transform stage (reuse existing CSV artifacts).
    #[arg(long)]
    skip_transform: bool,

    /// Skip the load stage (produce artifacts only).
    #[arg(long)]
    skip_load: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "FINSTAR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FINSTAR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FINSTAR_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // callback provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config and collaborators ───────────────────────────────────
    let config = PipelineConfig::builder()
        .input_dir(&cli.input_dir)
        .work_dir(&cli.work_dir)
        .build()
        .context("Invalid configuration")?;

    let reader = SidecarReader::new();
    let mut store = if cli.skip_load {
        // No store access happens; keep it cheap and side-effect free.
        SqliteStore::open_in_memory().context("Failed to open in-memory store")?
    } else {
        if let Some(parent) = cli.db.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        SqliteStore::open(&cli.db)
            .with_context(|| format!("Failed to open store at {}", cli.db.display()))?
    };

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let options = PipelineOptions {
        skip_extract: cli.skip_extract,
        skip_transform: cli.skip_transform,
        skip_load: cli.skip_load,
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_pipeline(&config, &reader, &mut store, options, progress.as_ref())
        .context("Pipeline failed")?;

    if !cli.quiet {
        print_summary("extract", report.extract.as_ref());
        print_summary("transform", report.transform.as_ref());
        print_summary("load", report.load.as_ref());
        eprintln!("{} Pipeline finished successfully", green("✔"));
    }

    Ok(())
}

fn print_summary(name: &str, stage: Option<&StageReport>) {
    match stage {
        Some(report) => {
            let mut line = format!(
                "   {name}: {} processed, {} skipped",
                bold(&report.processed.to_string()),
                report.skipped
            );
            if report.quarantined > 0 {
                line.push_str(&format!(", {} quarantined", report.quarantined));
            }
            eprintln!("{line}");
        }
        None => eprintln!("   {name}: {}", dim("skipped by flag")),
    }
}
