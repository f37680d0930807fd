//! Pipeline orchestration: run extract, transform, and load in sequence.
//!
//! The pipeline is single-threaded, sequential, and batch-oriented: one
//! document is fully extracted before the next begins, and one fact row
//! is fully persisted before the next begins. Stages communicate only
//! through at-rest artifacts (the JSON array and the five CSVs), which is
//! what makes the `skip_*` options work: an operator can re-run just the
//! load stage against artifacts produced yesterday.
//!
//! Partial success is still stage success: skipped documents and
//! quarantined records are reported in the [`PipelineReport`] but do not
//! fail the run. Only a fatal [`EtlError`] — unwalkable input, missing
//! artifact, store failure — aborts, and it aborts *between* documents,
//! leaving every artifact written so far on disk.

use crate::config::PipelineConfig;
use crate::error::EtlError;
use crate::progress::ProgressCallback;
use crate::source::DocumentReader;
use crate::store::TabularStore;
use tracing::info;

/// Per-stage outcome counts.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    /// Items that made it through the stage.
    pub processed: usize,
    /// Items dropped by the stage (collaborator failure, schema rejection,
    /// date-construction failure, malformed artifact row).
    pub skipped: usize,
    /// Well-formed records held back for an incomplete date triple
    /// (transform stage only).
    pub quarantined: usize,
    /// Human-readable reason per skipped/quarantined item.
    pub skip_reasons: Vec<String>,
}

/// Combined outcome of one pipeline run. Stages that were skipped via
/// [`PipelineOptions`] stay `None`.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub extract: Option<StageReport>,
    pub transform: Option<StageReport>,
    pub load: Option<StageReport>,
}

/// Which stages to run. Defaults to all three.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub skip_extract: bool,
    pub skip_transform: bool,
    pub skip_load: bool,
}

/// Execute the configured stages in sequence.
///
/// # Errors
/// Returns the first fatal [`EtlError`]; per-document and per-record
/// failures are counted in the report instead.
pub fn run_pipeline(
    config: &PipelineConfig,
    reader: &dyn DocumentReader,
    store: &mut dyn TabularStore,
    options: PipelineOptions,
    progress: Option<&ProgressCallback>,
) -> Result<PipelineReport, EtlError> {
    let mut report = PipelineReport::default();

    if !options.skip_extract {
        banner("Extracting data from source documents");
        report.extract = Some(crate::extract::run_extract(config, reader, progress)?);
    }
    if !options.skip_transform {
        banner("Cleaning and transforming data");
        report.transform = Some(crate::transform::run_transform(config, progress)?);
    }
    if !options.skip_load {
        banner("Loading star schema into the store");
        report.load = Some(crate::load::run_load(config, store, progress)?);
    }

    banner("Pipeline finished successfully");
    Ok(report)
}

fn banner(message: &str) {
    info!("{}", "=".repeat(60));
    info!("{message}");
    info!("{}", "=".repeat(60));
}
