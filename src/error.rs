//! Error types for the finstar-etl library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EtlError`] — **Fatal**: the stage cannot proceed at all (unreadable
//!   work directory, malformed interchange artifact, store connectivity or
//!   constraint failure). Returned as `Err(EtlError)` from the stage entry
//!   points; already-written artifacts stay on disk for retry.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (its table
//!   grids could not be produced, its first-page text could not be read)
//!   but every other document is fine. Caught at the record-assembly
//!   boundary, logged, and the batch continues. This is the primary
//!   resilience contract of the pipeline.
//!
//! The separation lets callers decide their own tolerance: a library user
//! can abort on the first skipped document, while the CLI reports partial
//! success as overall success so long as the stage itself completes.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the finstar-etl library.
///
/// Per-document failures use [`DocumentError`] and are recorded in
/// [`crate::run::StageReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum EtlError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input directory does not exist or is unreadable.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is readable.")]
    InputDirNotFound { path: PathBuf },

    /// An artifact produced by a previous stage is missing.
    #[error("Missing artifact '{path}'\nRun the producing stage first (or drop the --skip flag that suppressed it).")]
    ArtifactMissing { path: PathBuf },

    /// The JSON interchange artifact could not be parsed.
    #[error("Interchange artifact '{path}' is not a valid record array: {detail}")]
    MalformedArtifact { path: PathBuf, detail: String },

    // ── Transform errors ──────────────────────────────────────────────────
    /// (year, month) could not be turned into an end-of-month date.
    ///
    /// Fatal for the affected row's fact emission: report_date is a join
    /// key downstream and must never be silently null.
    #[error("Cannot derive report date for year={year} month={month}: {detail}")]
    DateConstruction {
        year: i32,
        month: u32,
        detail: String,
    },

    /// A fixed-shape field map was given a label outside its configured set.
    #[error("Unknown target field '{label}' for section '{section}'")]
    UnknownField { label: String, section: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a stage artifact.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV encode/decode failure on a star-schema artifact.
    #[error("CSV error on '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The tabular store rejected an operation (connectivity, constraint
    /// violation). Not locally recoverable: the load stage aborts and the
    /// CLI exits non-zero, leaving intermediate artifacts in place.
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single document.
///
/// Recorded in the extract stage's report when a document is skipped.
/// The overall batch continues.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// The table-detection collaborator failed for this document.
    #[error("'{file}': table detection failed: {detail}")]
    TableDetection { file: String, detail: String },

    /// The first-page text collaborator failed for this document.
    #[error("'{file}': page text unavailable: {detail}")]
    PageText { file: String, detail: String },
}
