//! # finstar-etl
//!
//! Extract standardized financial metrics from bank-statement table grids
//! and normalize them into a relational star schema.
//!
//! ## Why this crate?
//!
//! Every issuing institution publishes the same monthly statement with a
//! different internal table layout: different grid geometry, different
//! label wording for the same line item, different date phrasing in the
//! header. This crate is the label-driven middle of that mess — it locates
//! target line items inside pre-detected table grids, reconciles synonym
//! labels into one canonical column set, and assembles validated
//! fact/dimension rows with idempotent upsert semantics, so re-ingesting
//! the same statements never duplicates a reporting period.
//!
//! Table-region detection, OCR, and layout correction are *not* here: the
//! pipeline consumes an opaque grid-of-cells producer through the
//! [`source::DocumentReader`] seam, and persists through the
//! [`store::TabularStore`] seam.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents
//!  │
//!  ├─ 1. Extract    flavor → grids → locate labels → metadata → JSON array
//!  ├─ 2. Transform  validate/quarantine → canonical columns → i64 amounts
//!  │                → end-of-month report_date → fact + 4 dim CSVs
//!  └─ 3. Load       upsert facts by (company, report_date), dimension rows
//!                   by fact id — idempotent on re-run
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use finstar_etl::{run_pipeline, PipelineConfig, PipelineOptions, SidecarReader, SqliteStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .input_dir("data/downloads")
//!         .work_dir("data")
//!         .build()?;
//!     let reader = SidecarReader::new();
//!     let mut store = SqliteStore::open("data/finstar.db")?;
//!     let report = run_pipeline(&config, &reader, &mut store, PipelineOptions::default(), None)?;
//!     if let Some(extract) = &report.extract {
//!         eprintln!("{} extracted, {} skipped", extract.processed, extract.skipped);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `finstar` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! finstar-etl = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod progress;
pub mod record;
pub mod run;
pub mod source;
pub mod store;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DatePattern, Flavor, FlavorRule, PipelineConfig, PipelineConfigBuilder};
pub use error::{DocumentError, EtlError};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use record::{
    DocumentMetadata, DocumentRecord, FactRecord, FieldMap, FieldValue, Section, SectionTable,
    TableGrid,
};
pub use run::{run_pipeline, PipelineOptions, PipelineReport, StageReport};
pub use source::{DocumentReader, SidecarReader};
pub use store::{SqliteStore, TabularStore};
