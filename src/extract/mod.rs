//! Extract stage: one [`DocumentRecord`] per input document.
//!
//! ## Data Flow
//!
//! ```text
//! input dir ──▶ flavor ──▶ detect ──▶ locate ──▶ assemble ──▶ extracted.json
//! (walkdir)    (per path)  (grids)   (4 sections + metadata)  (JSON array)
//! ```
//!
//! 1. [`flavor`]   — choose the table-detection strategy from the path
//! 2. [`locate`]   — find each target label's adjacent value cell
//! 3. [`metadata`] — institution from the path, reporting date from text
//!
//! The assembler in this module is the resilience boundary of the whole
//! pipeline: a collaborator failure on one document is caught, logged, and
//! recorded as a skip; the batch continues with the next document. The
//! stage only fails as a whole when the input directory is unwalkable or
//! the interchange artifact cannot be written.

pub mod flavor;
pub mod locate;
pub mod metadata;

use crate::config::PipelineConfig;
use crate::error::{DocumentError, EtlError};
use crate::progress::{ProgressCallback, Stage};
use crate::record::{DocumentRecord, Section, SectionSet};
use crate::run::StageReport;
use crate::source::DocumentReader;
use flavor::FlavorResolver;
use locate::FieldLocator;
use metadata::MetadataResolver;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Walk the input directory, extract every document, and write the JSON
/// interchange artifact. Returns per-stage counts; per-document failures
/// are skips, not errors.
pub fn run_extract(
    config: &PipelineConfig,
    reader: &dyn DocumentReader,
    progress: Option<&ProgressCallback>,
) -> Result<StageReport, EtlError> {
    if !config.input_dir.is_dir() {
        return Err(EtlError::InputDirNotFound {
            path: config.input_dir.clone(),
        });
    }
    info!("Extracting documents under {}", config.input_dir.display());
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Extract);
    }

    let flavors = FlavorResolver::new(config.flavor_rules.clone());
    let metadata_resolver = MetadataResolver::new(config);
    let locators = SectionLocators::new(config);

    let mut records: Vec<DocumentRecord> = Vec::new();
    let mut report = StageReport::default();

    for entry in WalkDir::new(&config.input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_pdf(path) {
            continue;
        }
        let ordinal = report.processed + report.skipped + 1;
        let label = relative_label(path, &config.input_dir);
        if let Some(cb) = progress {
            cb.on_item_start(Stage::Extract, ordinal, &label);
        }

        match assemble_document(config, reader, &flavors, &metadata_resolver, &locators, path)? {
            Ok(record) => {
                debug!("Extracted {label}");
                records.push(record);
                report.processed += 1;
                if let Some(cb) = progress {
                    cb.on_item_ok(Stage::Extract, ordinal, &label);
                }
            }
            Err(doc_err) => {
                warn!("Skipping {label}: {doc_err}");
                report.skipped += 1;
                report.skip_reasons.push(doc_err.to_string());
                if let Some(cb) = progress {
                    cb.on_item_skipped(Stage::Extract, ordinal, &label, &doc_err.to_string());
                }
            }
        }
    }

    write_interchange(config, &records)?;
    info!(
        "Extract complete: {} records, {} skipped → {}",
        report.processed,
        report.skipped,
        config.extracted_path().display()
    );
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Extract, report.processed, report.skipped);
    }
    Ok(report)
}

/// One pre-built locator per statement section, each with its own
/// disjoint target-label set.
struct SectionLocators {
    assets: FieldLocator,
    liabilities: FieldLocator,
    equity: FieldLocator,
    income: FieldLocator,
}

impl SectionLocators {
    fn new(config: &PipelineConfig) -> Self {
        let build = |s: Section| FieldLocator::new(s, config.section_fields(s));
        Self {
            assets: build(Section::Assets),
            liabilities: build(Section::Liabilities),
            equity: build(Section::Equity),
            income: build(Section::Income),
        }
    }
}

/// Assemble one record. The outer `Result` is fatal (configuration
/// invariant broken); the inner one is the per-document skip path.
fn assemble_document(
    config: &PipelineConfig,
    reader: &dyn DocumentReader,
    flavors: &FlavorResolver,
    metadata_resolver: &MetadataResolver,
    locators: &SectionLocators,
    path: &Path,
) -> Result<Result<DocumentRecord, DocumentError>, EtlError> {
    let flavor = flavors.resolve(path);
    debug!("{}: flavor {flavor}", path.display());

    let grids = match reader.detect_tables(path, flavor) {
        Ok(grids) => grids,
        Err(e) => return Ok(Err(e)),
    };
    let text = match reader.first_page_text(path) {
        Ok(text) => text,
        Err(e) => return Ok(Err(e)),
    };

    let metadata = metadata_resolver.resolve(path, &text);

    let sections = SectionSet {
        assets: locators.assets.locate(&grids)?,
        liabilities: locators.liabilities.locate(&grids)?,
        equity: locators.equity.locate(&grids)?,
        income: locators.income.locate(&grids)?,
    };

    Ok(Ok(DocumentRecord {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source_folder: relative_folder(path, &config.input_dir),
        metadata,
        sections,
    }))
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Subfolder path between the input root and the file, `.` at the root.
fn relative_folder(path: &Path, root: &Path) -> String {
    path.parent()
        .and_then(|p| p.strip_prefix(root).ok())
        .map(|p| {
            if p.as_os_str().is_empty() {
                ".".to_string()
            } else {
                p.to_string_lossy().replace('\\', "/")
            }
        })
        .unwrap_or_else(|| ".".to_string())
}

fn relative_label(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn write_interchange(config: &PipelineConfig, records: &[DocumentRecord]) -> Result<(), EtlError> {
    let out = config.extracted_path();
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| EtlError::ArtifactWriteFailed {
            path: out.clone(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| EtlError::MalformedArtifact {
            path: out.clone(),
            detail: e.to_string(),
        })?;
    fs::write(&out, json).map_err(|e| EtlError::ArtifactWriteFailed {
        path: out,
        source: e,
    })
}
