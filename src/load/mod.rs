//! Load stage: star-schema artifacts → upsert-capable tabular store.
//!
//! For every normalized row, in artifact order:
//!
//! 1. compute the natural key (company, report_date)
//! 2. ask the store for an existing fact row with that key
//! 3. reuse its surrogate id, or insert a new fact row and capture the
//!    generated id
//! 4. insert the four dimension rows referencing that id — unless a
//!    dimension row for the fact already exists, in which case the insert
//!    is skipped
//!
//! Step 4 makes the whole load idempotent: re-running the pipeline against
//! unchanged input neither duplicates fact rows (natural-key reuse) nor
//! dimension rows (per-fact existence check). The lookup-then-insert
//! sequence is still not transactional; see [`crate::store`].
//!
//! Store failures are not locally recoverable: the stage aborts with
//! [`EtlError::Store`] and the CSV artifacts stay on disk for retry.

use crate::config::PipelineConfig;
use crate::error::EtlError;
use crate::progress::{ProgressCallback, Stage};
use crate::record::{FactRecord, FieldValue, Section, SectionTable};
use crate::run::StageReport;
use crate::store::TabularStore;
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read the five CSV artifacts and upsert them into the store.
pub fn run_load(
    config: &PipelineConfig,
    store: &mut dyn TabularStore,
    progress: Option<&ProgressCallback>,
) -> Result<StageReport, EtlError> {
    info!("Loading star schema from {}", config.work_dir.display());
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Load);
    }

    let fact = read_csv(&config.fact_path())?;
    let dims: Vec<(Section, SectionTable)> = Section::ALL
        .iter()
        .map(|&s| Ok((s, read_csv(&config.dim_path(s))?)))
        .collect::<Result<_, EtlError>>()?;

    // Dimension schemas come from the artifact headers, minus the
    // report_id column which only aligns rows across files at rest.
    let dim_schemas: Vec<(Section, Vec<String>)> = dims
        .iter()
        .map(|(s, t)| (*s, data_columns(t)))
        .collect();
    store.ensure_schema(&dim_schemas)?;

    let mut report = StageReport::default();
    for (idx, row) in fact.rows.iter().enumerate() {
        let ordinal = idx + 1;
        let record = match fact_record(&fact, row) {
            Ok(record) => record,
            Err(reason) => {
                warn!("Skipping fact row {ordinal}: {reason}");
                report.skipped += 1;
                report.skip_reasons.push(format!("row {ordinal}: {reason}"));
                if let Some(cb) = progress {
                    cb.on_item_skipped(Stage::Load, ordinal, "fact row", &reason);
                }
                continue;
            }
        };
        let label = format!("{} {}", record.institution, record.report_date);
        if let Some(cb) = progress {
            cb.on_item_start(Stage::Load, ordinal, &label);
        }

        let fact_id = match store.find_fact(&record.institution, record.report_date)? {
            Some(id) => {
                debug!("Reusing fact_id={id} for {label}");
                id
            }
            None => store.insert_fact(&record)?,
        };

        for (section, table) in &dims {
            let Some(dim_row) = table.rows.get(idx) else {
                warn!("No {} row aligned with fact row {ordinal}", section.dim_table());
                continue;
            };
            if store.has_dimension(*section, fact_id)? {
                debug!("{} row for fact_id={fact_id} already present", section.dim_table());
                continue;
            }
            store.insert_dimension(*section, fact_id, &data_columns(table), &dim_row[1..])?;
        }

        info!("Upserted fact_id={fact_id} for {label}");
        report.processed += 1;
        if let Some(cb) = progress {
            cb.on_item_ok(Stage::Load, ordinal, &label);
        }
    }

    info!(
        "Load complete: {} facts, {} skipped",
        report.processed, report.skipped
    );
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Load, report.processed, report.skipped);
    }
    Ok(report)
}

/// Column names of a dimension artifact without the leading report_id.
fn data_columns(table: &SectionTable) -> Vec<String> {
    table.columns.iter().skip(1).cloned().collect()
}

/// Parse one fact-artifact row into a [`FactRecord`].
fn fact_record(fact: &SectionTable, row: &[FieldValue]) -> Result<FactRecord, String> {
    let cell = |name: &str| -> Result<&FieldValue, String> {
        let i = fact
            .column_index(name)
            .ok_or_else(|| format!("fact artifact has no '{name}' column"))?;
        row.get(i).ok_or_else(|| format!("short row, no '{name}'"))
    };
    let int = |name: &str| -> Result<i64, String> {
        cell(name)?
            .as_number()
            .ok_or_else(|| format!("'{name}' is not an integer"))
    };
    let text = |name: &str| -> Result<String, String> {
        match cell(name)? {
            FieldValue::Raw(s) if !s.is_empty() => Ok(s.clone()),
            _ => Err(format!("'{name}' is missing")),
        }
    };

    let report_date_raw = text("report_date")?;
    let report_date: NaiveDate = report_date_raw
        .parse()
        .map_err(|e| format!("bad report_date '{report_date_raw}': {e}"))?;

    Ok(FactRecord {
        institution: text("company")?,
        day: int("day")? as u32,
        month: int("month")? as u32,
        year: int("year")? as i32,
        report_date,
    })
}

/// Read one delimited artifact back into a columnar table. Empty cells
/// become missing values; plain integers come back as numbers.
fn read_csv(path: &Path) -> Result<SectionTable, EtlError> {
    if !path.is_file() {
        return Err(EtlError::ArtifactMissing {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| EtlError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| EtlError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = SectionTable::new(columns);
    for result in reader.records() {
        let record = result.map_err(|e| EtlError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        table.push_row(record.iter().map(parse_field).collect());
    }
    Ok(table)
}

fn parse_field(cell: &str) -> FieldValue {
    if cell.is_empty() {
        FieldValue::Missing
    } else if let Ok(n) = cell.parse::<i64>() {
        FieldValue::Number(n)
    } else {
        FieldValue::Raw(cell.to_string())
    }
}
