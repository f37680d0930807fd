//! Transform stage: validated interchange records → normalized star-schema
//! artifacts.
//!
//! ## Data Flow
//!
//! ```text
//! extracted.json ──▶ validate ──▶ tabulate ──▶ columns ──▶ numeric ──▶ period
//!  (JSON array)     (gate/        (fact + 4    (canonical  (i64       (end of
//!                    quarantine)   dim tables)  names)      amounts)    month)
//!                                                   │
//!                                                   └──▶ fact_report.csv + dim_*.csv
//! ```
//!
//! 1. [`validate`] — structural gate; date-incomplete records quarantined
//! 2. [`columns`]  — canonical names and synonym merging
//! 3. [`numeric`]  — lenient amount coercion
//! 4. [`period`]   — end-of-month report_date (fatal per row on failure)
//!
//! The stage reads the JSON artifact once and writes five delimited
//! artifacts; it touches no store. Rejected and quarantined records are
//! logged with their 1-based ordinal and never abort the batch.

pub mod columns;
pub mod numeric;
pub mod period;
pub mod validate;

use crate::config::PipelineConfig;
use crate::error::EtlError;
use crate::progress::{ProgressCallback, Stage};
use crate::record::{FieldValue, Section, SectionTable};
use crate::run::StageReport;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use validate::{Outcome, ValidRecord};

/// Read the interchange artifact, normalize it, and write the five
/// star-schema CSV artifacts.
pub fn run_transform(
    config: &PipelineConfig,
    progress: Option<&ProgressCallback>,
) -> Result<StageReport, EtlError> {
    info!("Transforming {}", config.extracted_path().display());
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Transform);
    }

    let raw = read_interchange(&config.extracted_path())?;
    let mut report = StageReport::default();

    // ── Gate ─────────────────────────────────────────────────────────────
    let mut accepted: Vec<ValidRecord> = Vec::with_capacity(raw.len());
    for (idx, record) in raw.iter().enumerate() {
        let ordinal = idx + 1;
        let label = format!("record {ordinal}");
        if let Some(cb) = progress {
            cb.on_item_start(Stage::Transform, ordinal, &label);
        }
        match validate::validate_record(record) {
            Outcome::Accepted(valid) => {
                if let Some(cb) = progress {
                    cb.on_item_ok(Stage::Transform, ordinal, &label);
                }
                accepted.push(valid);
            }
            Outcome::Quarantined { reason } => {
                warn!("Quarantining record {ordinal}: {reason}");
                report.quarantined += 1;
                report.skip_reasons.push(format!("record {ordinal}: {reason}"));
                if let Some(cb) = progress {
                    cb.on_item_skipped(Stage::Transform, ordinal, &label, &reason);
                }
            }
            Outcome::Rejected { reason } => {
                warn!("Invalid schema at record {ordinal}, skipping: {reason}");
                report.skipped += 1;
                report.skip_reasons.push(format!("record {ordinal}: {reason}"));
                if let Some(cb) = progress {
                    cb.on_item_skipped(Stage::Transform, ordinal, &label, &reason);
                }
            }
        }
    }

    // ── Report-date derivation ───────────────────────────────────────────
    // A failed end-of-month construction is fatal for the row (its
    // report_date is a join key) but not for the batch; it is surfaced as
    // an error, unlike the silent numeric degrade.
    let mut emitted: Vec<(ValidRecord, chrono::NaiveDate)> = Vec::with_capacity(accepted.len());
    for record in accepted {
        match period::end_of_month(record.year, record.month) {
            Ok(date) => emitted.push((record, date)),
            Err(e) => {
                error!("Dropping row for '{}': {e}", record.institution);
                report.skipped += 1;
                report.skip_reasons.push(e.to_string());
            }
        }
    }

    // ── Tabulate ─────────────────────────────────────────────────────────
    let fact = build_fact_table(&emitted);
    let dims: Vec<(Section, SectionTable)> = Section::ALL
        .iter()
        .map(|&s| (s, build_dim_table(s, &emitted)))
        .collect();

    // ── Normalize and coerce ─────────────────────────────────────────────
    let fact = columns::normalize_columns(fact, &config.synonyms);
    let dims: Vec<(Section, SectionTable)> = dims
        .into_iter()
        .map(|(s, table)| {
            let mut table = columns::normalize_columns(table, &config.synonyms);
            numeric::canonicalize_numeric(&mut table, &config.numeric_exclusions);
            (s, table)
        })
        .collect();

    // ── Write artifacts ──────────────────────────────────────────────────
    write_csv(&config.fact_path(), &fact)?;
    for (section, table) in &dims {
        write_csv(&config.dim_path(*section), table)?;
    }

    report.processed = emitted.len();
    info!(
        "Transform complete: {} rows, {} rejected, {} quarantined",
        report.processed, report.skipped, report.quarantined
    );
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Transform, report.processed, report.skipped + report.quarantined);
    }
    Ok(report)
}

fn read_interchange(path: &Path) -> Result<Vec<serde_json::Value>, EtlError> {
    if !path.is_file() {
        return Err(EtlError::ArtifactMissing {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|e| EtlError::MalformedArtifact {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| EtlError::MalformedArtifact {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    match value {
        serde_json::Value::Array(records) => Ok(records),
        _ => Err(EtlError::MalformedArtifact {
            path: path.to_path_buf(),
            detail: "top-level value is not an array".into(),
        }),
    }
}

/// Fact table with flattened metadata columns; the column normalizer
/// strips the `metadata.` prefix again downstream.
fn build_fact_table(emitted: &[(ValidRecord, chrono::NaiveDate)]) -> SectionTable {
    let mut table = SectionTable::new(vec![
        "report_id".into(),
        "metadata.company".into(),
        "metadata.day".into(),
        "metadata.month".into(),
        "metadata.year".into(),
        "report_date".into(),
    ]);
    for (i, (record, date)) in emitted.iter().enumerate() {
        table.push_row(vec![
            FieldValue::Number(i as i64 + 1),
            FieldValue::Raw(record.institution.clone()),
            FieldValue::Number(record.day.into()),
            FieldValue::Number(record.month.into()),
            FieldValue::Number(record.year.into()),
            FieldValue::Raw(date.to_string()),
        ]);
    }
    table
}

/// One dimension table per section: report_id plus the union of the raw
/// labels across records, in first-seen order. Records normally share a
/// uniform shape (the field sets are fixed configuration), so the union is
/// just that shape; a label absent from one record degrades to a missing
/// cell rather than an error.
fn build_dim_table(section: Section, emitted: &[(ValidRecord, chrono::NaiveDate)]) -> SectionTable {
    let mut labels: Vec<String> = Vec::new();
    for (record, _) in emitted {
        if let Some((_, fields)) = record.sections.iter().find(|(s, _)| *s == section) {
            for (label, _) in fields {
                if !labels.iter().any(|l| l == label) {
                    labels.push(label.clone());
                }
            }
        }
    }

    let mut columns = vec!["report_id".to_string()];
    columns.extend(labels.iter().cloned());
    let mut table = SectionTable::new(columns);

    for (i, (record, _)) in emitted.iter().enumerate() {
        let fields = record
            .sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, f)| f.as_slice())
            .unwrap_or(&[]);
        let mut row = Vec::with_capacity(labels.len() + 1);
        row.push(FieldValue::Number(i as i64 + 1));
        for label in &labels {
            row.push(
                fields
                    .iter()
                    .find(|(l, _)| l == label)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(FieldValue::Missing),
            );
        }
        table.push_row(row);
    }
    table
}

fn write_csv(path: &Path, table: &SectionTable) -> Result<(), EtlError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EtlError::ArtifactWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| EtlError::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer
        .write_record(&table.columns)
        .map_err(|e| EtlError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(FieldValue::to_csv_field))
            .map_err(|e| EtlError::Csv {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    writer.flush().map_err(|e| EtlError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_artifact(dir: &Path, records: serde_json::Value) -> PipelineConfig {
        let config = PipelineConfig::builder()
            .input_dir(dir.join("downloads"))
            .work_dir(dir.join("work"))
            .build()
            .unwrap();
        fs::create_dir_all(&config.work_dir).unwrap();
        fs::write(config.extracted_path(), records.to_string()).unwrap();
        config
    }

    fn record(company: &str, month: u32, net_income_label: &str) -> serde_json::Value {
        json!({
            "file": "x.pdf",
            "source_folder": company,
            "metadata": {"company": company, "day": 31, "month": month,
                         "month_name": "Mei", "year": 2024},
            "sections": {
                "assets": {"kas": "1.234", "total aset": "2.000.000"},
                "liabilities": {"giro": null},
                "equity": {"total ekuitas": "500"},
                "income": {(net_income_label): "42"}
            }
        })
    }

    #[test]
    fn writes_five_artifacts_with_canonical_headers() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifact(
            dir.path(),
            json!([record("bca", 5, "laba (rugi) bersih tahun berjalan")]),
        );

        let report = run_transform(&config, None).unwrap();
        assert_eq!(report.processed, 1);

        let fact = fs::read_to_string(config.fact_path()).unwrap();
        assert!(fact.starts_with("report_id,company,day,month,year,report_date"));
        assert!(fact.contains("2024-05-31"));

        let assets = fs::read_to_string(config.dim_path(Section::Assets)).unwrap();
        assert!(assets.starts_with("report_id,kas,total_aset"));
        assert!(assets.contains("1234"), "amounts should be coerced: {assets}");

        let income = fs::read_to_string(config.dim_path(Section::Income)).unwrap();
        assert!(income.starts_with("report_id,laba_rugi_bersih"));
    }

    #[test]
    fn synonym_labels_collapse_across_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifact(
            dir.path(),
            json!([
                record("bca", 5, "laba (rugi) bersih tahun berjalan"),
                record("btn", 6, "laba (rugi) bersih periode berjalan"),
            ]),
        );

        run_transform(&config, None).unwrap();
        let income = fs::read_to_string(config.dim_path(Section::Income)).unwrap();
        let header = income.lines().next().unwrap();
        assert_eq!(header.matches("laba_rugi_bersih").count(), 1);
        // Both rows carry a value in the single merged column.
        for line in income.lines().skip(1) {
            assert!(line.ends_with("42"), "line: {line}");
        }
    }

    #[test]
    fn rejected_and_quarantined_records_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut quarantined = record("bni", 5, "laba (rugi) bersih tahun berjalan");
        quarantined["metadata"]["year"] = serde_json::Value::Null;
        let mut rejected = record("btn", 5, "laba (rugi) bersih tahun berjalan");
        rejected["sections"].as_object_mut().unwrap().remove("liabilities");

        let config = write_artifact(
            dir.path(),
            json!([
                record("bca", 5, "laba (rugi) bersih tahun berjalan"),
                quarantined,
                rejected,
            ]),
        );

        let report = run_transform(&config, None).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.skip_reasons.len(), 2);
    }

    #[test]
    fn invalid_month_drops_row_with_date_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifact(
            dir.path(),
            json!([record("bca", 13, "laba (rugi) bersih tahun berjalan")]),
        );

        let report = run_transform(&config, None).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.skip_reasons[0].contains("month=13"));
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .work_dir(dir.path().join("nowhere"))
            .build()
            .unwrap();
        let err = run_transform(&config, None).unwrap_err();
        assert!(matches!(err, EtlError::ArtifactMissing { .. }));
    }
}
