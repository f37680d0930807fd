//! Column normalization: canonicalize field names and merge synonym
//! columns.
//!
//! Every issuing institution words its line items slightly differently, so
//! the same financial concept arrives under several raw labels. This
//! module collapses them into one canonical column set in five ordered
//! steps:
//!
//! 1. strip known structural prefixes (`metadata.`, `data.`)
//! 2. lowercase
//! 3. replace every run of non-alphanumeric characters with a single
//!    underscore and trim leading/trailing underscores
//! 4. rename recognized aliases through the configured synonym table
//! 5. merge columns that now share a canonical name, taking per row the
//!    first non-missing value in original left-to-right order, then drop
//!    the redundant columns
//!
//! The output column set depends only on the input column set (never on
//! row order), and the whole pass is idempotent: normalizing an already
//! canonical table is a no-op.

use crate::record::{FieldValue, SectionTable};
use once_cell::sync::Lazy;
use regex::Regex;

/// Structural prefixes introduced by record flattening.
const STRUCTURAL_PREFIXES: [&str; 2] = ["metadata.", "data."];

/// Runs of anything that is not a lowercase letter or digit collapse into
/// one separator.
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid pattern"));

/// Canonical form of one raw column label (steps 1–3; the synonym table is
/// applied separately because merging needs the pre-rename order).
pub fn canonical_name(raw: &str) -> String {
    let mut name = raw;
    for prefix in STRUCTURAL_PREFIXES {
        name = name.strip_prefix(prefix).unwrap_or(name);
    }
    let lower = name.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Apply the full normalization to one table.
pub fn normalize_columns(table: SectionTable, synonyms: &[(String, String)]) -> SectionTable {
    // Steps 1–4: canonicalize, then resolve synonyms.
    let renamed: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let canonical = canonical_name(c);
            synonyms
                .iter()
                .find(|(alias, _)| *alias == canonical)
                .map(|(_, target)| target.clone())
                .unwrap_or(canonical)
        })
        .collect();

    // Step 5: group colliding names, keeping first-seen column order.
    let mut out_columns: Vec<String> = Vec::with_capacity(renamed.len());
    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(renamed.len());
    for (idx, name) in renamed.iter().enumerate() {
        match out_columns.iter().position(|c| c == name) {
            Some(g) => groups[g].push(idx),
            None => {
                out_columns.push(name.clone());
                groups.push(vec![idx]);
            }
        }
    }

    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            groups
                .iter()
                .map(|source_cols| merge_cells(&row, source_cols))
                .collect()
        })
        .collect();

    SectionTable {
        columns: out_columns,
        rows,
    }
}

/// First non-missing value among the colliding source columns, scanning in
/// their original left-to-right order.
fn merge_cells(row: &[FieldValue], source_cols: &[usize]) -> FieldValue {
    source_cols
        .iter()
        .filter_map(|&i| row.get(i))
        .find(|v| !v.is_missing())
        .cloned()
        .unwrap_or(FieldValue::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synonyms() -> Vec<(String, String)> {
        [
            ("laba_rugi_bersih_tahun_berjalan", "laba_rugi_bersih"),
            ("laba_rugi_bersih_periode_berjalan", "laba_rugi_bersih"),
            ("kredit_dan_pembiayaan_yang_diberikan", "kredit_yang_diberikan"),
            ("kredit_yang_diberikan", "kredit_yang_diberikan"),
        ]
        .into_iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect()
    }

    #[test]
    fn canonical_name_strips_prefix_and_punctuation() {
        assert_eq!(canonical_name("metadata.company"), "company");
        assert_eq!(
            canonical_name("pendapatan (beban) bunga bersih"),
            "pendapatan_beban_bunga_bersih"
        );
        assert_eq!(canonical_name("Total Aset "), "total_aset");
        assert_eq!(canonical_name("data.giro"), "giro");
    }

    #[test]
    fn runs_of_non_alphanumerics_collapse_to_one_underscore() {
        assert_eq!(canonical_name("laba (rugi) - bersih"), "laba_rugi_bersih");
        assert_eq!(canonical_name("__kas__"), "kas");
    }

    #[test]
    fn synonym_columns_merge_first_non_missing_left_to_right() {
        let mut table = SectionTable::new(vec![
            "kredit yang diberikan".into(),
            "kredit dan pembiayaan yang diberikan".into(),
        ]);
        table.push_row(vec![FieldValue::Number(5), FieldValue::Missing]);
        table.push_row(vec![FieldValue::Missing, FieldValue::Number(7)]);

        let out = normalize_columns(table, &synonyms());
        assert_eq!(out.columns, ["kredit_yang_diberikan"]);
        assert_eq!(out.rows[0], [FieldValue::Number(5)]);
        assert_eq!(out.rows[1], [FieldValue::Number(7)]);
    }

    #[test]
    fn collision_prefers_leftmost_when_both_present() {
        let mut table = SectionTable::new(vec![
            "laba (rugi) bersih tahun berjalan".into(),
            "laba (rugi) bersih periode berjalan".into(),
        ]);
        table.push_row(vec![
            FieldValue::Raw("100".into()),
            FieldValue::Raw("200".into()),
        ]);

        let out = normalize_columns(table, &synonyms());
        assert_eq!(out.columns, ["laba_rugi_bersih"]);
        assert_eq!(out.rows[0], [FieldValue::Raw("100".into())]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut table = SectionTable::new(vec![
            "report_id".into(),
            "kas".into(),
            "kredit yang diberikan".into(),
        ]);
        table.push_row(vec![
            FieldValue::Number(1),
            FieldValue::Raw("9".into()),
            FieldValue::Missing,
        ]);

        let once = normalize_columns(table, &synonyms());
        let twice = normalize_columns(once.clone(), &synonyms());
        assert_eq!(once, twice);
    }

    #[test]
    fn column_set_is_deterministic_regardless_of_rows() {
        let columns = vec!["metadata.company".into(), "Total Ekuitas".into()];
        let empty = normalize_columns(SectionTable::new(columns.clone()), &synonyms());

        let mut with_rows = SectionTable::new(columns);
        with_rows.push_row(vec![FieldValue::Raw("bca".into()), FieldValue::Number(1)]);
        let populated = normalize_columns(with_rows, &synonyms());

        assert_eq!(empty.columns, populated.columns);
        assert_eq!(empty.columns, ["company", "total_ekuitas"]);
    }
}
