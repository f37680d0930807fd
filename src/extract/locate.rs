//! Field location: find each target label's adjacent value cell inside a
//! sequence of heterogeneously-formatted table grids.
//!
//! The layout assumption is the one thing all the source institutions
//! share: a line item's label sits in one cell and its value sits in the
//! cell immediately to the label column's right. Everything else — which
//! grid holds which section, how many columns a table has, where the label
//! column sits — varies per source, so the locator derives row and pivot
//! column per label from the grid itself rather than from any fixed
//! geometry.
//!
//! Per label, grids are scanned in document order and the first grid that
//! yields an in-bounds value resolves the field: the match row is the
//! first row-major occurrence, the pivot column is the first column
//! anywhere in that grid containing the label, and the value is the cell
//! at (match_row, pivot + 1). A match whose value column falls outside
//! the grid leaves the field unresolved and the scan moves on to the next
//! grid; a label never resolved anywhere stays [`FieldValue::Missing`] —
//! never an error. A label-less grid simply contributes nothing.

use crate::error::EtlError;
use crate::record::{FieldMap, FieldValue, Section, TableGrid};

/// Locates configured target labels inside table grids.
#[derive(Debug, Clone)]
pub struct FieldLocator {
    /// Lowercased, trimmed target labels in configuration order.
    labels: Vec<String>,
    section: Section,
}

impl FieldLocator {
    pub fn new(section: Section, labels: &[String]) -> Self {
        Self {
            labels: labels.to_vec(),
            section,
        }
    }

    /// Scan the grids and return the fixed-shape field map for this
    /// section. Every configured label is present; unresolved labels stay
    /// `Missing`.
    pub fn locate(&self, grids: &[TableGrid]) -> Result<FieldMap, EtlError> {
        let mut map = FieldMap::new(&self.labels);

        for label in &self.labels {
            if let Some(value) = locate_one(grids, label) {
                map.set(self.section, label, value)?;
            }
        }
        Ok(map)
    }
}

/// Resolve one label across the grid sequence. `None` means no grid
/// yielded an in-bounds value; a grid whose match sits in its last column
/// has nothing to offer and the scan continues with the next grid.
fn locate_one(grids: &[TableGrid], label: &str) -> Option<FieldValue> {
    for grid in grids {
        let mut match_row = None;
        let mut pivot_col = None;

        for (r, row) in grid.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell_matches(cell, label) {
                    if match_row.is_none() {
                        match_row = Some(r);
                    }
                    pivot_col = Some(match pivot_col {
                        Some(p) if p <= c => p,
                        _ => c,
                    });
                }
            }
        }

        if let (Some(r), Some(c)) = (match_row, pivot_col) {
            if let Some(value) = grid.cell(r, c + 1) {
                return Some(FieldValue::Raw(value.to_string()));
            }
            // Match in the grid's last column: no value cell here, keep
            // scanning the remaining grids.
        }
    }
    None
}

fn cell_matches(cell: &str, label: &str) -> bool {
    cell.trim().to_lowercase() == label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> TableGrid {
        TableGrid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn locator(labels: &[&str]) -> FieldLocator {
        FieldLocator::new(
            Section::Assets,
            &labels.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn value_is_cell_right_of_label() {
        let g = grid(&[&["kas", "1.234"], &["total aset", "9.999"]]);
        let map = locator(&["kas", "total aset"]).locate(&[g]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("1.234".into())));
        assert_eq!(map.get("total aset"), Some(&FieldValue::Raw("9.999".into())));
    }

    #[test]
    fn match_is_case_and_trim_insensitive() {
        let g = grid(&[&["  Total Aset ", "500"]]);
        let map = locator(&["total aset"]).locate(&[g]).unwrap();
        assert_eq!(map.get("total aset"), Some(&FieldValue::Raw("500".into())));
    }

    #[test]
    fn absent_label_stays_missing_without_error() {
        let g = grid(&[&["giro", "100"]]);
        let map = locator(&["kas"]).locate(&[g]).unwrap();
        assert!(map.get("kas").unwrap().is_missing());
    }

    #[test]
    fn value_column_out_of_bounds_stays_missing() {
        // Label in the last column: there is no adjacent value cell.
        let g = grid(&[&["1.234", "kas"]]);
        let map = locator(&["kas"]).locate(&[g]).unwrap();
        assert!(map.get("kas").unwrap().is_missing());
    }

    #[test]
    fn first_grid_with_match_wins() {
        let first = grid(&[&["kas", "111"]]);
        let second = grid(&[&["kas", "222"]]);
        let map = locator(&["kas"]).locate(&[first, second]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("111".into())));
    }

    #[test]
    fn out_of_bounds_match_falls_through_to_a_later_grid() {
        // The first grid matches in its last column, so it has no value
        // cell; the later grid resolves the field.
        let first = grid(&[&["kas"]]);
        let second = grid(&[&["kas", "222"]]);
        let map = locator(&["kas"]).locate(&[first, second]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("222".into())));
    }

    #[test]
    fn out_of_bounds_match_in_the_only_grid_stays_missing() {
        let only = grid(&[&["kas"]]);
        let map = locator(&["kas"]).locate(&[only]).unwrap();
        assert!(map.get("kas").unwrap().is_missing());
    }

    #[test]
    fn duplicate_label_first_row_major_occurrence_wins() {
        let g = grid(&[&["x", "y"], &["kas", "111"], &["kas", "222"]]);
        let map = locator(&["kas"]).locate(&[g]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("111".into())));
    }

    #[test]
    fn pivot_is_first_matching_column_in_the_grid() {
        // The label occurs at column 2 of row 0 and column 0 of row 1, so
        // the pivot is column 0 while the match row stays row 0.
        let g = grid(&[&["a", "b", "kas", "c"], &["kas", "111", "x", "y"]]);
        let map = locator(&["kas"]).locate(&[g]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("b".into())));
    }

    #[test]
    fn label_less_grid_contributes_nothing() {
        let empty = grid(&[&["foo", "bar"]]);
        let real = grid(&[&["kas", "42"]]);
        let map = locator(&["kas"]).locate(&[empty, real]).unwrap();
        assert_eq!(map.get("kas"), Some(&FieldValue::Raw("42".into())));
    }
}
