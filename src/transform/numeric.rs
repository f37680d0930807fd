//! Numeric canonicalization: coerce locale-formatted amount strings to
//! integers.
//!
//! Statement amounts arrive as Indonesian-formatted strings with periods
//! as thousands separators ("1.234.567"). For every column not in the
//! exclusion set (identity and date columns), periods are stripped and the
//! remainder parsed as an `i64`. A value that still fails to parse — a
//! decimal comma, stray footnote text, an OCR artifact — is left as its
//! raw string, not coerced and not errored. This lenient degrade keeps one
//! bad cell from poisoning a row while staying visibly raw downstream;
//! note that a comma is *not* stripped, so "12,5" stays raw instead of
//! silently becoming 125.

use crate::record::{FieldValue, SectionTable};
use tracing::debug;

/// Canonicalize every non-excluded column of the table in place.
pub fn canonicalize_numeric(table: &mut SectionTable, exclusions: &[String]) {
    let numeric_cols: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !exclusions.iter().any(|e| e == *name))
        .map(|(i, _)| i)
        .collect();

    for row in &mut table.rows {
        for &col in &numeric_cols {
            let Some(cell) = row.get_mut(col) else {
                continue;
            };
            if let FieldValue::Raw(s) = cell {
                match parse_amount(s) {
                    Some(n) => *cell = FieldValue::Number(n),
                    None => debug!("Leaving unparseable amount as raw text: '{s}'"),
                }
            }
        }
    }
}

/// Strip thousands-separator periods and parse. `None` when the remainder
/// is not a plain integer.
fn parse_amount(raw: &str) -> Option<i64> {
    let stripped: String = raw.trim().chars().filter(|&c| c != '.').collect();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse().ok()
}
