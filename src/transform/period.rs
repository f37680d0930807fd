//! Reporting-period derivation: the canonical end-of-month date.
//!
//! Monthly statements are keyed by the last calendar day of their
//! reporting month, whatever day the header happened to print. Unlike the
//! lenient numeric pass, failure here is fatal for the row: report_date is
//! the natural-key half used for fact deduplication downstream, and a
//! silently null join key would corrupt the star schema.

use crate::error::EtlError;
use chrono::NaiveDate;

/// Last calendar day of (year, month).
pub fn end_of_month(year: i32, month: u32) -> Result<NaiveDate, EtlError> {
    if !(1..=12).contains(&month) {
        return Err(EtlError::DateConstruction {
            year,
            month,
            detail: "month outside 1–12".into(),
        });
    }
    let (next_year, next_month) = if month == 12 {
        let next = year.checked_add(1).ok_or_else(|| EtlError::DateConstruction {
            year,
            month,
            detail: "year unrepresentable".into(),
        })?;
        (next, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| EtlError::DateConstruction {
            year,
            month,
            detail: "year unrepresentable".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_year_february() {
        assert_eq!(
            end_of_month(2024, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn common_year_february() {
        assert_eq!(
            end_of_month(2023, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
    }

    #[test]
    fn december_rolls_into_next_year() {
        assert_eq!(
            end_of_month(2024, 12).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn thirty_day_month() {
        assert_eq!(
            end_of_month(2024, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()
        );
    }

    #[test]
    fn month_thirteen_fails() {
        let err = end_of_month(2024, 13).unwrap_err();
        assert!(matches!(err, EtlError::DateConstruction { month: 13, .. }));
    }

    #[test]
    fn month_zero_fails() {
        assert!(end_of_month(2024, 0).is_err());
    }

    #[test]
    fn december_of_max_year_fails_instead_of_overflowing() {
        let err = end_of_month(i32::MAX, 12).unwrap_err();
        assert!(matches!(err, EtlError::DateConstruction { month: 12, .. }));
    }
}
