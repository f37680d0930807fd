//! Schema validation: the gate between the interchange artifact and
//! normalization.
//!
//! The JSON artifact is treated as untrusted interchange even though the
//! extract stage of this same crate usually wrote it — nothing stops an
//! operator from re-running transform against a hand-edited or foreign
//! file. Each record is checked structurally: `metadata.company` must be a
//! non-null string, and each of the four section keys must be present as a
//! mapping from string to optional scalar (nulls allowed as values; an
//! empty mapping is fine, an absent key is not).
//!
//! The date triple is the deliberate exception. The metadata resolver
//! legitimately produces null date fields when a statement's header is
//! garbled, so a hard pass/fail on the triple would conflate "malformed
//! record" with "well-formed record about an unreadable scan". Records
//! with a complete date triple are [`Outcome::Accepted`]; well-formed
//! records with an incomplete triple are [`Outcome::Quarantined`] — kept
//! out of the fact set (report_date is a join key) but counted and logged
//! distinctly from structural rejections.

use crate::record::{FieldValue, Section};
use serde_json::Value;

/// Validation result for one interchange record.
#[derive(Debug)]
pub enum Outcome {
    Accepted(ValidRecord),
    /// Structurally sound but the (day, month, year) triple is incomplete.
    Quarantined { reason: String },
    /// Structurally broken; never reaches normalization.
    Rejected { reason: String },
}

/// A record that passed the gate, with its date triple narrowed to
/// concrete integers.
#[derive(Debug, Clone)]
pub struct ValidRecord {
    pub institution: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    /// Per-section field values, keyed by the raw (pre-canonical) labels,
    /// in the order they appear in the record.
    pub sections: Vec<(Section, Vec<(String, FieldValue)>)>,
}

/// Validate one record of the interchange array.
pub fn validate_record(record: &Value) -> Outcome {
    let Some(obj) = record.as_object() else {
        return Outcome::Rejected {
            reason: "record is not an object".into(),
        };
    };

    let Some(metadata) = obj.get("metadata").and_then(Value::as_object) else {
        return Outcome::Rejected {
            reason: "missing 'metadata' object".into(),
        };
    };

    let Some(institution) = metadata.get("company").and_then(Value::as_str) else {
        return Outcome::Rejected {
            reason: "metadata.company is missing or not a string".into(),
        };
    };

    let Some(sections_obj) = obj.get("sections").and_then(Value::as_object) else {
        return Outcome::Rejected {
            reason: "missing 'sections' object".into(),
        };
    };

    let mut sections = Vec::with_capacity(Section::ALL.len());
    for section in Section::ALL {
        let Some(section_value) = sections_obj.get(section.key()) else {
            return Outcome::Rejected {
                reason: format!("missing '{}' section", section.key()),
            };
        };
        match parse_section(section_value) {
            Ok(fields) => sections.push((section, fields)),
            Err(reason) => {
                return Outcome::Rejected {
                    reason: format!("section '{}': {reason}", section.key()),
                }
            }
        }
    }

    // Structural checks passed; now the date triple decides accept vs
    // quarantine. A non-integer date field is structural damage and
    // rejects; an absent one quarantines.
    let mut triple = [None::<i64>; 3];
    for (slot, key) in triple.iter_mut().zip(["day", "month", "year"]) {
        match metadata.get(key) {
            None | Some(Value::Null) => {}
            Some(v) => match v.as_i64() {
                Some(n) => *slot = Some(n),
                None => {
                    return Outcome::Rejected {
                        reason: format!("metadata.{key} is not an integer"),
                    }
                }
            },
        }
    }
    let (Some(day), Some(month), Some(year)) = (triple[0], triple[1], triple[2]) else {
        return Outcome::Quarantined {
            reason: format!(
                "incomplete date triple for '{institution}' (day={:?} month={:?} year={:?})",
                triple[0], triple[1], triple[2]
            ),
        };
    };

    // Range-check the triple instead of truncating: the artifact may have
    // been hand-edited and a wrapped cast would admit nonsense dates.
    let day = match u32::try_from(day) {
        Ok(d) if (1..=31).contains(&d) => d,
        _ => {
            return Outcome::Rejected {
                reason: format!("metadata.day {day} is outside 1–31"),
            }
        }
    };
    let Ok(month) = u32::try_from(month) else {
        return Outcome::Rejected {
            reason: format!("metadata.month {month} is not a month number"),
        };
    };
    let Ok(year) = i32::try_from(year) else {
        return Outcome::Rejected {
            reason: format!("metadata.year {year} is out of range"),
        };
    };

    Outcome::Accepted(ValidRecord {
        institution: institution.to_string(),
        day,
        month,
        year,
        sections,
    })
}

/// A section must be a map from string to null/scalar.
fn parse_section(value: &Value) -> Result<Vec<(String, FieldValue)>, String> {
    let Some(map) = value.as_object() else {
        return Err("not a mapping".into());
    };
    let mut fields = Vec::with_capacity(map.len());
    for (label, v) in map {
        let field = match v {
            Value::Null => FieldValue::Missing,
            Value::String(s) => FieldValue::Raw(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Number(i),
                None => return Err(format!("'{label}' is not an integer")),
            },
            _ => return Err(format!("'{label}' is not a scalar")),
        };
        fields.push((label.clone(), field));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "file": "Mei 2024.pdf",
            "source_folder": "bca",
            "metadata": {
                "company": "bca",
                "day": 31, "month": 5, "month_name": "Mei", "year": 2024
            },
            "sections": {
                "assets": {"kas": "1.234", "total aset": null},
                "liabilities": {},
                "equity": {"total ekuitas": "9"},
                "income": {"beban bunga": "2"}
            }
        })
    }

    #[test]
    fn complete_record_is_accepted() {
        match validate_record(&full_record()) {
            Outcome::Accepted(r) => {
                assert_eq!(r.institution, "bca");
                assert_eq!((r.day, r.month, r.year), (31, 5, 2024));
                assert_eq!(r.sections.len(), 4);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn missing_section_key_is_rejected() {
        let mut record = full_record();
        record["sections"]
            .as_object_mut()
            .unwrap()
            .remove("liabilities");
        match validate_record(&record) {
            Outcome::Rejected { reason } => assert!(reason.contains("liabilities")),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn present_but_empty_section_is_accepted() {
        // `liabilities` is `{}` in the fixture and the record still passes.
        assert!(matches!(
            validate_record(&full_record()),
            Outcome::Accepted(_)
        ));
    }

    #[test]
    fn null_company_is_rejected() {
        let mut record = full_record();
        record["metadata"]["company"] = Value::Null;
        assert!(matches!(
            validate_record(&record),
            Outcome::Rejected { .. }
        ));
    }

    #[test]
    fn incomplete_date_triple_is_quarantined_not_rejected() {
        let mut record = full_record();
        record["metadata"]["month"] = Value::Null;
        match validate_record(&record) {
            Outcome::Quarantined { reason } => assert!(reason.contains("bca")),
            other => panic!("expected Quarantined, got {other:?}"),
        }
    }

    #[test]
    fn month_beyond_u32_is_rejected_not_wrapped() {
        // 2^32 + 1 would truncate to month 1 under a plain cast.
        let mut record = full_record();
        record["metadata"]["month"] = json!(4_294_967_297i64);
        match validate_record(&record) {
            Outcome::Rejected { reason } => assert!(reason.contains("month"), "got: {reason}"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn negative_day_is_rejected_not_wrapped() {
        let mut record = full_record();
        record["metadata"]["day"] = json!(-1);
        match validate_record(&record) {
            Outcome::Rejected { reason } => assert!(reason.contains("day"), "got: {reason}"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn day_outside_calendar_range_is_rejected() {
        for bad in [0i64, 32] {
            let mut record = full_record();
            record["metadata"]["day"] = json!(bad);
            assert!(
                matches!(validate_record(&record), Outcome::Rejected { .. }),
                "day {bad} should be rejected"
            );
        }
    }

    #[test]
    fn year_beyond_i32_is_rejected() {
        let mut record = full_record();
        record["metadata"]["year"] = json!(i64::from(i32::MAX) + 1);
        assert!(matches!(
            validate_record(&record),
            Outcome::Rejected { .. }
        ));
    }

    #[test]
    fn non_integer_day_is_rejected() {
        let mut record = full_record();
        record["metadata"]["day"] = json!("thirty-one");
        assert!(matches!(
            validate_record(&record),
            Outcome::Rejected { .. }
        ));
    }

    #[test]
    fn null_section_values_are_missing_fields() {
        match validate_record(&full_record()) {
            Outcome::Accepted(r) => {
                let (_, assets) = &r.sections[0];
                assert_eq!(assets[1], ("total aset".to_string(), FieldValue::Missing));
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }
}
