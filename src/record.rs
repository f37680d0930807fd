//! Core data model: table grids, field values, per-document records, and
//! the columnar section tables the transform stage produces.
//!
//! Two representation choices matter here:
//!
//! * [`FieldValue`] is an explicit three-state value rather than
//!   `Option<String>`. Callers must be able to tell "the label was never
//!   found" apart from "the value is legitimately zero", and the numeric
//!   canonicalizer needs a lossless fallback when a cell does not parse.
//!
//! * [`FieldMap`] is fixed-shape. It is constructed from the configured
//!   label set with every label present as [`FieldValue::Missing`], and
//!   setting a label outside that set is an error. Unexpected keys are a
//!   construction-time failure, never a silent pass-through.

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular grid of text cells produced by table-region detection over
/// one document page region. Immutable once produced by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell at (row, col), or `None` when either index is out of bounds.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One extracted financial-quantity value.
///
/// `Missing` is not the same thing as an empty string: a label that was
/// never located stays `Missing`, while a located-but-empty cell is
/// `Raw("")`. `Number` appears only after numeric canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Missing,
    Raw(String),
    Number(i64),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Render for a delimited artifact: missing values become the empty
    /// field, raw strings and numbers their plain text form.
    pub fn to_csv_field(&self) -> String {
        match self {
            FieldValue::Missing => String::new(),
            FieldValue::Raw(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => write!(f, "—"),
            FieldValue::Raw(s) => write!(f, "{s}"),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The four statement sections every document contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Assets,
    Liabilities,
    Equity,
    Income,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Assets,
        Section::Liabilities,
        Section::Equity,
        Section::Income,
    ];

    /// Key used in the JSON interchange artifact.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Assets => "assets",
            Section::Liabilities => "liabilities",
            Section::Equity => "equity",
            Section::Income => "income",
        }
    }

    /// Name of the dimension table / CSV artifact for this section.
    pub fn dim_table(&self) -> &'static str {
        match self {
            Section::Assets => "dim_assets",
            Section::Liabilities => "dim_liabilities",
            Section::Equity => "dim_equity",
            Section::Income => "dim_income",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fixed-shape mapping from configured target labels to located values.
///
/// Every configured label is always present (schema completeness
/// invariant); unresolved labels carry [`FieldValue::Missing`]. Label order
/// is the configuration order, which keeps downstream column order
/// deterministic.
///
/// Serialized as a JSON object whose unresolved labels are `null`, matching
/// the interchange artifact shape the transform stage validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl Serialize for FieldMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> serde::de::Visitor<'de> for MapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of target labels to optional values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<FieldMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, value)) = access.next_entry::<String, FieldValue>()? {
                    entries.push((label, value));
                }
                Ok(FieldMap { entries })
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

impl FieldMap {
    /// Pre-fill every configured label with `Missing`.
    pub fn new(labels: &[String]) -> Self {
        Self {
            entries: labels
                .iter()
                .map(|l| (l.clone(), FieldValue::Missing))
                .collect(),
        }
    }

    /// Set a located value. The label must belong to the configured set.
    pub fn set(&mut self, section: Section, label: &str, value: FieldValue) -> Result<(), EtlError> {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(EtlError::UnknownField {
                label: label.to_string(),
                section: section.to_string(),
            }),
        }
    }

    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Institution identity and reporting date for one document.
///
/// Any field may be `None`: metadata extraction never fails, it degrades.
///
/// The institution travels as `company` in the interchange artifact; that
/// is the field name the schema validator and the fact table use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "company")]
    pub institution: Option<String>,
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub month_name: Option<String>,
    pub year: Option<i32>,
}

impl DocumentMetadata {
    /// True when the (day, month, year) triple is fully present.
    pub fn has_complete_date(&self) -> bool {
        self.day.is_some() && self.month.is_some() && self.year.is_some()
    }
}

/// One per-document record: the unit the schema validator gates and the
/// shape of each element in the JSON interchange artifact. Immutable after
/// assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// File name of the source document (no directories).
    pub file: String,
    /// Path segment(s) between the input root and the file; the first
    /// segment is the issuing institution's folder.
    pub source_folder: String,
    pub metadata: DocumentMetadata,
    pub sections: SectionSet,
}

/// The four per-section field maps of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSet {
    pub assets: FieldMap,
    pub liabilities: FieldMap,
    pub equity: FieldMap,
    pub income: FieldMap,
}

impl SectionSet {
    pub fn get(&self, section: Section) -> &FieldMap {
        match section {
            Section::Assets => &self.assets,
            Section::Liabilities => &self.liabilities,
            Section::Equity => &self.equity,
            Section::Income => &self.income,
        }
    }
}

/// One row of the fact table: natural key (institution, report_date) plus
/// the raw date triple. The surrogate id is assigned by the store on first
/// insert, never by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub institution: String,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub report_date: chrono::NaiveDate,
}

/// Columnar collection of uniform-shape rows for a single table.
///
/// Column order is deterministic and independent of row order; every row
/// has exactly `columns.len()` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl SectionTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<FieldValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(ls: &[&str]) -> Vec<String> {
        ls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn field_map_prefills_missing() {
        let fm = FieldMap::new(&labels(&["kas", "total aset"]));
        assert_eq!(fm.len(), 2);
        assert!(fm.get("kas").unwrap().is_missing());
        assert!(fm.get("total aset").unwrap().is_missing());
    }

    #[test]
    fn field_map_rejects_unknown_label() {
        let mut fm = FieldMap::new(&labels(&["kas"]));
        let err = fm.set(Section::Assets, "goodwill", FieldValue::Raw("5".into()));
        assert!(matches!(err, Err(EtlError::UnknownField { .. })));
    }

    #[test]
    fn field_map_set_known_label() {
        let mut fm = FieldMap::new(&labels(&["kas"]));
        fm.set(Section::Assets, "kas", FieldValue::Raw("1.234".into()))
            .unwrap();
        assert_eq!(fm.get("kas"), Some(&FieldValue::Raw("1.234".into())));
    }

    #[test]
    fn grid_cell_bounds() {
        let g = TableGrid::new(vec![vec!["a".into(), "b".into()]]);
        assert_eq!(g.cell(0, 1), Some("b"));
        assert_eq!(g.cell(0, 2), None);
        assert_eq!(g.cell(1, 0), None);
    }

    #[test]
    fn missing_is_distinct_from_empty_raw() {
        assert_ne!(FieldValue::Missing, FieldValue::Raw(String::new()));
        assert_eq!(FieldValue::Missing.to_csv_field(), "");
        assert_eq!(FieldValue::Raw(String::new()).to_csv_field(), "");
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = DocumentRecord {
            file: "Mei 2024.pdf".into(),
            source_folder: "bca".into(),
            metadata: DocumentMetadata {
                institution: Some("bca".into()),
                day: Some(31),
                month: Some(5),
                month_name: Some("Mei".into()),
                year: Some(2024),
            },
            sections: SectionSet {
                assets: FieldMap::new(&labels(&["kas"])),
                liabilities: FieldMap::new(&labels(&["giro"])),
                equity: FieldMap::new(&labels(&["total ekuitas"])),
                income: FieldMap::new(&labels(&["beban bunga"])),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: DocumentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata, record.metadata);
        assert_eq!(back.sections.assets, record.sections.assets);
    }
}
