//! Persistence seam: the upsert-capable tabular store.
//!
//! The pipeline only ever needs two primitives from its store —
//! select-by-equality on the fact table's natural key and
//! insert-returning-generated-id. No update or delete is issued.
//! [`TabularStore`] captures exactly that surface so tests can substitute
//! an in-memory database and production can point at a file.
//!
//! [`SqliteStore`] is the shipped implementation. Surrogate fact ids are
//! generated by SQLite (`INTEGER PRIMARY KEY`), never by this crate.
//! Dimension tables are created from the canonical column set the
//! normalizer produced, so the store schema always matches the artifacts.
//!
//! The natural-key lookup-then-insert sequence is not transactional:
//! concurrent writers can race and create duplicate fact rows. The design
//! assumes single-writer batch execution.

use crate::error::EtlError;
use crate::record::{FactRecord, FieldValue, Section};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

/// Store operations used by the load stage.
pub trait TabularStore {
    /// Create the fact table and one dimension table per section with the
    /// given canonical columns. Idempotent.
    fn ensure_schema(&mut self, dims: &[(Section, Vec<String>)]) -> Result<(), EtlError>;

    /// Surrogate id of the fact row with this natural key, if one exists.
    fn find_fact(&self, institution: &str, report_date: NaiveDate) -> Result<Option<i64>, EtlError>;

    /// Insert a fact row and return the generated surrogate id.
    fn insert_fact(&mut self, fact: &FactRecord) -> Result<i64, EtlError>;

    /// True when a dimension row for this fact already exists.
    fn has_dimension(&self, section: Section, fact_id: i64) -> Result<bool, EtlError>;

    /// Insert one dimension row referencing the fact id.
    fn insert_dimension(
        &mut self,
        section: Section,
        fact_id: i64,
        columns: &[String],
        values: &[FieldValue],
    ) -> Result<(), EtlError>;
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EtlError> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, EtlError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Count of rows in one table. Mostly useful to assert idempotence.
    pub fn row_count(&self, table: &str) -> Result<i64, EtlError> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Quote an identifier for embedding in SQL. Canonical column names are
/// `[a-z0-9_]` by construction, but quoting keeps the store robust against
/// substituted configurations.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &FieldValue) -> rusqlite::types::Value {
    match value {
        FieldValue::Missing => rusqlite::types::Value::Null,
        FieldValue::Raw(s) => rusqlite::types::Value::Text(s.clone()),
        FieldValue::Number(n) => rusqlite::types::Value::Integer(*n),
    }
}

impl TabularStore for SqliteStore {
    fn ensure_schema(&mut self, dims: &[(Section, Vec<String>)]) -> Result<(), EtlError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fact_report (
                id          INTEGER PRIMARY KEY,
                company     TEXT NOT NULL,
                day         INTEGER NOT NULL,
                month       INTEGER NOT NULL,
                year        INTEGER NOT NULL,
                report_date TEXT NOT NULL
            );",
        )?;

        for (section, columns) in dims {
            // Typeless columns keep BLOB affinity, so raw strings that a
            // lenient numeric pass left unparsed round-trip unchanged.
            let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    fact_id INTEGER NOT NULL REFERENCES fact_report(id){}{}
                );",
                quote_ident(section.dim_table()),
                if cols.is_empty() { "" } else { ", " },
                cols.join(", ")
            );
            self.conn.execute_batch(&ddl)?;
        }
        Ok(())
    }

    fn find_fact(&self, institution: &str, report_date: NaiveDate) -> Result<Option<i64>, EtlError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM fact_report WHERE company = ?1 AND report_date = ?2")?;
        let mut rows = stmt.query(params![institution, report_date.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn insert_fact(&mut self, fact: &FactRecord) -> Result<i64, EtlError> {
        self.conn.execute(
            "INSERT INTO fact_report (company, day, month, year, report_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fact.institution,
                fact.day,
                fact.month,
                fact.year,
                fact.report_date.to_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn has_dimension(&self, section: Section, fact_id: i64) -> Result<bool, EtlError> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE fact_id = ?1",
                quote_ident(section.dim_table())
            ),
            params![fact_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_dimension(
        &mut self,
        section: Section,
        fact_id: i64,
        columns: &[String],
        values: &[FieldValue],
    ) -> Result<(), EtlError> {
        let col_list: Vec<String> = std::iter::once("fact_id".to_string())
            .chain(columns.iter().map(|c| quote_ident(c)))
            .collect();
        let placeholders: Vec<String> = (1..=col_list.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(section.dim_table()),
            col_list.join(", "),
            placeholders.join(", ")
        );

        let params: Vec<rusqlite::types::Value> =
            std::iter::once(rusqlite::types::Value::Integer(fact_id))
                .chain(values.iter().map(to_sql_value))
                .collect();
        self.conn
            .execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .ensure_schema(&[
                (Section::Equity, vec!["total_ekuitas".into()]),
                (Section::Assets, vec!["kas".into(), "total_aset".into()]),
            ])
            .unwrap();
        store
    }

    fn fact(institution: &str) -> FactRecord {
        FactRecord {
            institution: institution.into(),
            day: 31,
            month: 5,
            year: 2024,
            report_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        }
    }

    #[test]
    fn insert_then_find_by_natural_key() {
        let mut store = test_store();
        let id = store.insert_fact(&fact("bca")).unwrap();
        let found = store
            .find_fact("bca", NaiveDate::from_ymd_opt(2024, 5, 31).unwrap())
            .unwrap();
        assert_eq!(found, Some(id));
    }

    #[test]
    fn find_miss_returns_none() {
        let store = test_store();
        let found = store
            .find_fact("btn", NaiveDate::from_ymd_opt(2024, 5, 31).unwrap())
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn dimension_round_trip() {
        let mut store = test_store();
        let id = store.insert_fact(&fact("bni")).unwrap();
        assert!(!store.has_dimension(Section::Equity, id).unwrap());

        store
            .insert_dimension(
                Section::Equity,
                id,
                &["total_ekuitas".into()],
                &[FieldValue::Number(42)],
            )
            .unwrap();
        assert!(store.has_dimension(Section::Equity, id).unwrap());
        assert_eq!(store.row_count("dim_equity").unwrap(), 1);
    }

    #[test]
    fn missing_values_stored_as_null() {
        let mut store = test_store();
        let id = store.insert_fact(&fact("bca")).unwrap();
        store
            .insert_dimension(
                Section::Assets,
                id,
                &["kas".into(), "total_aset".into()],
                &[FieldValue::Missing, FieldValue::Number(7)],
            )
            .unwrap();
        let kas: Option<i64> = store
            .conn
            .query_row("SELECT kas FROM dim_assets WHERE fact_id = ?1", [id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(kas, None);
    }
}
