//! Embedded DuckDB executor.
//!
//! DuckDB is bundled and compiled in, which gives the CLI a real database to
//! mask without any server setup and gives the test suite a true end-to-end
//! path. Any other backend (SQL Server, Postgres, ...) implements
//! `SqlExecutor` outside this crate.

use std::path::Path;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::sql::{Row, SqlExecutor, SqlValue};

pub struct DuckDbExecutor {
    conn: Connection,
}

impl DuckDbExecutor {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database {:?}", path))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used by tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory DuckDB database")?;
        Ok(Self { conn })
    }

    fn convert(value: duckdb::types::ValueRef<'_>) -> SqlValue {
        use duckdb::types::ValueRef;
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Boolean(b) => SqlValue::Bool(b),
            ValueRef::TinyInt(n) => SqlValue::Int(n as i64),
            ValueRef::SmallInt(n) => SqlValue::Int(n as i64),
            ValueRef::Int(n) => SqlValue::Int(n as i64),
            ValueRef::BigInt(n) => SqlValue::Int(n),
            ValueRef::HugeInt(n) => SqlValue::Int(n as i64),
            ValueRef::UTinyInt(n) => SqlValue::Int(n as i64),
            ValueRef::USmallInt(n) => SqlValue::Int(n as i64),
            ValueRef::UInt(n) => SqlValue::Int(n as i64),
            ValueRef::UBigInt(n) => SqlValue::Int(n as i64),
            ValueRef::Float(f) => SqlValue::Float(f as f64),
            ValueRef::Double(f) => SqlValue::Float(f),
            ValueRef::Decimal(d) => {
                let text = d.to_string();
                match text.parse::<f64>() {
                    Ok(f) => SqlValue::Float(f),
                    Err(_) => SqlValue::Str(text),
                }
            }
            ValueRef::Text(s) => SqlValue::Str(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => SqlValue::Str(String::from_utf8_lossy(b).into_owned()),
            ValueRef::Timestamp(_, micros) => {
                // DuckDB timestamps are microseconds since epoch
                let secs = micros / 1_000_000;
                let nanos = ((micros % 1_000_000) * 1000) as u32;
                match chrono::DateTime::from_timestamp(secs, nanos) {
                    Some(dt) => SqlValue::DateTime(dt.naive_utc()),
                    None => SqlValue::Str(micros.to_string()),
                }
            }
            ValueRef::Date32(days) => {
                // Days since epoch (1970-01-01); 719163 = days from 0001-01-01
                match chrono::NaiveDate::from_num_days_from_ce_opt(719_163 + days) {
                    Some(date) => SqlValue::Date(date),
                    None => SqlValue::Str(days.to_string()),
                }
            }
            ValueRef::Time64(_, micros) => {
                let secs = (micros / 1_000_000) as u32;
                let nanos = ((micros % 1_000_000) * 1000) as u32;
                match chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
                    Some(time) => SqlValue::Time(time),
                    None => SqlValue::Str(micros.to_string()),
                }
            }
            other => SqlValue::Str(format!("{:?}", other)),
        }
    }
}

impl SqlExecutor for DuckDbExecutor {
    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("Failed to execute batch: {}", truncate_sql(sql)))
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare query: {}", truncate_sql(sql)))?;

        let mut rows_result = stmt
            .query([])
            .with_context(|| format!("Failed to execute query: {}", truncate_sql(sql)))?;

        let mut rows = Vec::new();
        let mut column_count = 0;

        while let Some(row) = rows_result.next()? {
            if column_count == 0 {
                column_count = row.as_ref().column_count();
            }
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = match row.get_ref(i) {
                    Ok(v) => Self::convert(v),
                    Err(_) => SqlValue::Null,
                };
                values.push(value);
            }
            rows.push(Row::new(values));
        }

        Ok(rows)
    }
}

fn truncate_sql(sql: &str) -> &str {
    let end = sql
        .char_indices()
        .nth(120)
        .map(|(i, _)| i)
        .unwrap_or(sql.len());
    &sql[..end]
}
