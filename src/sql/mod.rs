//! SQL text assembly and execution interfaces.
//!
//! This module centralizes identifier quoting and string-literal escaping so
//! every statement the engine emits goes through one implementation, and
//! defines the narrow `SqlExecutor` interface the engine drives.

pub mod duck;
pub mod literal;
pub mod statement;

pub use duck::DuckDbExecutor;
pub use literal::{SqlType, SqlValue};

use crate::error::MaskError;

/// Target SQL dialect for emitted statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    MySql,
    Postgres,
    Sqlite,
    #[default]
    Mssql,
    DuckDb,
}

impl SqlDialect {
    /// Parse a dialect name as given on the command line or in config.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(SqlDialect::MySql),
            "postgres" | "postgresql" => Some(SqlDialect::Postgres),
            "sqlite" => Some(SqlDialect::Sqlite),
            "mssql" | "sqlserver" | "sql_server" | "tsql" => Some(SqlDialect::Mssql),
            "duckdb" => Some(SqlDialect::DuckDb),
            _ => None,
        }
    }

    /// Quote an identifier (table, column, index name).
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", name),
            SqlDialect::Postgres | SqlDialect::Sqlite | SqlDialect::DuckDb => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
            SqlDialect::Mssql => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Quote a schema-qualified table name.
    pub fn quote_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) if !s.is_empty() => {
                format!("{}.{}", self.quote_ident(s), self.quote_ident(table))
            }
            _ => self.quote_ident(table),
        }
    }

    /// Format a string as a quoted SQL literal with dialect-appropriate
    /// escaping. `unicode` requests an `N'...'` literal on SQL Server.
    pub fn string_literal(&self, value: &str, unicode: bool) -> String {
        match self {
            SqlDialect::MySql => {
                // MySQL uses backslash escaping
                let escaped = value
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n")
                    .replace('\r', "\\r")
                    .replace('\t', "\\t")
                    .replace('\0', "\\0");
                format!("'{}'", escaped)
            }
            SqlDialect::Postgres | SqlDialect::Sqlite | SqlDialect::DuckDb => {
                let escaped = value.replace('\'', "''");
                format!("'{}'", escaped)
            }
            SqlDialect::Mssql => {
                let escaped = value.replace('\'', "''");
                if unicode || value.bytes().any(|b| b > 127) {
                    format!("N'{}'", escaped)
                } else {
                    format!("'{}'", escaped)
                }
            }
        }
    }

    /// Concatenation operator for composite expressions.
    pub fn concat_operator(&self) -> &'static str {
        match self {
            SqlDialect::MySql | SqlDialect::Mssql => "+",
            SqlDialect::Postgres | SqlDialect::Sqlite | SqlDialect::DuckDb => "||",
        }
    }

    /// NULL-coalescing function name.
    pub fn coalesce_fn(&self) -> &'static str {
        match self {
            SqlDialect::Mssql => "ISNULL",
            _ => "COALESCE",
        }
    }
}

/// One fetched row: values in the column order of the issued SELECT.
#[derive(Debug, Clone)]
pub struct Row {
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }
}

/// Narrow execution interface the engine drives.
///
/// Implementations own their connection and database identity; the engine
/// only hands over statement text. `execute_batch` may receive multiple
/// `;`-terminated statements in one call.
pub trait SqlExecutor {
    /// Execute one or more statements, discarding any result rows.
    fn execute_batch(&mut self, sql: &str) -> anyhow::Result<()>;

    /// Execute a query and return all result rows.
    fn query(&mut self, sql: &str) -> anyhow::Result<Vec<Row>>;
}

/// Convenience: run a scalar COUNT-style query.
pub fn query_scalar_i64(
    executor: &mut dyn SqlExecutor,
    sql: &str,
    table: &str,
) -> Result<i64, MaskError> {
    let rows = executor.query(sql).map_err(|e| MaskError::DataFetch {
        table: table.to_string(),
        message: e.to_string(),
    })?;
    match rows.first().and_then(|r| r.values.first()) {
        Some(SqlValue::Int(n)) => Ok(*n),
        Some(other) => other
            .canonical_text()
            .parse::<i64>()
            .map_err(|_| MaskError::DataFetch {
                table: table.to_string(),
                message: format!("non-numeric scalar result: {:?}", other),
            }),
        None => Err(MaskError::DataFetch {
            table: table.to_string(),
            message: "empty scalar result".to_string(),
        }),
    }
}
