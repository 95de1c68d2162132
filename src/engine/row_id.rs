//! Row identifier lifecycle.
//!
//! Masking updates are keyed on a unique, non-null, ordered integer column.
//! If the table already has an auto-increment column it is reused (and left
//! alone afterwards); otherwise a temporary identity column is added and
//! dropped again when the table completes. The supporting index is created
//! before masking and dropped unconditionally afterwards, whether or not the
//! column was added. Cleanup runs on every exit path, including failures.

use crate::config::TableSpec;
use crate::error::MaskError;
use crate::sql::{SqlDialect, SqlExecutor};

/// Name of the temporary identifier column when one has to be added.
pub const ROW_ID_COLUMN: &str = "__mask_rowid";

#[derive(Debug)]
pub struct RowIdManager {
    dialect: SqlDialect,
    schema: Option<String>,
    table: String,
    column: String,
    /// The column was added by prepare() and must be dropped by cleanup().
    added_column: bool,
    /// Sequence backing the added column on dialects without inline identity.
    sequence: Option<String>,
    index_name: String,
    /// SQLite's implicit rowid needs neither a column nor an index.
    builtin_row_id: bool,
    /// MySQL auto-increment columns carry their own unique index.
    index_via_unique: bool,
}

impl RowIdManager {
    pub fn new(dialect: SqlDialect, spec: &TableSpec) -> Self {
        let (column, added_column, builtin_row_id) = match spec.identity_column() {
            Some(identity) => (identity.name.clone(), false, false),
            None if dialect == SqlDialect::Sqlite => ("rowid".to_string(), false, true),
            None => (ROW_ID_COLUMN.to_string(), true, false),
        };
        let index_name = format!("ix_{}_mask_rowid", sanitize(&spec.table));
        let sequence = if added_column
            && matches!(dialect, SqlDialect::Postgres | SqlDialect::DuckDb)
        {
            Some(format!("seq_{}_mask_rowid", sanitize(&spec.table)))
        } else {
            None
        };
        let index_via_unique = added_column && dialect == SqlDialect::MySql;

        Self {
            dialect,
            schema: spec.schema.clone(),
            table: spec.table.clone(),
            column,
            added_column,
            sequence,
            index_name,
            builtin_row_id,
            index_via_unique,
        }
    }

    /// Identifier column the engine keys updates on.
    pub fn column(&self) -> &str {
        &self.column
    }

    fn qualified_table(&self) -> String {
        self.dialect.quote_table(self.schema.as_deref(), &self.table)
    }

    fn run(&self, executor: &mut dyn SqlExecutor, sql: &str) -> Result<(), MaskError> {
        executor
            .execute_batch(sql)
            .map_err(|e| MaskError::SchemaMutation {
                table: self.table.clone(),
                message: e.to_string(),
            })
    }

    /// Ensure the identifier column and its index exist.
    pub fn prepare(&mut self, executor: &mut dyn SqlExecutor) -> Result<(), MaskError> {
        if self.builtin_row_id {
            return Ok(());
        }

        let table = self.qualified_table();
        let column = self.dialect.quote_ident(&self.column);

        if self.added_column {
            match self.dialect {
                SqlDialect::Mssql => {
                    self.run(
                        executor,
                        &format!("ALTER TABLE {} ADD {} INT IDENTITY(1,1) NOT NULL;", table, column),
                    )?;
                }
                SqlDialect::MySql => {
                    self.run(
                        executor,
                        &format!(
                            "ALTER TABLE {} ADD COLUMN {} BIGINT NOT NULL AUTO_INCREMENT UNIQUE;",
                            table, column
                        ),
                    )?;
                }
                SqlDialect::Postgres | SqlDialect::DuckDb => {
                    let seq = self.sequence.as_deref().unwrap_or_default();
                    self.run(executor, &format!("CREATE SEQUENCE IF NOT EXISTS {};", seq))?;
                    self.run(
                        executor,
                        &format!("ALTER TABLE {} ADD COLUMN {} BIGINT;", table, column),
                    )?;
                    self.run(
                        executor,
                        &format!("UPDATE {} SET {} = nextval('{}');", table, column, seq),
                    )?;
                }
                SqlDialect::Sqlite => unreachable!("sqlite uses the implicit rowid"),
            }
        }

        if !self.index_via_unique {
            let index = self.dialect.quote_ident(&self.index_name);
            let create_index = match self.dialect {
                SqlDialect::Mssql => {
                    format!("CREATE NONCLUSTERED INDEX {} ON {} ({});", index, table, column)
                }
                _ => format!("CREATE INDEX {} ON {} ({});", index, table, column),
            };
            self.run(executor, &create_index)?;
        }

        Ok(())
    }

    /// Remove whatever prepare() created. Never fails; problems are returned
    /// as warnings so cleanup can run on error paths too.
    pub fn cleanup(&mut self, executor: &mut dyn SqlExecutor) -> Vec<String> {
        if self.builtin_row_id {
            return Vec::new();
        }

        let mut warnings = Vec::new();
        let table = self.qualified_table();
        let column = self.dialect.quote_ident(&self.column);
        let index = self.dialect.quote_ident(&self.index_name);

        if !self.index_via_unique {
            let drop_index = match self.dialect {
                SqlDialect::Mssql => format!("DROP INDEX IF EXISTS {} ON {};", index, table),
                SqlDialect::MySql => format!("DROP INDEX {} ON {};", index, table),
                _ => format!("DROP INDEX IF EXISTS {};", index),
            };
            if let Err(e) = executor.execute_batch(&drop_index) {
                warnings.push(format!(
                    "Failed to drop index {} on {}: {}",
                    self.index_name, self.table, e
                ));
            }
        }

        if self.added_column {
            let drop_column = format!("ALTER TABLE {} DROP COLUMN {};", table, column);
            if let Err(e) = executor.execute_batch(&drop_column) {
                warnings.push(format!(
                    "Failed to drop column {} on {}: {}",
                    self.column, self.table, e
                ));
            }
            if let Some(ref seq) = self.sequence {
                if let Err(e) = executor.execute_batch(&format!("DROP SEQUENCE IF EXISTS {};", seq)) {
                    warnings.push(format!("Failed to drop sequence {}: {}", seq, e));
                }
            }
        }

        warnings
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnSpec, MaskingType};
    use crate::sql::SqlType;

    fn table(identity: bool) -> TableSpec {
        TableSpec {
            schema: Some("dbo".to_string()),
            table: "Customer".to_string(),
            columns: vec![ColumnSpec {
                name: "Id".to_string(),
                data_type: SqlType::Int,
                masking_type: MaskingType::Number,
                sub_type: None,
                min: None,
                max: None,
                character_string: None,
                format: None,
                nullable: false,
                keep_null: false,
                deterministic: false,
                identity,
                action: None,
                composite: None,
            }],
            unique_indexes: vec![],
        }
    }

    #[test]
    fn test_reuses_existing_identity() {
        let mgr = RowIdManager::new(SqlDialect::Mssql, &table(true));
        assert_eq!(mgr.column(), "Id");
        assert!(!mgr.added_column);
    }

    #[test]
    fn test_adds_column_when_no_identity() {
        let mgr = RowIdManager::new(SqlDialect::Mssql, &table(false));
        assert_eq!(mgr.column(), ROW_ID_COLUMN);
        assert!(mgr.added_column);
    }

    #[test]
    fn test_sqlite_uses_builtin_rowid() {
        let mgr = RowIdManager::new(SqlDialect::Sqlite, &table(false));
        assert_eq!(mgr.column(), "rowid");
        assert!(!mgr.added_column);
        assert!(mgr.builtin_row_id);
    }

    #[test]
    fn test_sequence_only_where_needed() {
        assert!(RowIdManager::new(SqlDialect::DuckDb, &table(false)).sequence.is_some());
        assert!(RowIdManager::new(SqlDialect::Mssql, &table(false)).sequence.is_none());
    }
}
