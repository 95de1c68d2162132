//! Error taxonomy for the masking engine.
//!
//! Per-cell and per-batch errors are recoverable (logged, processing
//! continues); schema mutation, fetch, and table-level configuration errors
//! abort the affected table only. The run itself never aborts once the
//! configuration document has loaded.

use thiserror::Error;

/// Errors produced while masking a table.
#[derive(Debug, Error)]
pub enum MaskError {
    /// The masking specification is invalid for this table.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Adding or removing the row identifier column or its index failed.
    #[error("schema mutation failed on {table}: {message}")]
    SchemaMutation { table: String, message: String },

    /// Fetching rows from the table failed.
    #[error("row fetch failed on {table}: {message}")]
    DataFetch { table: String, message: String },

    /// The value generator could not produce a value for a cell.
    #[error("value generation failed for {table}.{column}: {message}")]
    Generation {
        table: String,
        column: String,
        message: String,
    },

    /// A batch of update statements failed on the server.
    #[error("batch {batch} failed on {table}: {message}")]
    Execution {
        table: String,
        batch: u64,
        message: String,
    },

    /// Unique tuple generation could not find a distinct tuple within the
    /// configured retry ceiling.
    #[error("unique value space exhausted for {table} after {attempts} attempts")]
    Exhaustion { table: String, attempts: u64 },

    /// A column declares a type the literal formatter cannot serialize.
    #[error("unsupported column type '{0}'")]
    UnsupportedType(String),
}

impl MaskError {
    /// Whether this error aborts the surrounding table instead of only the
    /// current cell or batch.
    pub fn aborts_table(&self) -> bool {
        matches!(
            self,
            MaskError::Configuration(_)
                | MaskError::SchemaMutation { .. }
                | MaskError::DataFetch { .. }
                | MaskError::Exhaustion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_scoped_errors() {
        assert!(MaskError::Configuration("both action and composite".into()).aborts_table());
        assert!(MaskError::Exhaustion {
            table: "users".into(),
            attempts: 1000
        }
        .aborts_table());
        assert!(!MaskError::Execution {
            table: "users".into(),
            batch: 3,
            message: "timeout".into()
        }
        .aborts_table());
        assert!(!MaskError::Generation {
            table: "users".into(),
            column: "email".into(),
            message: "bad subtype".into()
        }
        .aborts_table());
    }
}
