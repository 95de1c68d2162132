//! Table-wide composite transforms.
//!
//! A composite column is assigned one concatenation expression over the whole
//! table: column references pick up each row's current values, static parts
//! are literals, and generated parts are drawn once per column per table.
//! Every part is NULL-coalesced to an empty string before concatenation, so a
//! NULL column reference never nulls the whole result.

use crate::config::{CompositePart, Settings, TableSpec};
use crate::engine::resolver::generated_part_request;
use crate::generator::ValueGenerator;
use crate::sql::statement::table_wide_update;
use crate::sql::SqlDialect;

/// Build one statement per composite column. A generation failure skips that
/// column with a warning; the other composites still run.
pub fn build_composite_statements(
    table: &TableSpec,
    dialect: SqlDialect,
    settings: &Settings,
    generator: &mut dyn ValueGenerator,
) -> (Vec<String>, Vec<String>) {
    let mut statements = Vec::new();
    let mut warnings = Vec::new();

    'columns: for column in table.composite_columns() {
        let composite = column.composite.as_ref().expect("composite column");
        let mut fragments = Vec::with_capacity(composite.parts.len());

        for part in &composite.parts {
            match part {
                CompositePart::Column(name) => {
                    fragments.push(coalesced_column(dialect, name));
                }
                CompositePart::Static(text) => {
                    fragments.push(dialect.string_literal(text, false));
                }
                CompositePart::Generated(spec) => {
                    // One draw per column per table; the expression is a
                    // constant across rows.
                    let request = generated_part_request(spec, settings);
                    match generator.generate(&request) {
                        Ok(value) => fragments
                            .push(dialect.string_literal(&value.canonical_text(), false)),
                        Err(e) => {
                            warnings.push(format!(
                                "Skipping composite on '{}.{}': {}",
                                table.label(),
                                column.name,
                                e
                            ));
                            continue 'columns;
                        }
                    }
                }
            }
        }

        let expression = fragments.join(&format!(" {} ", dialect.concat_operator()));
        statements.push(table_wide_update(
            dialect,
            table.schema.as_deref(),
            &table.table,
            &column.name,
            &expression,
        ));
    }

    (statements, warnings)
}

/// A column reference cast to text and NULL-coalesced to ''.
fn coalesced_column(dialect: SqlDialect, name: &str) -> String {
    let quoted = dialect.quote_ident(name);
    match dialect {
        SqlDialect::Mssql => format!(
            "{}(CONVERT(nvarchar(max), {}), '')",
            dialect.coalesce_fn(),
            quoted
        ),
        _ => format!(
            "{}(CAST({} AS VARCHAR), '')",
            dialect.coalesce_fn(),
            quoted
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnSpec, CompositeSpec, GeneratedPart, MaskingType};
    use crate::generator::GenerateRequest;
    use crate::sql::{SqlType, SqlValue};

    struct FixedGenerator;

    impl ValueGenerator for FixedGenerator {
        fn generate(&mut self, _request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
            Ok(SqlValue::Int(123))
        }
    }

    struct FailingGenerator;

    impl ValueGenerator for FailingGenerator {
        fn generate(&mut self, _request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
            anyhow::bail!("no values today")
        }
    }

    fn composite_column(name: &str, parts: Vec<CompositePart>) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            data_type: SqlType::NVarChar,
            masking_type: MaskingType::String,
            sub_type: None,
            min: None,
            max: None,
            character_string: None,
            format: None,
            nullable: false,
            keep_null: false,
            deterministic: false,
            identity: false,
            action: None,
            composite: Some(CompositeSpec { parts }),
        }
    }

    fn plain_column(name: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            data_type: SqlType::NVarChar,
            masking_type: MaskingType::Name,
            sub_type: None,
            min: None,
            max: None,
            character_string: None,
            format: None,
            nullable: true,
            keep_null: false,
            deterministic: false,
            identity: false,
            action: None,
            composite: None,
        }
    }

    fn table_with(columns: Vec<ColumnSpec>) -> TableSpec {
        TableSpec {
            schema: Some("dbo".to_string()),
            table: "Customer".to_string(),
            columns,
            unique_indexes: vec![],
        }
    }

    #[test]
    fn test_parts_concatenate_left_to_right() {
        let table = table_with(vec![
            plain_column("FirstName"),
            plain_column("LastName"),
            composite_column(
                "DisplayName",
                vec![
                    CompositePart::Column("FirstName".to_string()),
                    CompositePart::Static(" ".to_string()),
                    CompositePart::Column("LastName".to_string()),
                ],
            ),
        ]);

        let mut generator = FixedGenerator;
        let (statements, warnings) = build_composite_statements(
            &table,
            SqlDialect::Mssql,
            &Settings::default(),
            &mut generator,
        );
        assert!(warnings.is_empty());
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            "UPDATE [dbo].[Customer] SET [DisplayName] = \
             ISNULL(CONVERT(nvarchar(max), [FirstName]), '') + ' ' + \
             ISNULL(CONVERT(nvarchar(max), [LastName]), '');"
        );
    }

    #[test]
    fn test_generated_part_is_table_wide_constant() {
        let table = table_with(vec![composite_column(
            "Code",
            vec![
                CompositePart::Static("ACC-".to_string()),
                CompositePart::Generated(GeneratedPart {
                    masking_type: MaskingType::Number,
                    sub_type: None,
                    min: Some(100.0),
                    max: Some(999.0),
                    character_string: None,
                    format: None,
                }),
            ],
        )]);

        let mut generator = FixedGenerator;
        let (statements, _) = build_composite_statements(
            &table,
            SqlDialect::DuckDb,
            &Settings::default(),
            &mut generator,
        );
        assert_eq!(
            statements[0],
            "UPDATE \"dbo\".\"Customer\" SET \"Code\" = 'ACC-' || '123';"
        );
    }

    #[test]
    fn test_generation_failure_skips_column_with_warning() {
        let table = table_with(vec![composite_column(
            "Code",
            vec![CompositePart::Generated(GeneratedPart {
                masking_type: MaskingType::Number,
                sub_type: None,
                min: None,
                max: None,
                character_string: None,
                format: None,
            })],
        )]);

        let mut generator = FailingGenerator;
        let (statements, warnings) = build_composite_statements(
            &table,
            SqlDialect::Mssql,
            &Settings::default(),
            &mut generator,
        );
        assert!(statements.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no values today"));
    }
}
