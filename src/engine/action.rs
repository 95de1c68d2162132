//! Table-wide action transforms.
//!
//! A column with an action is rewritten by one statement over the whole
//! table instead of the per-row path: date arithmetic for date_time,
//! arithmetic against the current value for number, and a direct literal or
//! NULL assignment for column. All valid action statements for a table are
//! concatenated and executed as a single batch.

use crate::config::{ActionCategory, ActionKind, ActionSpec, ColumnSpec, TableSpec};
use crate::sql::literal::format_literal;
use crate::sql::statement::table_wide_update;
use crate::sql::{SqlDialect, SqlValue};

/// Build one statement per valid action column. Invalid actions (nullify on a
/// NOT NULL column, unformattable set literals) are skipped with a warning.
pub fn build_action_statements(
    table: &TableSpec,
    dialect: SqlDialect,
) -> (Vec<String>, Vec<String>) {
    let mut statements = Vec::new();
    let mut warnings = Vec::new();

    for column in table.action_columns() {
        let action = column.action.as_ref().expect("action column");
        match build_expression(column, action, dialect) {
            Ok(Some(expression)) => statements.push(table_wide_update(
                dialect,
                table.schema.as_deref(),
                &table.table,
                &column.name,
                &expression,
            )),
            Ok(None) => warnings.push(format!(
                "Skipping nullify action on NOT NULL column '{}.{}'",
                table.label(),
                column.name
            )),
            Err(message) => warnings.push(format!(
                "Skipping action on '{}.{}': {}",
                table.label(),
                column.name,
                message
            )),
        }
    }

    (statements, warnings)
}

fn build_expression(
    column: &ColumnSpec,
    action: &ActionSpec,
    dialect: SqlDialect,
) -> Result<Option<String>, String> {
    let quoted = dialect.quote_ident(&column.name);

    match action.category {
        ActionCategory::DateTime => {
            let amount = action
                .numeric_value()
                .ok_or_else(|| "date_time action without a numeric value".to_string())?
                as i64;
            let amount = match action.kind {
                ActionKind::Subtract => -amount,
                _ => amount,
            };
            let part = action
                .date_part
                .ok_or_else(|| "date_time action without a date_part".to_string())?;
            let expression = match dialect {
                SqlDialect::Mssql => {
                    format!("DATEADD({}, {}, {})", part.keyword(), amount, quoted)
                }
                SqlDialect::MySql => format!(
                    "{} + INTERVAL {} {}",
                    quoted,
                    amount,
                    part.keyword().to_uppercase()
                ),
                SqlDialect::Postgres | SqlDialect::DuckDb => {
                    format!("{} + INTERVAL '{} {}'", quoted, amount, part.keyword())
                }
                SqlDialect::Sqlite => format!(
                    "datetime({}, '{}{} {}s')",
                    quoted,
                    if amount >= 0 { "+" } else { "" },
                    amount,
                    part.keyword()
                ),
            };
            Ok(Some(expression))
        }

        ActionCategory::Number => {
            let amount = action
                .numeric_value()
                .ok_or_else(|| "number action without a numeric value".to_string())?;
            let operator = match action.kind {
                ActionKind::Add => "+",
                ActionKind::Subtract => "-",
                ActionKind::Multiply => "*",
                ActionKind::Divide => "/",
                other => return Err(format!("number action cannot use kind {:?}", other)),
            };
            Ok(Some(format!(
                "{} {} {}",
                quoted,
                operator,
                format_number(amount)
            )))
        }

        ActionCategory::Column => match action.kind {
            ActionKind::Set => {
                let value = action
                    .value
                    .as_ref()
                    .ok_or_else(|| "set action without a value".to_string())?;
                let value = config_value_to_sql(value);
                let literal = format_literal(&value, column.data_type, dialect)
                    .map_err(|e| e.to_string())?;
                Ok(Some(literal))
            }
            ActionKind::Nullify => {
                if column.nullable {
                    Ok(Some("NULL".to_string()))
                } else {
                    Ok(None)
                }
            }
            other => Err(format!("column action cannot use kind {:?}", other)),
        },
    }
}

/// Map a config literal (JSON-shaped) into a runtime value.
pub fn config_value_to_sql(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => SqlValue::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => SqlValue::Str(s.clone()),
        other => SqlValue::Str(other.to_string()),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
