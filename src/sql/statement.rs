//! Statement text builders.
//!
//! All statement assembly the engine performs funnels through here so that
//! identifier quoting stays in one place. Literal escaping lives in
//! `sql::literal` and `SqlDialect::string_literal`.

use crate::sql::SqlDialect;

/// A single-row UPDATE keyed on the row identifier.
#[derive(Debug)]
pub struct UpdateStatement {
    dialect: SqlDialect,
    table: String,
    assignments: Vec<(String, String)>,
    row_id_column: String,
    row_id: i64,
}

impl UpdateStatement {
    pub fn new(
        dialect: SqlDialect,
        schema: Option<&str>,
        table: &str,
        row_id_column: &str,
        row_id: i64,
    ) -> Self {
        Self {
            dialect,
            table: dialect.quote_table(schema, table),
            assignments: Vec::new(),
            row_id_column: row_id_column.to_string(),
            row_id,
        }
    }

    /// Add a `column = <literal>` assignment. The literal must already be
    /// formatted and escaped.
    pub fn set(&mut self, column: &str, literal: String) {
        self.assignments.push((column.to_string(), literal));
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn render(&self) -> String {
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(col, lit)| format!("{} = {}", self.dialect.quote_ident(col), lit))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = {};",
            self.table,
            sets.join(", "),
            self.dialect.quote_ident(&self.row_id_column),
            self.row_id
        )
    }
}

/// `SELECT COUNT(*)` over a table.
pub fn count_rows(dialect: SqlDialect, schema: Option<&str>, table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", dialect.quote_table(schema, table))
}

/// Keyset-paged fetch: row identifier first, then the requested columns, in
/// ascending identifier order starting after `cursor`.
pub fn fetch_page(
    dialect: SqlDialect,
    schema: Option<&str>,
    table: &str,
    row_id_column: &str,
    columns: &[String],
    cursor: i64,
    page_size: u64,
) -> String {
    let table = dialect.quote_table(schema, table);
    let rid = dialect.quote_ident(row_id_column);
    let mut select_list = vec![rid.clone()];
    select_list.extend(columns.iter().map(|c| dialect.quote_ident(c)));
    let select_list = select_list.join(", ");

    match dialect {
        SqlDialect::Mssql => format!(
            "SELECT TOP ({}) {} FROM {} WHERE {} > {} ORDER BY {}",
            page_size, select_list, table, rid, cursor, rid
        ),
        _ => format!(
            "SELECT {} FROM {} WHERE {} > {} ORDER BY {} LIMIT {}",
            select_list, table, rid, cursor, rid, page_size
        ),
    }
}

/// A table-wide `UPDATE ... SET column = <expression>` with no row filter.
pub fn table_wide_update(
    dialect: SqlDialect,
    schema: Option<&str>,
    table: &str,
    column: &str,
    expression: &str,
) -> String {
    format!(
        "UPDATE {} SET {} = {};",
        dialect.quote_table(schema, table),
        dialect.quote_ident(column),
        expression
    )
}
