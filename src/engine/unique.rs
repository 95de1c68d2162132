//! Collision-free tuples for uniquely indexed columns.
//!
//! Generated up front, before the row loop, so per-row resolution can hand
//! out tuple *i* to row *i* without ever re-checking the index. Candidate
//! tuples are keyed by their combined values and checked against a set; on a
//! collision the whole tuple is regenerated, not just the colliding column.
//! A finite value domain smaller than the row count would loop forever, so a
//! retry ceiling turns exhaustion into a loud error instead.

use ahash::AHashSet;

use crate::config::{ColumnSpec, Settings, TableSpec};
use crate::engine::resolver::column_request;
use crate::error::MaskError;
use crate::generator::ValueGenerator;
use crate::sql::SqlValue;

/// Separator for composite collision keys; never appears in canonical text.
const KEY_SEPARATOR: char = '\x1f';

/// Tuples for one unique index, aligned with `columns`.
#[derive(Debug)]
struct IndexTuples {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

/// All pre-generated tuples for a table.
#[derive(Debug, Default)]
pub struct UniqueTuples {
    per_index: Vec<IndexTuples>,
}

impl UniqueTuples {
    /// Generate one tuple per row for every unique index of the table.
    pub fn generate(
        table: &TableSpec,
        row_count: u64,
        generator: &mut dyn ValueGenerator,
        settings: &Settings,
    ) -> Result<Self, MaskError> {
        let mut per_index = Vec::new();

        for index in &table.unique_indexes {
            // Identifier columns keep their values; they never need tuples.
            let columns: Vec<&ColumnSpec> = index
                .columns
                .iter()
                .filter_map(|name| table.find_column(name))
                .filter(|col| !col.identity)
                .collect();
            if columns.is_empty() {
                continue;
            }

            let mut seen: AHashSet<String> = AHashSet::with_capacity(row_count as usize);
            let mut rows: Vec<Vec<SqlValue>> = Vec::with_capacity(row_count as usize);

            for _ in 0..row_count {
                let mut accepted = None;
                for _ in 0..settings.unique_retry_limit {
                    let mut tuple = Vec::with_capacity(columns.len());
                    for col in &columns {
                        let request = column_request(col, settings, None);
                        let value =
                            generator
                                .generate(&request)
                                .map_err(|e| MaskError::Generation {
                                    table: table.label(),
                                    column: col.name.clone(),
                                    message: e.to_string(),
                                })?;
                        tuple.push(value);
                    }
                    let key = tuple
                        .iter()
                        .map(|v| v.canonical_text())
                        .collect::<Vec<_>>()
                        .join(&KEY_SEPARATOR.to_string());
                    if seen.insert(key) {
                        accepted = Some(tuple);
                        break;
                    }
                }
                match accepted {
                    Some(tuple) => rows.push(tuple),
                    None => {
                        return Err(MaskError::Exhaustion {
                            table: table.label(),
                            attempts: settings.unique_retry_limit,
                        })
                    }
                }
            }

            per_index.push(IndexTuples {
                columns: columns.iter().map(|c| c.name.clone()).collect(),
                rows,
            });
        }

        Ok(Self { per_index })
    }

    /// The tuple value for a column at a given row ordinal, if the column is
    /// uniquely indexed.
    pub fn value_for(&self, column: &str, row: usize) -> Option<&SqlValue> {
        for index in &self.per_index {
            if let Some(pos) = index
                .columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(column))
            {
                return index.rows.get(row).map(|tuple| &tuple[pos]);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.per_index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaskingType, UniqueIndexSpec};
    use crate::generator::GenerateRequest;
    use crate::sql::SqlType;

    /// Generator cycling through a bounded integer domain in order.
    struct SmallDomain {
        state: i64,
        size: i64,
    }

    impl ValueGenerator for SmallDomain {
        fn generate(&mut self, _request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
            self.state = (self.state + 1) % self.size;
            Ok(SqlValue::Int(self.state))
        }
    }

    /// Generator replaying a fixed script of values.
    struct Scripted {
        values: Vec<i64>,
        pos: usize,
    }

    impl ValueGenerator for Scripted {
        fn generate(&mut self, _request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
            let value = self.values[self.pos % self.values.len()];
            self.pos += 1;
            Ok(SqlValue::Int(value))
        }
    }

    fn column(name: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
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
            identity: false,
            action: None,
            composite: None,
        }
    }

    fn table(index_columns: &[&str], columns: Vec<ColumnSpec>) -> TableSpec {
        TableSpec {
            schema: None,
            table: "t".to_string(),
            columns,
            unique_indexes: vec![UniqueIndexSpec {
                name: None,
                columns: index_columns.iter().map(|s| s.to_string()).collect(),
            }],
        }
    }

    #[test]
    fn test_tuples_pairwise_distinct() {
        let table = table(&["a", "b"], vec![column("a"), column("b")]);
        let mut generator = SmallDomain { state: 0, size: 50 };
        let settings = Settings::default();

        let tuples = UniqueTuples::generate(&table, 20, &mut generator, &settings).unwrap();

        let mut seen = std::collections::HashSet::new();
        for row in 0..20 {
            let a = tuples.value_for("a", row).unwrap().canonical_text();
            let b = tuples.value_for("b", row).unwrap().canonical_text();
            assert!(seen.insert((a, b)), "duplicate tuple at row {row}");
        }
    }

    #[test]
    fn test_collisions_regenerate_whole_tuple() {
        // Each value appears twice in a row, so every other candidate
        // collides and forces a retry before the next distinct value lands.
        let table = table(&["a"], vec![column("a")]);
        let mut generator = Scripted {
            values: vec![1, 1, 2, 2, 3, 3, 4, 4],
            pos: 0,
        };
        let settings = Settings::default();

        let tuples = UniqueTuples::generate(&table, 4, &mut generator, &settings).unwrap();
        let got: Vec<String> = (0..4)
            .map(|row| tuples.value_for("a", row).unwrap().canonical_text())
            .collect();
        assert_eq!(got, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_exhaustion_is_loud() {
        // Domain of 4 combined values cannot cover 40 rows
        let table = table(&["a"], vec![column("a")]);
        let mut generator = SmallDomain { state: 0, size: 4 };
        let mut settings = Settings::default();
        settings.unique_retry_limit = 25;

        let err = UniqueTuples::generate(&table, 40, &mut generator, &settings).unwrap_err();
        assert!(matches!(err, MaskError::Exhaustion { attempts: 25, .. }));
    }

    #[test]
    fn test_identity_columns_excluded() {
        let mut id = column("id");
        id.identity = true;
        let table = table(&["id"], vec![id]);
        let mut generator = SmallDomain { state: 0, size: 50 };
        let settings = Settings::default();

        let tuples = UniqueTuples::generate(&table, 5, &mut generator, &settings).unwrap();
        assert!(tuples.is_empty());
        assert!(tuples.value_for("id", 0).is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = table(&["Email"], vec![column("Email")]);
        let mut generator = SmallDomain { state: 0, size: 50 };
        let settings = Settings::default();

        let tuples = UniqueTuples::generate(&table, 3, &mut generator, &settings).unwrap();
        assert!(tuples.value_for("email", 0).is_some());
        assert!(tuples.value_for("EMAIL", 2).is_some());
        assert!(tuples.value_for("email", 3).is_none());
    }
}
