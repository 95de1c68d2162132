//! Masking engine.
//!
//! Tables are processed one at a time: prepare the row identifier, run any
//! table-wide action/composite statements, then walk the rows in identifier
//! order resolving and batching per-row updates. Cleanup of the identifier
//! column and index runs on every exit path. Failures are scoped: a cell
//! failure skips that cell, a batch failure skips that batch, everything
//! bigger skips the table. The run itself always continues.

pub mod action;
pub mod batch;
pub mod composite;
pub mod resolver;
pub mod row_id;
pub mod unique;

use std::time::Instant;

use schemars::JsonSchema;
use serde::Serialize;

use crate::config::{MaskConfig, TableSpec};
use crate::dictionary::Dictionary;
use crate::engine::batch::UpdateBatcher;
use crate::engine::resolver::{TableContext, ValueResolver};
use crate::engine::row_id::RowIdManager;
use crate::engine::unique::UniqueTuples;
use crate::error::MaskError;
use crate::generator::{FakerGenerator, ValueGenerator};
use crate::sql::literal::format_literal;
use crate::sql::statement::{count_rows, fetch_page, UpdateStatement};
use crate::sql::{query_scalar_i64, SqlExecutor, SqlValue};

/// Progress callback: (table label, completed batches, total batches).
pub type MaskProgress<'a> = &'a dyn Fn(&str, u64, u64);

/// Outcome of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaskStatus {
    Masked,
    DryRun,
    Failed,
}

/// Result record for one table.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableMaskResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
    pub status: MaskStatus,
    /// Rows the per-row path processed (or counted, for dry runs)
    pub rows: u64,
    /// Columns rewritten by any path: per-row, action, or composite
    pub columns_masked: u64,
    /// Update batches executed
    pub batches: u64,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Run-level statistics.
#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct MaskStats {
    pub tables_masked: usize,
    pub tables_failed: usize,
    pub rows_masked: u64,
    pub dictionary_entries: usize,
    pub table_results: Vec<TableMaskResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Per-table counters produced by the row/action path.
#[derive(Debug, Default)]
struct RowOutcome {
    rows: u64,
    columns_masked: u64,
    batches: u64,
    warnings: Vec<String>,
}

/// The masking engine. Owns the dictionary for the whole run; the executor
/// and generator are pluggable.
pub struct Masker<'a> {
    config: &'a MaskConfig,
    executor: &'a mut dyn SqlExecutor,
    generator: Box<dyn ValueGenerator + 'a>,
    dictionary: Dictionary,
    progress: Option<MaskProgress<'a>>,
}

impl<'a> Masker<'a> {
    pub fn new(config: &'a MaskConfig, executor: &'a mut dyn SqlExecutor) -> Self {
        let generator = FakerGenerator::new(config.seed, config.locale.clone());
        Self {
            config,
            executor,
            generator: Box::new(generator),
            dictionary: Dictionary::new(),
            progress: None,
        }
    }

    /// Replace the bundled generator (tests, alternative backends).
    pub fn with_generator(mut self, generator: Box<dyn ValueGenerator + 'a>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_progress(mut self, progress: MaskProgress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Mask every selected table. Only dictionary seeding can fail here; any
    /// table-level problem is recorded in the stats instead.
    pub fn run(&mut self) -> anyhow::Result<MaskStats> {
        let mut stats = MaskStats::default();

        if let Some(files) = &self.config.dictionary {
            if let Some(seed_file) = &files.seed_file {
                self.dictionary.load_csv(seed_file)?;
            }
        }

        let config = self.config;
        for spec in config.tables.iter().filter(|t| config.is_table_selected(t)) {
            let result = self.mask_table(spec);
            match result.status {
                MaskStatus::Masked | MaskStatus::DryRun => stats.tables_masked += 1,
                MaskStatus::Failed => stats.tables_failed += 1,
            }
            stats.rows_masked += result.rows;
            stats.table_results.push(result);
        }

        stats.dictionary_entries = self.dictionary.len();

        if let Some(files) = &self.config.dictionary {
            if let Some(export_file) = &files.export_file {
                if let Err(e) = self.dictionary.save_csv(export_file) {
                    stats.warnings.push(format!("Dictionary export failed: {}", e));
                }
            }
        }

        Ok(stats)
    }

    fn mask_table(&mut self, spec: &TableSpec) -> TableMaskResult {
        let started = Instant::now();
        let mut result = TableMaskResult {
            schema: spec.schema.clone(),
            table: spec.table.clone(),
            status: MaskStatus::Failed,
            rows: 0,
            columns_masked: 0,
            batches: 0,
            duration_secs: 0.0,
            warnings: Vec::new(),
        };

        // Actions and composites are mutually exclusive per table: report and
        // perform neither.
        let has_actions = spec.action_columns().next().is_some();
        let has_composites = spec.composite_columns().next().is_some();
        if has_actions && has_composites {
            result.warnings.push(
                MaskError::Configuration(format!(
                    "table '{}' mixes action and composite columns",
                    spec.label()
                ))
                .to_string(),
            );
            result.duration_secs = started.elapsed().as_secs_f64();
            return result;
        }

        if self.config.dry_run {
            let outcome = self.dry_run_table(spec);
            result.duration_secs = started.elapsed().as_secs_f64();
            match outcome {
                Ok(outcome) => {
                    result.status = MaskStatus::DryRun;
                    result.rows = outcome.rows;
                    result.columns_masked = outcome.columns_masked;
                    result.batches = outcome.batches;
                    result.warnings.extend(outcome.warnings);
                }
                Err(e) => result.warnings.push(e.to_string()),
            }
            return result;
        }

        let mut row_id = RowIdManager::new(self.config.dialect, spec);
        if let Err(e) = row_id.prepare(&mut *self.executor) {
            result.warnings.push(e.to_string());
            result.warnings.extend(row_id.cleanup(&mut *self.executor));
            result.duration_secs = started.elapsed().as_secs_f64();
            return result;
        }

        let outcome = mask_prepared_table(
            self.config,
            spec,
            row_id.column(),
            &mut *self.executor,
            &mut *self.generator,
            &mut self.dictionary,
            self.progress,
        );

        // Cleanup runs whether the table masked or failed.
        result.warnings.extend(row_id.cleanup(&mut *self.executor));
        result.duration_secs = started.elapsed().as_secs_f64();

        match outcome {
            Ok(outcome) => {
                result.status = MaskStatus::Masked;
                result.rows = outcome.rows;
                result.columns_masked = outcome.columns_masked;
                result.batches = outcome.batches;
                result.warnings.extend(outcome.warnings);
            }
            Err(e) => result.warnings.push(e.to_string()),
        }
        result
    }

    /// Dry run: count rows and build (but never execute) the table-wide
    /// statements, so the report shows what a real run would do.
    fn dry_run_table(&mut self, spec: &TableSpec) -> Result<RowOutcome, MaskError> {
        let dialect = self.config.dialect;
        let count_sql = count_rows(dialect, spec.schema.as_deref(), &spec.table);
        let rows = query_scalar_i64(&mut *self.executor, &count_sql, &spec.table)?.max(0) as u64;

        let (action_stmts, mut warnings) = action::build_action_statements(spec, dialect);
        let (composite_stmts, composite_warnings) = composite::build_composite_statements(
            spec,
            dialect,
            &self.config.settings,
            &mut *self.generator,
        );
        warnings.extend(composite_warnings);

        let per_row = spec.per_row_columns();
        let batches = if per_row.is_empty() {
            0
        } else {
            rows.div_ceil(self.config.settings.batch_size)
        };

        Ok(RowOutcome {
            rows,
            columns_masked: (per_row.len() + action_stmts.len() + composite_stmts.len()) as u64,
            batches,
            warnings,
        })
    }
}

/// The masking work for one table with a prepared row identifier.
fn mask_prepared_table(
    config: &MaskConfig,
    spec: &TableSpec,
    row_id_column: &str,
    executor: &mut dyn SqlExecutor,
    generator: &mut dyn ValueGenerator,
    dictionary: &mut Dictionary,
    progress: Option<MaskProgress<'_>>,
) -> Result<RowOutcome, MaskError> {
    let dialect = config.dialect;
    let settings = &config.settings;
    let label = spec.label();
    let mut outcome = RowOutcome::default();

    // Table-wide transforms first: one multi-statement batch per mode.
    let (action_stmts, warnings) = action::build_action_statements(spec, dialect);
    outcome.warnings.extend(warnings);
    if !action_stmts.is_empty() {
        if let Err(e) = executor.execute_batch(&action_stmts.join("\n")) {
            outcome.warnings.push(
                MaskError::Execution {
                    table: label.clone(),
                    batch: 0,
                    message: e.to_string(),
                }
                .to_string(),
            );
        } else {
            outcome.columns_masked += action_stmts.len() as u64;
        }
    }

    let (composite_stmts, warnings) =
        composite::build_composite_statements(spec, dialect, settings, generator);
    outcome.warnings.extend(warnings);
    if !composite_stmts.is_empty() {
        if let Err(e) = executor.execute_batch(&composite_stmts.join("\n")) {
            outcome.warnings.push(
                MaskError::Execution {
                    table: label.clone(),
                    batch: 0,
                    message: e.to_string(),
                }
                .to_string(),
            );
        } else {
            outcome.columns_masked += composite_stmts.len() as u64;
        }
    }

    let count_sql = count_rows(dialect, spec.schema.as_deref(), &spec.table);
    let total_rows = query_scalar_i64(executor, &count_sql, &spec.table)?.max(0) as u64;

    let per_row = spec.per_row_columns();
    if per_row.is_empty() {
        outcome.rows = total_rows;
        return Ok(outcome);
    }
    outcome.columns_masked += per_row.len() as u64;

    // Collision-free tuples must exist before the row loop starts.
    let tuples = if spec.has_unique_index() {
        UniqueTuples::generate(spec, total_rows, generator, settings)?
    } else {
        UniqueTuples::default()
    };

    let per_table_progress = |done: u64, total: u64| {
        if let Some(p) = progress {
            p(&label, done, total);
        }
    };
    let mut batcher = UpdateBatcher::new(
        &label,
        settings.batch_size,
        total_rows,
        false,
        if progress.is_some() {
            Some(&per_table_progress)
        } else {
            None
        },
    );

    let column_names: Vec<String> = per_row.iter().map(|c| c.name.clone()).collect();
    let mut ctx = TableContext::new();
    let mut resolver = ValueResolver {
        table: &label,
        settings,
        dictionary,
        generator,
    };

    let mut cursor = i64::MIN;
    loop {
        let page_sql = fetch_page(
            dialect,
            spec.schema.as_deref(),
            &spec.table,
            row_id_column,
            &column_names,
            cursor,
            settings.fetch_page_size,
        );
        let rows = executor.query(&page_sql).map_err(|e| MaskError::DataFetch {
            table: spec.table.clone(),
            message: e.to_string(),
        })?;
        if rows.is_empty() {
            break;
        }
        let page_len = rows.len() as u64;

        for row in &rows {
            let row_id = match row.values.first() {
                Some(SqlValue::Int(id)) => *id,
                other => {
                    return Err(MaskError::DataFetch {
                        table: spec.table.clone(),
                        message: format!("non-integer row identifier: {:?}", other),
                    })
                }
            };
            cursor = cursor.max(row_id);
            ctx.next_row();
            let row_ordinal = (ctx.row_counter - 1) as usize;

            let mut statement = UpdateStatement::new(
                dialect,
                spec.schema.as_deref(),
                &spec.table,
                row_id_column,
                row_id,
            );

            for (i, column) in per_row.iter().enumerate() {
                let original = &row.values[i + 1];
                let unique_value = tuples.value_for(&column.name, row_ordinal);
                let resolved = match resolver.resolve(&ctx, column, original, unique_value) {
                    Ok(value) => value,
                    Err(e) => {
                        outcome.warnings.push(e.to_string());
                        continue;
                    }
                };
                match format_literal(&resolved, column.data_type, dialect) {
                    Ok(literal) => statement.set(&column.name, literal),
                    Err(e) => outcome.warnings.push(
                        MaskError::Generation {
                            table: label.clone(),
                            column: column.name.clone(),
                            message: e.to_string(),
                        }
                        .to_string(),
                    ),
                }
            }

            if !statement.is_empty() {
                batcher.push(statement.render(), executor);
            }
        }

        if page_len < settings.fetch_page_size {
            break;
        }
    }

    batcher.finish(executor);
    outcome.rows = ctx.row_counter;
    outcome.batches = batcher.batches_executed();
    for failure in batcher.take_failures() {
        outcome.warnings.push(failure.to_string());
    }

    Ok(outcome)
}
