//! CLI handler for the mask command.

use std::path::PathBuf;

use crate::config::MaskConfig;
use crate::engine::{Masker, MaskStats, MaskStatus};
use crate::progress::BatchProgressBar;
use crate::sql::{DuckDbExecutor, SqlDialect};

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: PathBuf,
    database: PathBuf,
    dialect: Option<String>,
    seed: Option<u64>,
    locale: Option<String>,
    tables: Option<Vec<String>>,
    exclude: Vec<String>,
    dry_run: bool,
    progress: bool,
    json: bool,
) -> anyhow::Result<()> {
    let dialect = match dialect {
        Some(name) => Some(
            SqlDialect::from_name(&name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown dialect: {}. Use: mysql, postgres, sqlite, mssql, duckdb",
                    name
                )
            })?,
        ),
        // The bundled executor is DuckDB, so emitted SQL defaults to match
        None => Some(SqlDialect::DuckDb),
    };

    let mask_config = MaskConfig::builder()
        .config_file(config)
        .dialect(dialect)
        .seed(seed)
        .locale(locale)
        .tables_filter(tables)
        .exclude(exclude)
        .dry_run(dry_run)
        .progress(progress)
        .build()?;

    let mut executor = DuckDbExecutor::open(&database)?;

    let bar = BatchProgressBar::new();
    let on_batch = |table: &str, completed: u64, total: u64| bar.update(table, completed, total);

    let mut masker = Masker::new(&mask_config, &mut executor);
    if progress {
        masker = masker.with_progress(&on_batch);
    }
    let stats = masker.run()?;
    bar.finish();

    output_stats(&stats, json);
    Ok(())
}

fn output_stats(stats: &MaskStats, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(stats).unwrap());
        return;
    }

    println!("\nMasking complete:");
    println!("  Tables masked: {}", stats.tables_masked);
    println!("  Tables failed: {}", stats.tables_failed);
    println!("  Rows masked: {}", stats.rows_masked);
    println!("  Dictionary entries: {}", stats.dictionary_entries);

    for result in &stats.table_results {
        let status = match result.status {
            MaskStatus::Masked => "masked",
            MaskStatus::DryRun => "dry-run",
            MaskStatus::Failed => "FAILED",
        };
        println!(
            "  {} [{}]: {} rows, {} columns, {} batches in {:.2}s",
            result.table, status, result.rows, result.columns_masked, result.batches,
            result.duration_secs
        );
    }

    let warnings: Vec<&String> = stats
        .warnings
        .iter()
        .chain(stats.table_results.iter().flat_map(|r| r.warnings.iter()))
        .collect();
    if !warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in warnings {
            eprintln!("  - {}", warning);
        }
    }
}
