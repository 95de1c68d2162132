mod mask;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-masker")]
#[command(version)]
#[command(about = "Mask sensitive column data in relational tables in place", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mask tables according to a YAML specification
    Mask {
        /// Masking specification (YAML)
        config: PathBuf,

        /// Database file to mask (embedded DuckDB)
        #[arg(short, long)]
        database: PathBuf,

        /// SQL dialect for emitted statements: mysql, postgres, sqlite, mssql, duckdb
        /// (defaults to duckdb when masking a database file)
        #[arg(long)]
        dialect: Option<String>,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Locale for generated fake data
        #[arg(long)]
        locale: Option<String>,

        /// Only mask specific tables (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tables: Option<Vec<String>>,

        /// Tables to exclude (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Resolve and count without executing updates
        #[arg(long)]
        dry_run: bool,

        /// Show progress during masking
        #[arg(short, long)]
        progress: bool,

        /// Output statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a masking specification without touching any database
    Validate {
        /// Masking specification (YAML)
        config: PathBuf,

        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print JSON schemas for the config document and --json outputs
    Schema {
        /// Schema name (omit to list available names)
        name: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Mask {
            config,
            database,
            dialect,
            seed,
            locale,
            tables,
            exclude,
            dry_run,
            progress,
            json,
        } => mask::run(
            config, database, dialect, seed, locale, tables, exclude, dry_run, progress, json,
        ),

        Commands::Validate { config, json } => validate::run(config, json),

        Commands::Schema { name } => {
            match name {
                Some(name) => match crate::json_schema::get_schema(&name) {
                    Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
                    None => anyhow::bail!(
                        "Unknown schema '{}'. Available: {}",
                        name,
                        crate::json_schema::schema_names().join(", ")
                    ),
                },
                None => {
                    for name in crate::json_schema::schema_names() {
                        println!("{name}");
                    }
                }
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
