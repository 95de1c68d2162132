//! CLI handler for the validate command.

use std::path::PathBuf;

use crate::config::MaskDocument;

pub fn run(config: PathBuf, json: bool) -> anyhow::Result<()> {
    let document = MaskDocument::load(&config)?;
    document.validate()?;

    if json {
        println!(r#"{{"valid": true}}"#);
    } else {
        eprintln!("Configuration is valid");
        let columns: usize = document.tables.iter().map(|t| t.columns.len()).sum();
        eprintln!("  {} tables, {} columns", document.tables.len(), columns);
    }
    Ok(())
}
