//! JSON Schema generation for the config document and CLI output types.
//!
//! Schemas are generated with the schemars crate and exported via the
//! `schema` subcommand so configs and --json output can be validated by
//! external tooling.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all exported schemas.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // The YAML masking specification document
    schemas.insert("config", schema_for!(crate::config::MaskDocument));

    // mask command --json output
    schemas.insert("mask", schema_for!(crate::engine::MaskStats));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names() {
        assert_eq!(schema_names(), vec!["config", "mask"]);
    }

    #[test]
    fn test_config_schema_serializes() {
        let schema = get_schema("config").unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.is_object());
    }
}
