//! Configuration types for masking runs.
//!
//! The YAML document describes which tables and columns to mask and how; the
//! runtime `MaskConfig` combines a loaded document with command-line
//! overrides. Validation happens at load time so the engine can trust the
//! specification (table-level mode conflicts are the one exception, reported
//! per table at run time so one bad table does not abort the run).

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::sql::{SqlDialect, SqlType};

/// Runtime configuration for a masking run.
#[derive(Debug)]
pub struct MaskConfig {
    /// Target SQL dialect for emitted statements.
    pub dialect: SqlDialect,
    /// Tables to mask, in document order.
    pub tables: Vec<TableSpec>,
    /// Engine tuning knobs.
    pub settings: Settings,
    /// Random seed for reproducibility.
    pub seed: Option<u64>,
    /// Locale for generated fake data.
    pub locale: String,
    /// Dictionary seed/export files.
    pub dictionary: Option<DictionaryFiles>,
    /// Tables to include (None = all)
    pub tables_filter: Option<Vec<String>>,
    /// Tables to exclude.
    pub exclude: Vec<String>,
    /// Resolve and count without executing updates.
    pub dry_run: bool,
    /// Show progress.
    pub progress: bool,
}

impl MaskConfig {
    /// Create a new builder.
    pub fn builder() -> MaskConfigBuilder {
        MaskConfigBuilder::default()
    }

    /// Whether a configured table survives the include/exclude filters.
    pub fn is_table_selected(&self, table: &TableSpec) -> bool {
        if self
            .exclude
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&table.table))
        {
            return false;
        }
        if let Some(ref filter) = self.tables_filter {
            if !filter.iter().any(|t| t.eq_ignore_ascii_case(&table.table)) {
                return false;
            }
        }
        true
    }
}

/// Builder for `MaskConfig`.
#[derive(Default)]
pub struct MaskConfigBuilder {
    config_file: Option<PathBuf>,
    dialect: Option<SqlDialect>,
    seed: Option<u64>,
    locale: Option<String>,
    tables_filter: Option<Vec<String>>,
    exclude: Vec<String>,
    dry_run: bool,
    progress: bool,
}

impl MaskConfigBuilder {
    pub fn config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn dialect(mut self, dialect: Option<SqlDialect>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn tables_filter(mut self, tables: Option<Vec<String>>) -> Self {
        self.tables_filter = tables;
        self
    }

    pub fn exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Load the document, apply overrides, and validate.
    pub fn build(self) -> anyhow::Result<MaskConfig> {
        let path = self
            .config_file
            .ok_or_else(|| anyhow::anyhow!("Config file is required"))?;
        let document = MaskDocument::load(&path)?;
        document.validate()?;

        // CLI overrides win over the document
        let dialect = match self.dialect {
            Some(d) => d,
            None => match document.dialect.as_deref() {
                Some(name) => SqlDialect::from_name(name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown dialect in config: {}", name))?,
                None => SqlDialect::default(),
            },
        };
        let seed = self.seed.or(document.seed);
        let locale = self
            .locale
            .or(document.locale.clone())
            .unwrap_or_else(|| "en".to_string());

        Ok(MaskConfig {
            dialect,
            tables: document.tables,
            settings: document.settings,
            seed,
            locale,
            dictionary: document.dictionary,
            tables_filter: self.tables_filter,
            exclude: self.exclude,
            dry_run: self.dry_run,
            progress: self.progress,
        })
    }
}

/// YAML document structure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MaskDocument {
    /// Random seed for reproducibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Locale for fake data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Target SQL dialect (mysql, postgres, sqlite, mssql, duckdb)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,

    /// Engine tuning knobs
    #[serde(default)]
    pub settings: Settings,

    /// Dictionary seed/export files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<DictionaryFiles>,

    /// Tables to mask
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

impl MaskDocument {
    /// Load a document from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {:?}: {}", path, e))?;
        let document: Self = serde_yaml::from_str(&content)?;
        Ok(document)
    }

    /// Save a document to a YAML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the whole document. Table-level action/composite conflicts
    /// are deliberately left to the engine so one bad table only skips that
    /// table.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tables.is_empty() {
            anyhow::bail!("Config defines no tables");
        }
        self.settings.validate()?;
        for table in &self.tables {
            table.validate(self.settings.force_include_unsupported)?;
        }
        Ok(())
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    /// Rows per update batch
    pub batch_size: u64,
    /// Rows fetched per page while scanning a table
    pub fetch_page_size: u64,
    /// Every Nth row of a table gets NULL in nullable columns without
    /// keep_null; 0 disables null injection
    pub null_modulus: u64,
    /// Global ceiling applied to per-column max bounds
    pub max_value_override: Option<f64>,
    /// Fallback alphabet for generated strings
    pub default_character_string: Option<String>,
    /// Regeneration ceiling per row for unique-index tuples
    pub unique_retry_limit: u64,
    /// Let structured column types (xml, geography, ...) through validation;
    /// they will still fail per cell at format time
    pub force_include_unsupported: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            fetch_page_size: 10_000,
            null_modulus: 10,
            max_value_override: None,
            default_character_string: None,
            unique_retry_limit: 1000,
            force_include_unsupported: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than zero");
        }
        if self.fetch_page_size == 0 {
            anyhow::bail!("fetch_page_size must be greater than zero");
        }
        if self.unique_retry_limit == 0 {
            anyhow::bail!("unique_retry_limit must be greater than zero");
        }
        Ok(())
    }
}

/// Dictionary persistence files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DictionaryFiles {
    /// CSV of previously assigned values loaded before masking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
    /// CSV the final dictionary is written to, sorted by key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_file: Option<PathBuf>,
}

/// One table to mask.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSpec {
    /// Schema the table lives in (e.g. dbo)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table name
    pub table: String,
    /// Columns to mask
    pub columns: Vec<ColumnSpec>,
    /// Unique indexes whose columns need collision-free values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_indexes: Vec<UniqueIndexSpec>,
}

impl TableSpec {
    /// Display label, schema-qualified when a schema is set.
    pub fn label(&self) -> String {
        match &self.schema {
            Some(s) if !s.is_empty() => format!("{}.{}", s, self.table),
            _ => self.table.clone(),
        }
    }

    pub fn has_unique_index(&self) -> bool {
        !self.unique_indexes.is_empty()
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The pre-existing auto-increment column, if the table has one.
    pub fn identity_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.identity)
    }

    pub fn action_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.action.is_some())
    }

    pub fn composite_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.composite.is_some())
    }

    /// Columns masked through the per-row path: no action, no composite, not
    /// the identity column.
    pub fn per_row_columns(&self) -> Vec<&ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| c.action.is_none() && c.composite.is_none() && !c.identity)
            .collect()
    }

    /// Whether a column participates in any unique index.
    pub fn is_uniquely_indexed(&self, column: &str) -> bool {
        self.unique_indexes
            .iter()
            .any(|ix| ix.columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }

    fn validate(&self, force_include_unsupported: bool) -> anyhow::Result<()> {
        if self.columns.is_empty() {
            anyhow::bail!("Table '{}' defines no columns", self.label());
        }
        for column in &self.columns {
            column.validate(&self.label(), force_include_unsupported)?;
        }
        for index in &self.unique_indexes {
            if index.columns.is_empty() {
                anyhow::bail!("Table '{}' has a unique index with no columns", self.label());
            }
            for name in &index.columns {
                if self.find_column(name).is_none() {
                    anyhow::bail!(
                        "Unique index on '{}' references unknown column '{}'",
                        self.label(),
                        name
                    );
                }
            }
        }
        // Composite column references may point at any table column, masked
        // or not, so they are not checked against the configured list.
        Ok(())
    }
}

/// A unique index over one or more columns.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UniqueIndexSpec {
    /// Optional index name, used in messages only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indexed column names
    pub columns: Vec<String>,
}

/// One column to mask.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Declared SQL type (e.g. nvarchar(255), datetime2)
    pub data_type: SqlType,
    /// Semantic category of generated values
    pub masking_type: MaskingType,
    /// Refinement of the masking type (generator-specific)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Lower bound: numeric value, string length, or day offset for dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound, same interpretation as min
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Override alphabet for generated strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_string: Option<String>,
    /// Format hint handed through to the generator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Whether the column allows NULL
    #[serde(default)]
    pub nullable: bool,
    /// Preserve existing NULLs verbatim
    #[serde(default)]
    pub keep_null: bool,
    /// Reuse the dictionary so equal originals get equal masked values
    #[serde(default)]
    pub deterministic: bool,
    /// Marks a pre-existing auto-increment column usable as row identifier
    #[serde(default)]
    pub identity: bool,
    /// Table-wide arithmetic/date/set transform (excludes composite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionSpec>,
    /// Table-wide concatenation transform (excludes action)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeSpec>,
}

impl ColumnSpec {
    fn validate(&self, table: &str, force_include_unsupported: bool) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Table '{}' has a column with an empty name", table);
        }
        if self.action.is_some() && self.composite.is_some() {
            anyhow::bail!(
                "Column '{}.{}' declares both an action and a composite",
                table,
                self.name
            );
        }
        if self.data_type.is_unsupported() && !force_include_unsupported {
            anyhow::bail!(
                "Column '{}.{}' has unsupported type '{}' (set settings.force_include_unsupported to keep it)",
                table,
                self.name,
                self.data_type
            );
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                anyhow::bail!(
                    "Column '{}.{}' has min {} greater than max {}",
                    table,
                    self.name,
                    min,
                    max
                );
            }
        }
        if let Some(ref action) = self.action {
            action
                .validate()
                .map_err(|e| anyhow::anyhow!("Column '{}.{}': {}", table, self.name, e))?;
        }
        if let Some(ref composite) = self.composite {
            if composite.parts.is_empty() {
                anyhow::bail!("Column '{}.{}' has a composite with no parts", table, self.name);
            }
        }
        Ok(())
    }
}

/// Semantic category of generated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaskingType {
    Name,
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    State,
    Zip,
    Country,
    Company,
    JobTitle,
    Username,
    Url,
    Ip,
    Guid,
    CreditCard,
    Iban,
    Ssn,
    Lorem,
    Sentence,
    Word,
    /// Random string from an alphabet, length between min and max
    String,
    /// Random integer between min and max
    Number,
    /// Random decimal between min and max
    Decimal,
    Bool,
    Date,
    Time,
    DateTime,
    /// Rearrange the characters of the existing value
    Shuffle,
}

/// Table-wide column transform.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActionSpec {
    pub category: ActionCategory,
    pub kind: ActionKind,
    /// Date part for date_time actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_part: Option<DatePart>,
    /// Operand: amount for arithmetic, literal for set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ActionSpec {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.category {
            ActionCategory::DateTime => {
                if !matches!(self.kind, ActionKind::Add | ActionKind::Subtract) {
                    anyhow::bail!("date_time actions support add/subtract only");
                }
                if self.date_part.is_none() {
                    anyhow::bail!("date_time actions require a date_part");
                }
                if self.numeric_value().is_none() {
                    anyhow::bail!("date_time actions require a numeric value");
                }
            }
            ActionCategory::Number => {
                if !matches!(
                    self.kind,
                    ActionKind::Add | ActionKind::Subtract | ActionKind::Multiply | ActionKind::Divide
                ) {
                    anyhow::bail!("number actions support add/subtract/multiply/divide");
                }
                match self.numeric_value() {
                    None => anyhow::bail!("number actions require a numeric value"),
                    Some(v) if matches!(self.kind, ActionKind::Divide) && v == 0.0 => {
                        anyhow::bail!("number actions cannot divide by zero")
                    }
                    _ => {}
                }
            }
            ActionCategory::Column => match self.kind {
                ActionKind::Set => {
                    if self.value.is_none() {
                        anyhow::bail!("column set actions require a value");
                    }
                }
                ActionKind::Nullify => {}
                _ => anyhow::bail!("column actions support set/nullify only"),
            },
        }
        Ok(())
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(|v| v.as_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    DateTime,
    Number,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Set,
    Nullify,
}

/// Date part a date_time action operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    /// Keyword accepted by both DATEADD and INTERVAL syntax.
    pub fn keyword(&self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
        }
    }
}

/// Table-wide concatenation transform.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompositeSpec {
    pub parts: Vec<CompositePart>,
}

/// One fragment of a composite, concatenated left to right.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompositePart {
    /// Current value of another column
    Column(String),
    /// Literal text
    Static(String),
    /// Freshly generated fragment (drawn once per table)
    Generated(GeneratedPart),
}

/// Generator parameters for a composite fragment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedPart {
    pub masking_type: MaskingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
dialect: mssql
seed: 42
tables:
  - schema: dbo
    table: Customer
    unique_indexes:
      - columns: [Email]
    columns:
      - name: Email
        data_type: nvarchar(255)
        masking_type: email
        deterministic: true
      - name: Age
        data_type: int
        masking_type: number
        min: 18
        max: 90
        nullable: true
      - name: Notes
        data_type: nvarchar(max)
        masking_type: lorem
        nullable: true
        keep_null: true
"#
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc: MaskDocument = serde_yaml::from_str(minimal_yaml()).unwrap();
        doc.validate().unwrap();
        assert_eq!(doc.tables.len(), 1);
        let table = &doc.tables[0];
        assert_eq!(table.label(), "dbo.Customer");
        assert!(table.has_unique_index());
        assert!(table.is_uniquely_indexed("email"));
        assert_eq!(table.columns[0].data_type, SqlType::NVarChar);
        assert_eq!(table.columns[0].masking_type, MaskingType::Email);
        assert!(table.columns[2].keep_null);
    }

    #[test]
    fn test_settings_defaults() {
        let doc: MaskDocument = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(doc.settings.batch_size, 500);
        assert_eq!(doc.settings.null_modulus, 10);
        assert_eq!(doc.settings.unique_retry_limit, 1000);
    }

    #[test]
    fn test_action_and_composite_conflict() {
        let yaml = r#"
tables:
  - table: t
    columns:
      - name: c
        data_type: int
        masking_type: number
        action: { category: number, kind: add, value: 1 }
        composite: { parts: [ { static: "x" } ] }
"#;
        let doc: MaskDocument = serde_yaml::from_str(yaml).unwrap();
        let err = doc.validate().unwrap_err().to_string();
        assert!(err.contains("both an action and a composite"), "{err}");
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let yaml = r#"
tables:
  - table: t
    columns:
      - name: doc
        data_type: xml
        masking_type: lorem
"#;
        let doc: MaskDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_unsupported_type_force_included() {
        let yaml = r#"
settings:
  force_include_unsupported: true
tables:
  - table: t
    columns:
      - name: doc
        data_type: xml
        masking_type: lorem
"#;
        let doc: MaskDocument = serde_yaml::from_str(yaml).unwrap();
        doc.validate().unwrap();
    }

    #[test]
    fn test_action_validation() {
        let ok = ActionSpec {
            category: ActionCategory::DateTime,
            kind: ActionKind::Add,
            date_part: Some(DatePart::Day),
            value: Some(serde_json::json!(30)),
        };
        ok.validate().unwrap();

        let missing_part = ActionSpec {
            category: ActionCategory::DateTime,
            kind: ActionKind::Add,
            date_part: None,
            value: Some(serde_json::json!(30)),
        };
        assert!(missing_part.validate().is_err());

        let bad_kind = ActionSpec {
            category: ActionCategory::Column,
            kind: ActionKind::Multiply,
            date_part: None,
            value: Some(serde_json::json!(2)),
        };
        assert!(bad_kind.validate().is_err());

        let divide_by_zero = ActionSpec {
            category: ActionCategory::Number,
            kind: ActionKind::Divide,
            date_part: None,
            value: Some(serde_json::json!(0)),
        };
        assert!(divide_by_zero.validate().is_err());
    }

    #[test]
    fn test_composite_part_yaml_shapes() {
        let yaml = r#"
parts:
  - column: FirstName
  - static: " "
  - generated: { masking_type: number, min: 100, max: 999 }
"#;
        let composite: CompositeSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(composite.parts.len(), 3);
        assert!(matches!(composite.parts[0], CompositePart::Column(ref c) if c == "FirstName"));
        assert!(matches!(composite.parts[1], CompositePart::Static(ref s) if s == " "));
        assert!(matches!(composite.parts[2], CompositePart::Generated(_)));
    }

    #[test]
    fn test_unique_index_unknown_column() {
        let yaml = r#"
tables:
  - table: t
    unique_indexes:
      - columns: [missing]
    columns:
      - name: c
        data_type: int
        masking_type: number
"#;
        let doc: MaskDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_per_row_columns_skip_action_and_identity() {
        let yaml = r#"
tables:
  - table: t
    columns:
      - name: id
        data_type: int
        masking_type: number
        identity: true
      - name: bal
        data_type: money
        masking_type: decimal
        action: { category: number, kind: add, value: 100 }
      - name: email
        data_type: varchar(64)
        masking_type: email
"#;
        let doc: MaskDocument = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<&str> = doc.tables[0]
            .per_row_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["email"]);
    }
}
