//! Per-(row, column) value resolution.
//!
//! Policies are evaluated in a fixed priority order, first match wins:
//! 1. keep_null and the original is NULL
//! 2. null injection for nullable columns at the configured row cadence
//! 3. pre-generated unique-index tuple value
//! 4. dictionary hit for deterministic columns
//! 5. fresh generation (including the shuffle type)
//!
//! After resolution, deterministic columns record the original -> resolved
//! pair so later rows with the same original resolve identically.

use crate::config::{ColumnSpec, GeneratedPart, MaskingType, Settings};
use crate::dictionary::Dictionary;
use crate::error::MaskError;
use crate::generator::{GenerateRequest, ValueGenerator};
use crate::sql::{SqlType, SqlValue};

/// Mutable per-table state threaded through the row loop.
#[derive(Debug, Default)]
pub struct TableContext {
    /// Increments once per row; drives null injection for every nullable
    /// column of the row.
    pub row_counter: u64,
}

impl TableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_row(&mut self) {
        self.row_counter += 1;
    }
}

/// Lower/upper generation bounds for a column, after defaulting and clipping.
fn resolve_bounds(
    masking_type: MaskingType,
    data_type: SqlType,
    min: Option<f64>,
    max: Option<f64>,
    settings: &Settings,
) -> (f64, f64) {
    let date_like = data_type.is_date_like()
        || matches!(masking_type, MaskingType::Date | MaskingType::DateTime);

    let lower = match min {
        Some(m) => m,
        None if date_like => -365.0,
        None if data_type.is_string_like() || masking_type == MaskingType::String => 1.0,
        None => 0.0,
    };

    let upper = match (max, settings.max_value_override) {
        (Some(m), Some(o)) => m.min(o),
        (Some(m), None) => m,
        (None, Some(o)) => o,
        (None, None) if date_like => 365.0,
        (None, None) => 10.0,
    };

    (lower, upper.max(lower))
}

/// Build a generation request from a column specification.
pub fn column_request<'a>(
    column: &'a ColumnSpec,
    settings: &'a Settings,
    original: Option<&'a SqlValue>,
) -> GenerateRequest<'a> {
    let (min, max) = resolve_bounds(
        column.masking_type,
        column.data_type,
        column.min,
        column.max,
        settings,
    );
    GenerateRequest {
        masking_type: column.masking_type,
        sub_type: column.sub_type.as_deref(),
        data_type: column.data_type,
        min,
        max,
        character_string: column
            .character_string
            .as_deref()
            .or(settings.default_character_string.as_deref()),
        format: column.format.as_deref(),
        original,
    }
}

/// Build a generation request from a composite's generated part.
pub fn generated_part_request<'a>(
    part: &'a GeneratedPart,
    settings: &'a Settings,
) -> GenerateRequest<'a> {
    let (min, max) = resolve_bounds(
        part.masking_type,
        SqlType::NVarChar,
        part.min,
        part.max,
        settings,
    );
    GenerateRequest {
        masking_type: part.masking_type,
        sub_type: part.sub_type.as_deref(),
        data_type: SqlType::NVarChar,
        min,
        max,
        character_string: part
            .character_string
            .as_deref()
            .or(settings.default_character_string.as_deref()),
        format: part.format.as_deref(),
        original: None,
    }
}

/// Selects the replacement value for one cell.
pub struct ValueResolver<'a> {
    pub table: &'a str,
    pub settings: &'a Settings,
    pub dictionary: &'a mut Dictionary,
    pub generator: &'a mut dyn ValueGenerator,
}

impl<'a> ValueResolver<'a> {
    pub fn resolve(
        &mut self,
        ctx: &TableContext,
        column: &ColumnSpec,
        original: &SqlValue,
        unique_value: Option<&SqlValue>,
    ) -> Result<SqlValue, MaskError> {
        if column.keep_null && original.is_null() {
            return Ok(SqlValue::Null);
        }

        if !column.keep_null
            && column.nullable
            && self.settings.null_modulus > 0
            && ctx.row_counter % self.settings.null_modulus == 0
        {
            return Ok(SqlValue::Null);
        }

        let resolved = match unique_value {
            Some(value) => value.clone(),
            None => {
                if column.deterministic {
                    if let Some(hit) = self.dictionary.get(original) {
                        return Ok(hit.clone());
                    }
                }
                let request = column_request(column, self.settings, Some(original));
                self.generator
                    .generate(&request)
                    .map_err(|e| MaskError::Generation {
                        table: self.table.to_string(),
                        column: column.name.clone(),
                        message: e.to_string(),
                    })?
            }
        };

        if column.deterministic {
            self.dictionary.record(original, resolved.clone());
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic stand-in generator: returns consecutive integers.
    struct SeqGenerator {
        next: i64,
    }

    impl ValueGenerator for SeqGenerator {
        fn generate(&mut self, _request: &GenerateRequest<'_>) -> anyhow::Result<SqlValue> {
            self.next += 1;
            Ok(SqlValue::Int(self.next))
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

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_keep_null_preserves_null() {
        let settings = settings();
        let mut dict = Dictionary::new();
        let mut generator = SeqGenerator { next: 0 };
        let mut resolver = ValueResolver {
            table: "t",
            settings: &settings,
            dictionary: &mut dict,
            generator: &mut generator,
        };
        let mut col = column("c");
        col.keep_null = true;
        col.nullable = true;

        let mut ctx = TableContext::new();
        ctx.next_row();
        let out = resolver.resolve(&ctx, &col, &SqlValue::Null, None).unwrap();
        assert_eq!(out, SqlValue::Null);

        // Non-null originals still get fresh values
        let out = resolver.resolve(&ctx, &col, &SqlValue::Int(5), None).unwrap();
        assert_eq!(out, SqlValue::Int(1));
    }

    #[test]
    fn test_null_injection_cadence() {
        let mut s = settings();
        s.null_modulus = 3;
        let mut dict = Dictionary::new();
        let mut generator = SeqGenerator { next: 0 };
        let mut resolver = ValueResolver {
            table: "t",
            settings: &s,
            dictionary: &mut dict,
            generator: &mut generator,
        };
        let mut col = column("c");
        col.nullable = true;

        let mut ctx = TableContext::new();
        let mut nulls = 0;
        for _ in 0..9 {
            ctx.next_row();
            let out = resolver.resolve(&ctx, &col, &SqlValue::Int(1), None).unwrap();
            if out.is_null() {
                nulls += 1;
            }
        }
        // Rows 3, 6, 9
        assert_eq!(nulls, 3);
    }

    #[test]
    fn test_null_injection_disabled_by_zero_modulus() {
        let mut s = settings();
        s.null_modulus = 0;
        let mut dict = Dictionary::new();
        let mut generator = SeqGenerator { next: 0 };
        let mut resolver = ValueResolver {
            table: "t",
            settings: &s,
            dictionary: &mut dict,
            generator: &mut generator,
        };
        let mut col = column("c");
        col.nullable = true;

        let mut ctx = TableContext::new();
        for _ in 0..10 {
            ctx.next_row();
            let out = resolver.resolve(&ctx, &col, &SqlValue::Int(1), None).unwrap();
            assert!(!out.is_null());
        }
    }

    #[test]
    fn test_unique_tuple_wins_over_dictionary() {
        let settings = settings();
        let mut dict = Dictionary::new();
        dict.record(&SqlValue::Int(5), SqlValue::Int(99));
        let mut generator = SeqGenerator { next: 0 };
        let mut resolver = ValueResolver {
            table: "t",
            settings: &settings,
            dictionary: &mut dict,
            generator: &mut generator,
        };
        let mut col = column("c");
        col.deterministic = true;

        let mut ctx = TableContext::new();
        ctx.next_row();
        let unique = SqlValue::Int(42);
        let out = resolver
            .resolve(&ctx, &col, &SqlValue::Int(5), Some(&unique))
            .unwrap();
        assert_eq!(out, SqlValue::Int(42));
    }

    #[test]
    fn test_deterministic_reuses_dictionary() {
        let settings = settings();
        let mut dict = Dictionary::new();
        let mut generator = SeqGenerator { next: 0 };
        let mut resolver = ValueResolver {
            table: "t",
            settings: &settings,
            dictionary: &mut dict,
            generator: &mut generator,
        };
        let mut col = column("c");
        col.deterministic = true;

        let mut ctx = TableContext::new();
        ctx.next_row();
        let first = resolver.resolve(&ctx, &col, &SqlValue::Int(5), None).unwrap();
        ctx.next_row();
        let second = resolver.resolve(&ctx, &col, &SqlValue::Int(5), None).unwrap();
        assert_eq!(first, second);

        ctx.next_row();
        let other = resolver.resolve(&ctx, &col, &SqlValue::Int(6), None).unwrap();
        assert_ne!(other, first);
    }

    #[test]
    fn test_bounds_defaults() {
        let s = settings();
        let (lo, hi) = resolve_bounds(MaskingType::Number, SqlType::Int, None, None, &s);
        assert_eq!((lo, hi), (0.0, 10.0));

        let (lo, hi) = resolve_bounds(MaskingType::String, SqlType::VarChar, None, None, &s);
        assert_eq!((lo, hi), (1.0, 10.0));

        let (lo, hi) = resolve_bounds(MaskingType::Date, SqlType::Date, None, None, &s);
        assert_eq!((lo, hi), (-365.0, 365.0));
    }

    #[test]
    fn test_bounds_global_override_clips() {
        let mut s = settings();
        s.max_value_override = Some(50.0);
        let (_, hi) = resolve_bounds(MaskingType::Number, SqlType::Int, None, Some(200.0), &s);
        assert_eq!(hi, 50.0);
        let (_, hi) = resolve_bounds(MaskingType::Number, SqlType::Int, None, Some(20.0), &s);
        assert_eq!(hi, 20.0);
    }
}
