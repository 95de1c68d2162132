//! Column types, runtime values, and literal formatting.
//!
//! `SqlType` is a closed enumeration of the column types the engine supports,
//! so the formatter and resolver dispatch with exhaustive matches instead of
//! string comparisons. Structured types (hierarchyid, geography, geometry,
//! xml) are representable but always fail literal formatting; the
//! configuration layer rejects them up front unless force-included.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MaskError;
use crate::sql::SqlDialect;

/// Supported declared column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Numeric,
    Float,
    Real,
    Money,
    SmallMoney,
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    Date,
    Time,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    UniqueIdentifier,
    // Structured types: parsed so config validation can name them, never
    // formatted.
    HierarchyId,
    Geography,
    Geometry,
    Xml,
}

impl SqlType {
    /// Parse a declared SQL type, ignoring any length/precision suffix
    /// (`varchar(255)`, `decimal(10,2)`).
    pub fn from_sql_type(type_str: &str) -> Option<Self> {
        let lower = type_str.to_lowercase();
        let base = lower.split('(').next().unwrap_or(&lower).trim();

        match base {
            "bit" | "bool" | "boolean" => Some(SqlType::Bit),
            "tinyint" => Some(SqlType::TinyInt),
            "smallint" | "int2" => Some(SqlType::SmallInt),
            "int" | "integer" | "int4" | "mediumint" => Some(SqlType::Int),
            "bigint" | "int8" => Some(SqlType::BigInt),
            "decimal" | "dec" => Some(SqlType::Decimal),
            "numeric" => Some(SqlType::Numeric),
            "float" | "double" | "float8" => Some(SqlType::Float),
            "real" | "float4" => Some(SqlType::Real),
            "money" => Some(SqlType::Money),
            "smallmoney" => Some(SqlType::SmallMoney),
            "char" | "character" => Some(SqlType::Char),
            "varchar" | "character varying" => Some(SqlType::VarChar),
            "nchar" => Some(SqlType::NChar),
            "nvarchar" => Some(SqlType::NVarChar),
            "text" | "tinytext" | "mediumtext" | "longtext" => Some(SqlType::Text),
            "ntext" => Some(SqlType::NText),
            "date" => Some(SqlType::Date),
            "time" => Some(SqlType::Time),
            "datetime" | "timestamp" => Some(SqlType::DateTime),
            "datetime2" => Some(SqlType::DateTime2),
            "smalldatetime" => Some(SqlType::SmallDateTime),
            "datetimeoffset" | "timestamptz" => Some(SqlType::DateTimeOffset),
            "uniqueidentifier" | "uuid" => Some(SqlType::UniqueIdentifier),
            "hierarchyid" => Some(SqlType::HierarchyId),
            "geography" => Some(SqlType::Geography),
            "geometry" => Some(SqlType::Geometry),
            "xml" => Some(SqlType::Xml),
            _ => None,
        }
    }

    /// Canonical lowercase name, as written back in configs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Bit => "bit",
            SqlType::TinyInt => "tinyint",
            SqlType::SmallInt => "smallint",
            SqlType::Int => "int",
            SqlType::BigInt => "bigint",
            SqlType::Decimal => "decimal",
            SqlType::Numeric => "numeric",
            SqlType::Float => "float",
            SqlType::Real => "real",
            SqlType::Money => "money",
            SqlType::SmallMoney => "smallmoney",
            SqlType::Char => "char",
            SqlType::VarChar => "varchar",
            SqlType::NChar => "nchar",
            SqlType::NVarChar => "nvarchar",
            SqlType::Text => "text",
            SqlType::NText => "ntext",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::DateTime => "datetime",
            SqlType::DateTime2 => "datetime2",
            SqlType::SmallDateTime => "smalldatetime",
            SqlType::DateTimeOffset => "datetimeoffset",
            SqlType::UniqueIdentifier => "uniqueidentifier",
            SqlType::HierarchyId => "hierarchyid",
            SqlType::Geography => "geography",
            SqlType::Geometry => "geometry",
            SqlType::Xml => "xml",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                SqlType::Decimal
                    | SqlType::Numeric
                    | SqlType::Float
                    | SqlType::Real
                    | SqlType::Money
                    | SqlType::SmallMoney
            )
    }

    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            SqlType::Char
                | SqlType::VarChar
                | SqlType::NChar
                | SqlType::NVarChar
                | SqlType::Text
                | SqlType::NText
        )
    }

    /// National-character types get `N'...'` literals on SQL Server.
    pub fn is_unicode_string(&self) -> bool {
        matches!(self, SqlType::NChar | SqlType::NVarChar | SqlType::NText)
    }

    pub fn is_date_like(&self) -> bool {
        matches!(
            self,
            SqlType::Date
                | SqlType::Time
                | SqlType::DateTime
                | SqlType::DateTime2
                | SqlType::SmallDateTime
                | SqlType::DateTimeOffset
        )
    }

    /// Structured types the literal formatter refuses to serialize.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            SqlType::HierarchyId | SqlType::Geography | SqlType::Geometry | SqlType::Xml
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlType {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SqlType::from_sql_type(s).ok_or_else(|| MaskError::UnsupportedType(s.to_string()))
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SqlType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SqlType::from_sql_type(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown SQL type '{}'", s)))
    }
}

impl schemars::JsonSchema for SqlType {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "SqlType".into()
    }

    fn json_schema(_gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "description": "Declared SQL column type, optionally with a length suffix (e.g. varchar(255))"
        })
    }
}

/// A runtime cell value, either fetched from the database or produced by the
/// generator.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Short tag naming the value's kind, used as the dictionary key
    /// discriminator and in the dictionary CSV.
    pub fn type_tag(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Str(_) => "text",
            SqlValue::Date(_) => "date",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::Time(_) => "time",
        }
    }

    /// Plain text form without any SQL quoting, stable per kind.
    pub fn canonical_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Str(s) => s.clone(),
            SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SqlValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            SqlValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        }
    }

    /// Rebuild a value from a `type_tag` + canonical text pair, as stored in
    /// the dictionary CSV.
    pub fn parse_tagged(tag: &str, text: &str) -> Option<SqlValue> {
        match tag {
            "null" => Some(SqlValue::Null),
            "bool" => Some(SqlValue::Bool(text == "1" || text.eq_ignore_ascii_case("true"))),
            "int" => text.parse().ok().map(SqlValue::Int),
            "float" => text.parse().ok().map(SqlValue::Float),
            "text" => Some(SqlValue::Str(text.to_string())),
            "date" => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(SqlValue::Date),
            "datetime" => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(SqlValue::DateTime),
            "time" => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Time),
            _ => None,
        }
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::DateTime(dt) => Some(*dt),
            SqlValue::Date(d) => d.and_hms_opt(0, 0, 0),
            SqlValue::Str(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                }),
            _ => None,
        }
    }

    fn as_time(&self) -> Option<NaiveTime> {
        match self {
            SqlValue::Time(t) => Some(*t),
            SqlValue::DateTime(dt) => Some(dt.time()),
            SqlValue::Str(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            SqlValue::Bool(b) => *b,
            SqlValue::Int(n) => *n != 0,
            SqlValue::Float(f) => *f != 0.0,
            SqlValue::Str(s) => s == "1" || s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Seven-digit fractional seconds, as datetime2/time literals carry.
fn seven_digit_fraction(nanos: u32) -> String {
    format!("{:07}", nanos / 100)
}

/// Serialize a resolved value into the literal text an UPDATE statement
/// needs for a column of the given declared type.
pub fn format_literal(
    value: &SqlValue,
    data_type: SqlType,
    dialect: SqlDialect,
) -> Result<String, MaskError> {
    if data_type.is_unsupported() {
        return Err(MaskError::UnsupportedType(data_type.name().to_string()));
    }

    if value.is_null() {
        return Ok("NULL".to_string());
    }

    match data_type {
        SqlType::Bit => Ok(if value.truthy() { "1" } else { "0" }.to_string()),

        SqlType::TinyInt
        | SqlType::SmallInt
        | SqlType::Int
        | SqlType::BigInt
        | SqlType::Decimal
        | SqlType::Numeric
        | SqlType::Float
        | SqlType::Real
        | SqlType::Money
        | SqlType::SmallMoney => Ok(value.canonical_text()),

        SqlType::UniqueIdentifier => Ok(dialect.string_literal(&value.canonical_text(), false)),

        SqlType::Date => {
            let text = match value.as_datetime() {
                Some(dt) => dt.format("%Y-%m-%d").to_string(),
                None => value.canonical_text(),
            };
            Ok(dialect.string_literal(&text, false))
        }

        SqlType::DateTime => {
            let text = match value.as_datetime() {
                Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                None => value.canonical_text(),
            };
            Ok(dialect.string_literal(&text, false))
        }

        SqlType::DateTime2 | SqlType::DateTimeOffset => {
            let text = match value.as_datetime() {
                Some(dt) => format!(
                    "{}.{}",
                    dt.format("%Y-%m-%d %H:%M:%S"),
                    seven_digit_fraction(dt.nanosecond())
                ),
                None => value.canonical_text(),
            };
            Ok(dialect.string_literal(&text, false))
        }

        SqlType::SmallDateTime => {
            let text = match value.as_datetime() {
                Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => value.canonical_text(),
            };
            Ok(dialect.string_literal(&text, false))
        }

        SqlType::Time => {
            let text = match value.as_time() {
                Some(t) => format!(
                    "{}.{}",
                    t.format("%H:%M:%S"),
                    seven_digit_fraction(t.nanosecond())
                ),
                None => value.canonical_text(),
            };
            Ok(dialect.string_literal(&text, false))
        }

        SqlType::Char
        | SqlType::VarChar
        | SqlType::NChar
        | SqlType::NVarChar
        | SqlType::Text
        | SqlType::NText => Ok(dialect.string_literal(
            &value.canonical_text(),
            data_type.is_unicode_string(),
        )),

        SqlType::HierarchyId | SqlType::Geography | SqlType::Geometry | SqlType::Xml => {
            unreachable!("unsupported types rejected above")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_from_sql_type_strips_length() {
        assert_eq!(SqlType::from_sql_type("VARCHAR(255)"), Some(SqlType::VarChar));
        assert_eq!(SqlType::from_sql_type("decimal(10,2)"), Some(SqlType::Decimal));
        assert_eq!(SqlType::from_sql_type("NVARCHAR(max)"), Some(SqlType::NVarChar));
        assert_eq!(SqlType::from_sql_type("bogus"), None);
    }

    #[test]
    fn test_null_literal() {
        let out = format_literal(&SqlValue::Null, SqlType::VarChar, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "NULL");
    }

    #[test]
    fn test_bit_literal() {
        let out = format_literal(&SqlValue::Bool(true), SqlType::Bit, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "1");
        let out = format_literal(&SqlValue::Bool(false), SqlType::Bit, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "0");
    }

    #[test]
    fn test_numeric_literals_unquoted() {
        let out = format_literal(&SqlValue::Int(42), SqlType::Int, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "42");
        let out = format_literal(&SqlValue::Float(12.5), SqlType::Money, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "12.5");
        // A shuffled numeric arrives as text but stays unquoted
        let out = format_literal(
            &SqlValue::Str("3412.99".to_string()),
            SqlType::Decimal,
            SqlDialect::Mssql,
        )
        .unwrap();
        assert_eq!(out, "3412.99");
    }

    #[test]
    fn test_datetime_millis() {
        let value = SqlValue::DateTime(dt("2024-03-01 10:20:30.123"));
        let out = format_literal(&value, SqlType::DateTime, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'2024-03-01 10:20:30.123'");
    }

    #[test]
    fn test_datetime2_seven_digits() {
        let value = SqlValue::DateTime(dt("2024-03-01 10:20:30.1234567"));
        let out = format_literal(&value, SqlType::DateTime2, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'2024-03-01 10:20:30.1234567'");
    }

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        let out = format_literal(&SqlValue::Date(date), SqlType::Date, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'2023-11-05'");
        let parsed = NaiveDate::parse_from_str(out.trim_matches('\''), "%Y-%m-%d").unwrap();
        assert_eq!(parsed, date);
    }

    #[test]
    fn test_smalldatetime_no_fraction() {
        let value = SqlValue::DateTime(dt("2024-03-01 10:20:30.999"));
        let out = format_literal(&value, SqlType::SmallDateTime, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'2024-03-01 10:20:30'");
    }

    #[test]
    fn test_time_seven_digits() {
        let value = SqlValue::Time(NaiveTime::from_hms_micro_opt(7, 8, 9, 250_000).unwrap());
        let out = format_literal(&value, SqlType::Time, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'07:08:09.2500000'");
    }

    #[test]
    fn test_string_quote_doubling() {
        let value = SqlValue::Str("O'Brien".to_string());
        let out = format_literal(&value, SqlType::VarChar, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'O''Brien'");
    }

    #[test]
    fn test_nvarchar_gets_unicode_literal() {
        let value = SqlValue::Str("plain".to_string());
        let out = format_literal(&value, SqlType::NVarChar, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "N'plain'");
    }

    #[test]
    fn test_unsupported_types_error() {
        for ty in [SqlType::HierarchyId, SqlType::Geography, SqlType::Geometry, SqlType::Xml] {
            let err = format_literal(&SqlValue::Int(1), ty, SqlDialect::Mssql).unwrap_err();
            assert!(matches!(err, MaskError::UnsupportedType(_)));
        }
    }

    #[test]
    fn test_uniqueidentifier_quoted() {
        let value = SqlValue::Str("550e8400-e29b-41d4-a716-446655440000".to_string());
        let out = format_literal(&value, SqlType::UniqueIdentifier, SqlDialect::Mssql).unwrap();
        assert_eq!(out, "'550e8400-e29b-41d4-a716-446655440000'");
    }

    #[test]
    fn test_tagged_round_trip() {
        let values = vec![
            SqlValue::Int(7),
            SqlValue::Float(2.25),
            SqlValue::Str("hello".to_string()),
            SqlValue::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()),
            SqlValue::Bool(true),
        ];
        for v in values {
            let back = SqlValue::parse_tagged(v.type_tag(), &v.canonical_text()).unwrap();
            assert_eq!(back, v);
        }
    }
}
