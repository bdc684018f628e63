//! Canonical column types.
//!
//! Catalogs spell the same type many ways (`VARCHAR(16777216)`, `TEXT`,
//! `STRING`). Every spelling is folded into one [`DataType`] variant at parse
//! time, so two spellings of the same variant are never reported as drift.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Dialect-neutral column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// Character data (VARCHAR, TEXT, STRING, CHAR)
    String,
    /// Exact numerics, including integers (Snowflake INT is NUMBER(38,0))
    Number,
    /// Approximate numerics
    Float,
    Boolean,
    Date,
    Time,
    /// Timestamp without time zone (TIMESTAMP_NTZ)
    Timestamp,
    /// Timestamp with time zone (TIMESTAMP_TZ)
    TimestampTz,
    /// Timestamp in session local time zone (TIMESTAMP_LTZ)
    TimestampLtz,
    /// Semi-structured value (VARIANT, JSON)
    Variant,
    /// Semi-structured object (OBJECT, STRUCT, MAP)
    Object,
    /// Semi-structured array (ARRAY, DuckDB `T[]` lists)
    Array,
    Binary,
    /// Anything else, kept verbatim (upper-cased, parameters stripped)
    Other(String),
}

impl DataType {
    /// Parse a catalog or contract type name.
    ///
    /// Never fails: unknown names become [`DataType::Other`].
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.ends_with("[]") {
            return DataType::Array;
        }
        let base = normalize_type_name(&upper);

        match base.as_str() {
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "CHARACTER" | "NCHAR" | "NVARCHAR"
            | "NVARCHAR2" | "CHAR VARYING" | "CHARACTER VARYING" | "BPCHAR" | "UUID" => {
                DataType::String
            }
            "NUMBER" | "DECIMAL" | "NUMERIC" | "INT" | "INTEGER" | "BIGINT" | "SMALLINT"
            | "TINYINT" | "BYTEINT" | "HUGEINT" | "UBIGINT" | "UINTEGER" | "USMALLINT"
            | "UTINYINT" | "INT2" | "INT4" | "INT8" | "LONG" => DataType::Number,
            "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" => {
                DataType::Float
            }
            "BOOLEAN" | "BOOL" | "LOGICAL" => DataType::Boolean,
            "DATE" => DataType::Date,
            "TIME" => DataType::Time,
            "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMPNTZ" | "DATETIME"
            | "TIMESTAMP WITHOUT TIME ZONE" => DataType::Timestamp,
            "TIMESTAMP_TZ" | "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => DataType::TimestampTz,
            "TIMESTAMP_LTZ" | "TIMESTAMPLTZ" | "TIMESTAMP WITH LOCAL TIME ZONE" => {
                DataType::TimestampLtz
            }
            "VARIANT" | "JSON" => DataType::Variant,
            "OBJECT" | "STRUCT" | "MAP" => DataType::Object,
            "ARRAY" | "LIST" => DataType::Array,
            "BINARY" | "VARBINARY" | "BLOB" | "BYTEA" => DataType::Binary,
            _ => DataType::Other(base),
        }
    }

    /// Canonical spelling, used in findings and contract files.
    pub fn canonical_name(&self) -> &str {
        match self {
            DataType::String => "VARCHAR",
            DataType::Number => "NUMBER",
            DataType::Float => "FLOAT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP_NTZ",
            DataType::TimestampTz => "TIMESTAMP_TZ",
            DataType::TimestampLtz => "TIMESTAMP_LTZ",
            DataType::Variant => "VARIANT",
            DataType::Object => "OBJECT",
            DataType::Array => "ARRAY",
            DataType::Binary => "BINARY",
            DataType::Other(name) => name,
        }
    }

    /// Returns true for VARIANT/OBJECT/ARRAY.
    pub fn is_semi_structured(&self) -> bool {
        matches!(self, DataType::Variant | DataType::Object | DataType::Array)
    }
}

/// Strip parenthesized parameters and collapse whitespace:
/// `TIMESTAMP(9) WITH TIME ZONE` → `TIMESTAMP WITH TIME ZONE`.
fn normalize_type_name(upper: &str) -> String {
    let mut out = String::with_capacity(upper.len());
    let mut depth = 0usize;
    for ch in upper.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.canonical_name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(de::Error::custom("data type must be non-empty"));
        }
        Ok(DataType::parse(&raw))
    }
}

/// Parse a routine argument signature such as `(ACTIVITY VARCHAR, DETAILS VARIANT)`
/// or `(VARCHAR, NUMBER(38,0))` into its ordered parameter types.
pub fn parse_argument_signature(raw: &str) -> Vec<DataType> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    split_top_level(inner)
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let part = part.trim();
            // "NAME TYPE" or a bare, possibly multi-word, "TYPE". A name may
            // itself be a type keyword (`DATE DATE`), so the tail wins when it parses.
            match part.split_once(char::is_whitespace) {
                Some((_, rest)) => match DataType::parse(rest) {
                    DataType::Other(_) => DataType::parse(part),
                    parsed => parsed,
                },
                None => DataType::parse(part),
            }
        })
        .collect()
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_aliases_fold() {
        assert_eq!(DataType::parse("VARCHAR(16777216)"), DataType::String);
        assert_eq!(DataType::parse("text"), DataType::String);
        assert_eq!(DataType::parse("STRING"), DataType::String);
    }

    #[test]
    fn test_numeric_aliases_fold() {
        assert_eq!(DataType::parse("NUMBER(38,0)"), DataType::Number);
        assert_eq!(DataType::parse("BIGINT"), DataType::Number);
        assert_eq!(DataType::parse("DECIMAL(18, 3)"), DataType::Number);
        assert_eq!(DataType::parse("DOUBLE"), DataType::Float);
        assert_ne!(DataType::parse("INTEGER"), DataType::parse("DOUBLE"));
        // Precision and scale are not part of the type.
        assert_eq!(DataType::parse("NUMBER(10,2)"), DataType::parse("NUMBER(38,0)"));
    }

    #[test]
    fn test_timestamp_variants_stay_distinct() {
        assert_eq!(DataType::parse("TIMESTAMP_TZ(9)"), DataType::TimestampTz);
        assert_eq!(
            DataType::parse("TIMESTAMP WITH TIME ZONE"),
            DataType::TimestampTz
        );
        assert_eq!(DataType::parse("TIMESTAMP_NTZ"), DataType::Timestamp);
        assert_ne!(DataType::parse("TIMESTAMP_LTZ"), DataType::TimestampTz);
    }

    #[test]
    fn test_semi_structured() {
        assert_eq!(DataType::parse("JSON"), DataType::Variant);
        assert_eq!(DataType::parse("INTEGER[]"), DataType::Array);
        assert_eq!(DataType::parse("STRUCT(a INTEGER)"), DataType::Object);
        assert!(DataType::Variant.is_semi_structured());
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        assert_eq!(
            DataType::parse("geography"),
            DataType::Other("GEOGRAPHY".to_string())
        );
        assert_eq!(DataType::parse("geography").to_string(), "GEOGRAPHY");
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let json = serde_json::to_string(&DataType::TimestampTz).unwrap();
        assert_eq!(json, "\"TIMESTAMP_TZ\"");
        let parsed: DataType = serde_json::from_str("\"timestamp with time zone\"").unwrap();
        assert_eq!(parsed, DataType::TimestampTz);
        assert!(serde_json::from_str::<DataType>("\"\"").is_err());
    }

    #[test]
    fn test_argument_signature_with_names() {
        let sig = parse_argument_signature("(ACTIVITY VARCHAR, DETAILS VARIANT)");
        assert_eq!(sig, vec![DataType::String, DataType::Variant]);
    }

    #[test]
    fn test_argument_signature_without_names() {
        let sig = parse_argument_signature("(VARCHAR, NUMBER(38,0), TIMESTAMP WITH TIME ZONE)");
        assert_eq!(
            sig,
            vec![DataType::String, DataType::Number, DataType::TimestampTz]
        );
    }

    #[test]
    fn test_argument_names_that_are_type_keywords() {
        assert_eq!(parse_argument_signature("(DATE DATE)"), vec![DataType::Date]);
        assert_eq!(
            parse_argument_signature("(TEXT VARCHAR, JSON VARIANT)"),
            vec![DataType::String, DataType::Variant]
        );
        assert_eq!(
            parse_argument_signature("(TIMESTAMP TIMESTAMP_TZ, OBJECT OBJECT, N DOUBLE PRECISION)"),
            vec![DataType::TimestampTz, DataType::Object, DataType::Float]
        );
    }

    #[test]
    fn test_empty_argument_signature() {
        assert!(parse_argument_signature("()").is_empty());
        assert!(parse_argument_signature("").is_empty());
    }
}
