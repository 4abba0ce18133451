use crate::core::value::Value;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Column types understood by the row sources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Decimal,
    Date,
    Boolean,
    Null,
}

/// Accepted textual date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

impl DataType {
    /// Converts a raw text cell into a typed value. Blank cells become
    /// `Value::Null` for every type except `String`.
    pub fn parse(&self, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() && *self != DataType::String {
            return Ok(Value::Null);
        }

        match self {
            DataType::String => Ok(Value::String(raw.trim_end().to_string())),
            DataType::Int => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("invalid integer '{trimmed}': {e}")),
            DataType::Decimal => BigDecimal::from_str(trimmed)
                .map(Value::Decimal)
                .map_err(|e| format!("invalid decimal '{trimmed}': {e}")),
            DataType::Date => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(Value::Date)
                .ok_or_else(|| format!("invalid date '{trimmed}'")),
            DataType::Boolean => match trimmed.to_ascii_uppercase().as_str() {
                "Y" | "YES" | "TRUE" | "1" => Ok(Value::Boolean(true)),
                "N" | "NO" | "FALSE" | "0" => Ok(Value::Boolean(false)),
                other => Err(format!("invalid boolean '{other}'")),
            },
            DataType::Null => Ok(Value::Null),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Decimal)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Decimal => "decimal",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
            DataType::Null => "null",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed column of the source row layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_numeric_cell_is_null() {
        assert_eq!(DataType::Decimal.parse("   ").unwrap(), Value::Null);
        assert_eq!(DataType::String.parse("").unwrap(), Value::String(String::new()));
    }

    #[test]
    fn parses_legacy_date_layouts() {
        let expected = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(DataType::Date.parse("2024-03-31").unwrap(), expected);
        assert_eq!(DataType::Date.parse("03/31/2024").unwrap(), expected);
        assert_eq!(DataType::Date.parse("20240331").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_integers() {
        assert!(DataType::Int.parse("12A").is_err());
    }
}
