use std::collections::HashMap;

use crate::types::SqlValue;

/// Portable description of one result or table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as reported by the engine.
    pub name: String,
    /// The engine's own name for the storage type, prior to mapping.
    pub native_type: String,
    /// Engine-agnostic type tag (see `metadata::portable_tag`).
    pub portable_type: String,
    pub nullable: bool,
}

/// Engine-agnostic description of one result set or one introspected table.
///
/// One instance corresponds to exactly one result set or one `describe_table`
/// call; column order matches the source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// Tables this schema describes (empty for ad-hoc query results).
    pub tables: Vec<String>,
    /// Columns in result/table order.
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(tables: Vec<String>, columns: Vec<Column>) -> Self {
        Self { tables, columns }
    }

    /// Position of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Conversion from a wire-format string to a typed value.
pub type ValueParser = fn(&str) -> SqlValue;

/// Mapping from portable type tag to a conversion function, consulted when
/// materializing outbound values. Built once per statement and carried on
/// every result set.
#[derive(Debug, Clone)]
pub struct TypeMap {
    parsers: HashMap<String, ValueParser>,
}

fn parse_int(raw: &str) -> SqlValue {
    raw.parse::<i64>()
        .map(SqlValue::Int64)
        .unwrap_or_else(|_| SqlValue::Text(raw.to_string()))
}

fn parse_float(raw: &str) -> SqlValue {
    raw.parse::<f64>()
        .map(SqlValue::Float64)
        .unwrap_or_else(|_| SqlValue::Text(raw.to_string()))
}

fn parse_bool(raw: &str) -> SqlValue {
    match raw {
        "t" | "true" | "TRUE" => SqlValue::Bool(true),
        "f" | "false" | "FALSE" => SqlValue::Bool(false),
        other => SqlValue::Text(other.to_string()),
    }
}

fn parse_text(raw: &str) -> SqlValue {
    SqlValue::Text(raw.to_string())
}

impl TypeMap {
    /// The default outbound conversions for portable tags. Tags with no entry
    /// fall back to text.
    pub fn outbound_defaults() -> Self {
        let mut parsers: HashMap<String, ValueParser> = HashMap::new();
        for tag in ["int2", "int4", "int8", "smallint", "integer", "bigint"] {
            parsers.insert(tag.to_string(), parse_int);
        }
        for tag in ["float4", "float8", "real", "double precision", "numeric"] {
            parsers.insert(tag.to_string(), parse_float);
        }
        for tag in ["bool", "boolean"] {
            parsers.insert(tag.to_string(), parse_bool);
        }
        parsers.insert("timestamp".to_string(), parse_text);
        Self { parsers }
    }

    /// Registers or overrides the conversion for a portable tag.
    pub fn register(&mut self, tag: impl Into<String>, parser: ValueParser) {
        self.parsers.insert(tag.into(), parser);
    }

    /// Converts one wire value under the given portable tag. `None` stays
    /// null regardless of tag.
    pub fn convert(&self, tag: &str, raw: Option<&str>) -> SqlValue {
        match raw {
            None => SqlValue::Null,
            Some(raw) => match self.parsers.get(tag) {
                Some(parser) => parser(raw),
                None => parse_text(raw),
            },
        }
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::outbound_defaults()
    }
}
