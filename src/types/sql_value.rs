/// Represents a SQL bind value in a driver-agnostic way.
/// Drivers are responsible for converting these to their native types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
}

impl SqlValue {
    /// Renders this value as an engine-ready SQL literal, using `escape` as
    /// the engine's canonical string-escaping routine. Used by the inlining
    /// path when no native binding is available.
    pub fn to_literal<F>(&self, escape: F) -> String
    where
        F: Fn(&str) -> String,
    {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(s) => escape(s),
            SqlValue::Int32(i) => i.to_string(),
            SqlValue::Int64(i) => i.to_string(),
            SqlValue::Float64(f) => f.to_string(),
            SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::escape_literal;

    #[test]
    fn null_and_scalars_render_without_escaping() {
        assert_eq!(SqlValue::Null.to_literal(escape_literal), "NULL");
        assert_eq!(SqlValue::Int64(42).to_literal(escape_literal), "42");
        assert_eq!(SqlValue::Bool(false).to_literal(escape_literal), "FALSE");
    }

    #[test]
    fn text_renders_through_escape_routine() {
        let v = SqlValue::Text("it's".to_string());
        assert_eq!(v.to_literal(escape_literal), "'it''s'");
    }

    #[test]
    fn option_none_converts_to_null() {
        let v: SqlValue = Option::<i32>::None.into();
        assert_eq!(v, SqlValue::Null);
    }
}
