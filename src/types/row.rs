use crate::error::{DriverError, Result};
use crate::types::{Schema, SqlValue, TypeMap};

/// Result of one statement execution: ordered rows, the mapped schema, and
/// the outbound type map. Produced fresh per execution; nothing is shared
/// across executions.
#[derive(Debug, Clone)]
pub struct ResultSet {
    /// Rows in engine order; each row holds wire-format values in column
    /// order, `None` for SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
    pub schema: Schema,
    pub type_map: TypeMap,
}

impl ResultSet {
    pub fn new(rows: Vec<Vec<Option<String>>>, schema: Schema, type_map: TypeMap) -> Self {
        Self {
            rows,
            schema,
            type_map,
        }
    }

    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            schema: Schema::default(),
            type_map: TypeMap::outbound_defaults(),
        }
    }

    /// Borrowing view of one row, with by-name access.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            values,
            schema: &self.schema,
            type_map: &self.type_map,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in result order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A single row of a result set. Values are wire-format strings accessed by
/// column name; `typed_get` runs the value through the result's type map.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    values: &'a [Option<String>],
    schema: &'a Schema,
    type_map: &'a TypeMap,
}

impl<'a> Row<'a> {
    /// Gets the raw wire value by column name (`None` for SQL NULL).
    pub fn get(&self, column: &str) -> Result<Option<&'a str>> {
        Ok(self.slot(column)?.as_deref())
    }

    /// Gets the value by column name, converted via the result's type map.
    pub fn typed_get(&self, column: &str) -> Result<SqlValue> {
        let index = self.index_of(column)?;
        let tag = &self.schema.columns[index].portable_type;
        Ok(self.type_map.convert(tag, self.slot(column)?.as_deref()))
    }

    fn index_of(&self, column: &str) -> Result<usize> {
        self.schema
            .column_index(column)
            .ok_or_else(|| DriverError::ColumnNotFound(column.to_string()))
    }

    // a row shorter than its schema reports the column as absent rather
    // than panicking
    fn slot(&self, column: &str) -> Result<&'a Option<String>> {
        let index = self.index_of(column)?;
        self.values
            .get(index)
            .ok_or_else(|| DriverError::ColumnNotFound(column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
