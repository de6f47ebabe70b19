mod row;
mod schema;
mod sql_value;

pub use row::{ResultSet, Row};
pub use schema::{Column, Schema, TypeMap, ValueParser};
pub use sql_value::SqlValue;
