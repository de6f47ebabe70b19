mod in_memory;
mod postgres;

pub use self::in_memory::{InMemoryConnection, InMemoryDriver, RecordedQuery, ResponseBuilder};
pub use self::postgres::{PostgresConnection, PostgresDriver, PostgresStatement};
