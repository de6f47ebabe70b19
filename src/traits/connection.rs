use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ResultSet, Schema, SqlValue};

use super::Statement;

/// One native database session.
///
/// Implementations own the native handle, the transaction flag and the
/// last-issued-query record, each guarded by the adapter's own locks. A
/// connection is single-tracked: callers serialize their use of one adapter.
/// Every call blocks on the engine's response; timeouts are the caller's
/// concern.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Opens the native session. Fails with `ConnectionFailed` when the
    /// engine refuses, authentication fails or the host is unreachable.
    async fn connect(&self) -> Result<()>;

    /// Closes the native session. Idempotent: a second call is a no-op.
    /// Once disconnected the adapter stays closed.
    async fn disconnect(&self) -> Result<()>;

    /// Round-trips a trivial query and returns the elapsed time.
    ///
    /// Works with no prior state: a never-connected adapter transparently
    /// connects first. Fails with `Disconnected` after an explicit
    /// `disconnect`, or when the round trip yields no rows.
    async fn ping(&self) -> Result<Duration>;

    /// Issues BEGIN. Fails with `Transaction` if one is already open.
    async fn begin(&self) -> Result<()>;

    /// Issues COMMIT. Fails with `Transaction` if none is open.
    async fn commit(&self) -> Result<()>;

    /// Issues ROLLBACK. Fails with `Transaction` if none is open.
    async fn rollback(&self) -> Result<()>;

    /// True between a successful `begin` and its matching `commit`/`rollback`.
    fn in_transaction(&self) -> bool;

    /// Translates placeholders and executes the query with native binding.
    async fn execute(&self, query: &str, binds: &[SqlValue]) -> Result<ResultSet>;

    /// Prepares a statement for repeated execution.
    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>>;

    /// Inlines binds as escaped literals, for paths with no native binding.
    /// Records the result as the last-issued query.
    fn preprocess_query(&self, query: &str, binds: &[SqlValue]) -> Result<String>;

    /// The last query this adapter issued or preprocessed, for diagnostics.
    fn last_query(&self) -> Option<String>;

    /// Database name resolved at connect time.
    fn database_name(&self) -> Option<String>;

    /// One schema per table in the namespace, in catalog order.
    async fn list_schema(&self, schema: &str) -> Result<Vec<Schema>>;

    /// Columns of one table or view. Fails with `NotFound` when absent.
    async fn describe_table(&self, table: &str, schema: &str) -> Result<Schema>;
}
