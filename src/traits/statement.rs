use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ResultSet, SqlValue};

/// One native prepared statement, bound to the connection that prepared it.
///
/// A statement must not outlive its connection and must not be shared across
/// concurrent executions; create one adapter per logical statement.
#[async_trait]
pub trait Statement: Send + Sync {
    /// Executes with the given binds and materializes the full result.
    /// Native result resources are released before this returns, on success
    /// and on error. Fails with `StatementFinished` after `finish`.
    async fn execute(&self, binds: &[SqlValue]) -> Result<ResultSet>;

    /// Releases the native statement resources. Idempotent.
    async fn finish(&self) -> Result<()>;

    /// The generated process-unique statement name, for diagnostics.
    fn name(&self) -> &str;
}
