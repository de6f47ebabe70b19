use async_trait::async_trait;

use crate::config::ConnectParams;
use crate::error::Result;

use super::Connection;

/// Entry point the host framework holds for one supported engine.
///
/// The framework never sees a concrete adapter type; it opens connections
/// through this trait and works against [`Connection`] and
/// [`super::Statement`] objects from there.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Engine identifier, e.g. `"postgresql"`.
    fn name(&self) -> &'static str;

    /// Constructs one connection adapter and connects it.
    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn Connection>>;
}
