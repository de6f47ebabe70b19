//! dbridge - a pluggable relational database driver adapter layer
//!
//! The host framework holds the [`Driver`]/[`Connection`]/[`Statement`]
//! traits; one concrete adapter per engine translates that contract into the
//! engine's native client calls. Portable queries use `?` placeholders,
//! translated to the engine's parameter syntax (or inlined with canonical
//! escaping) before execution; results come back as wire-format rows plus a
//! mapped [`Schema`] and the outbound [`TypeMap`].
//!
//! # Example
//! ```ignore
//! use dbridge::{ConnectParams, Driver, PostgresDriver, SqlValue};
//!
//! let params = ConnectParams::new()
//!     .host("localhost")
//!     .dbname("app")
//!     .user("app");
//! let conn = PostgresDriver.open(&params).await?;
//!
//! conn.begin().await?;
//! conn.execute(
//!     "INSERT INTO users (name) VALUES (?)",
//!     &[SqlValue::from("John")],
//! )
//! .await?;
//! conn.commit().await?;
//!
//! let schema = conn.describe_table("users", "public").await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod introspect;
pub mod metadata;
pub mod placeholder;
pub mod traits;
pub mod transaction;
pub mod types;

// Re-export main types for convenient access
pub use config::ConnectParams;
pub use drivers::{InMemoryConnection, InMemoryDriver, PostgresDriver, ResponseBuilder};
pub use error::{DriverError, Result};
pub use traits::{Connection, Driver, Statement};
pub use types::{Column, ResultSet, Row, Schema, SqlValue, TypeMap};
