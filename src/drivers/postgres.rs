//! PostgreSQL adapter over tokio-postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, trace};

use crate::config::ConnectParams;
use crate::error::{DriverError, Result};
use crate::metadata;
use crate::placeholder;
use crate::traits::{Connection, Driver, Statement};
use crate::types::{ResultSet, Schema, SqlValue, TypeMap};
use crate::{introspect, transaction::TxnState};

/// Driver entry point for PostgreSQL.
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn Connection>> {
        let conn = PostgresConnection::new(params.clone());
        conn.connect().await?;
        Ok(Box::new(conn))
    }
}

/// Session lifecycle: never connected, connected, or explicitly closed.
/// Closed is terminal.
struct Session {
    client: Option<Client>,
    closed: bool,
}

struct Shared {
    params: ConnectParams,
    session: Mutex<Session>,
    txn: TxnState,
    last_query: StdMutex<Option<String>>,
    stmt_counter: AtomicU64,
}

impl Shared {
    fn record_query(&self, query: &str) {
        *self.last_query.lock().unwrap_or_else(|e| e.into_inner()) = Some(query.to_string());
    }

    fn next_statement_name(&self) -> String {
        // monotonic counter, never wall-clock time: unique under rapid
        // repeated preparation on the same connection
        format!("stmt_{}", self.stmt_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn open_session(&self, session: &mut Session) -> Result<()> {
        let conn_str = self.params.to_connection_string();
        let (client, connection) = tokio_postgres::connect(&conn_str, NoTls)
            .await
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "postgresql connection task ended");
            }
        });
        debug!(
            host = self.params.host.as_deref(),
            dbname = self.params.dbname.as_deref(),
            "connected"
        );
        session.client = Some(client);
        Ok(())
    }

    /// Locks the session and hands back a guard holding a live client.
    /// Never-connected and closed sessions both fail with `Disconnected`.
    async fn live_session(&self) -> Result<MutexGuard<'_, Session>> {
        let session = self.session.lock().await;
        if session.closed {
            return Err(DriverError::Disconnected(
                "connection has been disconnected".to_string(),
            ));
        }
        if session.client.is_none() {
            return Err(DriverError::Disconnected("not connected".to_string()));
        }
        Ok(session)
    }

    async fn run_query(&self, query: &str, binds: &[SqlValue]) -> Result<ResultSet> {
        let (translated, markers) = placeholder::number_markers(query);
        if binds.len() != markers {
            return Err(DriverError::Query(format!(
                "query has {} placeholders, got {} binds",
                markers,
                binds.len()
            )));
        }
        let session = self.live_session().await?;
        let client = session.client.as_ref().ok_or_else(|| {
            DriverError::Disconnected("not connected".to_string())
        })?;
        // recorded only once the query can actually reach the engine
        self.record_query(&translated);

        trace!(query = %translated, binds = binds.len(), "executing");
        let stmt = client
            .prepare(&translated)
            .await
            .map_err(|e| DriverError::Prepare(e.to_string()))?;
        execute_prepared(client, &stmt, binds, TypeMap::outbound_defaults()).await
    }
}

/// One PostgreSQL session. Constructed unconnected; `connect` (or a `ping`
/// with no prior state) opens the native session.
pub struct PostgresConnection {
    shared: Arc<Shared>,
}

impl PostgresConnection {
    pub fn new(params: ConnectParams) -> Self {
        Self {
            shared: Arc::new(Shared {
                params,
                session: Mutex::new(Session {
                    client: None,
                    closed: false,
                }),
                txn: TxnState::new(),
                last_query: StdMutex::new(None),
                stmt_counter: AtomicU64::new(0),
            }),
        }
    }

    async fn issue(&self, sql: &str) -> Result<()> {
        let session = self.shared.live_session().await?;
        let client = session.client.as_ref().ok_or_else(|| {
            DriverError::Disconnected("not connected".to_string())
        })?;
        self.shared.record_query(sql);
        client
            .batch_execute(sql)
            .await
            .map_err(map_native_error)
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn connect(&self) -> Result<()> {
        let mut session = self.shared.session.lock().await;
        if session.closed {
            return Err(DriverError::Disconnected(
                "connection has been disconnected".to_string(),
            ));
        }
        if session.client.is_some() {
            return Ok(());
        }
        self.shared.open_session(&mut session).await
    }

    async fn disconnect(&self) -> Result<()> {
        let mut session = self.shared.session.lock().await;
        // dropping the client closes the native session
        session.client = None;
        session.closed = true;
        Ok(())
    }

    async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        let mut session = self.shared.session.lock().await;
        if session.closed {
            return Err(DriverError::Disconnected(
                "connection has been disconnected".to_string(),
            ));
        }
        if session.client.is_none() {
            self.shared.open_session(&mut session).await?;
        }
        let client = session.client.as_ref().ok_or_else(|| {
            DriverError::Disconnected("not connected".to_string())
        })?;
        let rows = client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| DriverError::Disconnected(e.to_string()))?;
        if rows.is_empty() {
            return Err(DriverError::Disconnected(
                "ping query returned no rows".to_string(),
            ));
        }
        Ok(start.elapsed())
    }

    async fn begin(&self) -> Result<()> {
        self.shared.txn.begin()?;
        if let Err(e) = self.issue("BEGIN").await {
            self.shared.txn.abort_begin();
            return Err(e);
        }
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.shared.txn.commit()?;
        if let Err(e) = self.issue("COMMIT").await {
            // the engine-side transaction is still open
            self.shared.txn.restore_open();
            return Err(e);
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.shared.txn.rollback()?;
        if let Err(e) = self.issue("ROLLBACK").await {
            self.shared.txn.restore_open();
            return Err(e);
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.shared.txn.is_open()
    }

    async fn execute(&self, query: &str, binds: &[SqlValue]) -> Result<ResultSet> {
        self.shared.run_query(query, binds).await
    }

    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>> {
        let (translated, _) = placeholder::number_markers(query);
        let name = self.shared.next_statement_name();

        let session = self.shared.live_session().await?;
        let client = session.client.as_ref().ok_or_else(|| {
            DriverError::Disconnected("not connected".to_string())
        })?;
        debug!(name = %name, query = %translated, "preparing statement");
        let native = client
            .prepare(&translated)
            .await
            .map_err(|e| DriverError::Prepare(e.to_string()))?;
        drop(session);

        Ok(Box::new(PostgresStatement {
            shared: Arc::clone(&self.shared),
            name,
            translated,
            native: StdMutex::new(Some(native)),
            type_map: TypeMap::outbound_defaults(),
        }))
    }

    fn preprocess_query(&self, query: &str, binds: &[SqlValue]) -> Result<String> {
        let inlined = placeholder::inline_binds(query, binds, placeholder::escape_literal)?;
        self.shared.record_query(&inlined);
        Ok(inlined)
    }

    fn last_query(&self) -> Option<String> {
        self.shared
            .last_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn database_name(&self) -> Option<String> {
        self.shared.params.dbname.clone()
    }

    async fn list_schema(&self, schema: &str) -> Result<Vec<Schema>> {
        introspect::list_schema(self, schema).await
    }

    async fn describe_table(&self, table: &str, schema: &str) -> Result<Schema> {
        introspect::describe_table(self, table, schema).await
    }
}

/// One native prepared statement. The tokio-postgres handle is released on
/// `finish` (or drop); after `finish`, `execute` fails.
pub struct PostgresStatement {
    shared: Arc<Shared>,
    name: String,
    translated: String,
    native: StdMutex<Option<tokio_postgres::Statement>>,
    type_map: TypeMap,
}

#[async_trait]
impl Statement for PostgresStatement {
    async fn execute(&self, binds: &[SqlValue]) -> Result<ResultSet> {
        let native = self
            .native
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(DriverError::StatementFinished)?;

        let session = self.shared.live_session().await?;
        let client = session.client.as_ref().ok_or_else(|| {
            DriverError::Disconnected("not connected".to_string())
        })?;
        self.shared.record_query(&self.translated);
        trace!(name = %self.name, binds = binds.len(), "executing prepared statement");
        execute_prepared(client, &native, binds, self.type_map.clone()).await
    }

    async fn finish(&self) -> Result<()> {
        // dropping the handle releases the engine-side statement
        self.native
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Runs one prepared statement and materializes the full portable result.
/// Rows are drained eagerly, so the native result is released before this
/// returns on every path.
async fn execute_prepared(
    client: &Client,
    stmt: &tokio_postgres::Statement,
    binds: &[SqlValue],
    type_map: TypeMap,
) -> Result<ResultSet> {
    let boxed = bind_args(binds);
    let args: Vec<&(dyn ToSql + Sync)> = boxed
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect();

    let native_rows = client.query(stmt, &args).await.map_err(map_native_error)?;

    let descriptors = stmt.columns().iter().map(|c| {
        // result metadata does not carry nullability; assume nullable
        (c.name().to_string(), c.type_().name().to_string(), true)
    });
    let columns = metadata::map_columns(descriptors, &HashMap::new());

    let mut rows = Vec::with_capacity(native_rows.len());
    for native_row in &native_rows {
        let mut row = Vec::with_capacity(columns.len());
        for (index, column) in stmt.columns().iter().enumerate() {
            row.push(wire_value(native_row, index, column.type_())?);
        }
        rows.push(row);
    }
    metadata::normalize_naive_timestamps(&mut rows, &columns, metadata::local_offset());

    Ok(ResultSet::new(rows, Schema::new(vec![], columns), type_map))
}

fn bind_args(binds: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    binds
        .iter()
        .map(|value| -> Box<dyn ToSql + Sync + Send> {
            match value {
                SqlValue::Null => Box::new(None::<String>),
                SqlValue::Text(s) => Box::new(s.clone()),
                SqlValue::Int32(i) => Box::new(*i),
                SqlValue::Int64(i) => Box::new(*i),
                SqlValue::Float64(f) => Box::new(*f),
                SqlValue::Bool(b) => Box::new(*b),
            }
        })
        .collect()
}

/// Reads one column of one row back as its wire-format string.
fn wire_value(row: &tokio_postgres::Row, index: usize, ty: &Type) -> Result<Option<String>> {
    let value = if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)
            .map_err(map_native_error)?
            .map(|v| v.to_string())
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)
            .map_err(map_native_error)?
            .map(|v| v.to_string())
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)
            .map_err(map_native_error)?
            .map(|v| v.to_string())
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)
            .map_err(map_native_error)?
            .map(|v| v.to_string())
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)
            .map_err(map_native_error)?
            .map(|v| v.to_string())
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)
            .map_err(map_native_error)?
            .map(|v| if v { "t" } else { "f" }.to_string())
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<time::PrimitiveDateTime>>(index)
            .map_err(map_native_error)?
            .map(|v| render_timestamp(v.date(), v.time()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<time::OffsetDateTime>>(index)
            .map_err(map_native_error)?
            .map(|v| {
                let mut s = render_timestamp(v.date(), v.time());
                s.push_str(&metadata::offset_suffix(v.offset()));
                s
            })
    } else {
        row.try_get::<_, Option<String>>(index)
            .map_err(map_native_error)?
    };
    Ok(value)
}

/// Renders a timestamp the way the engine's text output does: seconds, then
/// fractional seconds up to microsecond precision with trailing zeros
/// trimmed, omitted entirely when zero.
fn render_timestamp(date: time::Date, t: time::Time) -> String {
    let mut s = format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        t.hour(),
        t.minute(),
        t.second()
    );
    let micros = t.microsecond();
    if micros != 0 {
        let frac = format!("{micros:06}");
        s.push('.');
        s.push_str(frac.trim_end_matches('0'));
    }
    s
}

fn map_native_error(e: tokio_postgres::Error) -> DriverError {
    if e.is_closed() {
        DriverError::Disconnected(e.to_string())
    } else {
        DriverError::Query(e.to_string())
    }
}
