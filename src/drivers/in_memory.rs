//! In-memory adapter for tests.
//!
//! Implements the whole plugin contract with no server: responses are
//! scripted in FIFO order and every issued query is recorded with its binds,
//! so callers can drive the contract end to end and verify exactly what would
//! have reached the engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::ConnectParams;
use crate::error::{DriverError, Result};
use crate::introspect;
use crate::metadata;
use crate::placeholder;
use crate::traits::{Connection, Driver, Statement};
use crate::transaction::TxnState;
use crate::types::{ResultSet, Schema, SqlValue, TypeMap};

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    /// The query as it would reach the engine (placeholders already
    /// translated to `$n`).
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionState {
    NeverConnected,
    Connected,
    Closed,
}

struct Inner {
    responses: Mutex<VecDeque<ResultSet>>,
    recorded: Mutex<Vec<RecordedQuery>>,
    default_response: ResultSet,
    state: Mutex<SessionState>,
    txn: TxnState,
    last_query: Mutex<Option<String>>,
    stmt_counter: AtomicU64,
    dbname: Mutex<Option<String>>,
}

impl Inner {
    fn require_live(&self) -> Result<()> {
        match *self.state.lock().unwrap_or_else(|e| e.into_inner()) {
            SessionState::Connected => Ok(()),
            SessionState::NeverConnected => {
                Err(DriverError::Disconnected("not connected".to_string()))
            }
            SessionState::Closed => Err(DriverError::Disconnected(
                "connection has been disconnected".to_string(),
            )),
        }
    }

    fn record(&self, sql: &str, binds: &[SqlValue]) {
        *self.last_query.lock().unwrap_or_else(|e| e.into_inner()) = Some(sql.to_string());
        self.recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedQuery {
                sql: sql.to_string(),
                binds: binds.to_vec(),
            });
    }

    fn take_response(&self) -> ResultSet {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone())
    }

    fn run(&self, sql: &str, binds: &[SqlValue]) -> Result<ResultSet> {
        self.require_live()?;
        self.record(sql, binds);
        Ok(self.take_response())
    }
}

/// Scripted in-memory connection adapter.
pub struct InMemoryConnection {
    inner: Arc<Inner>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                responses: Mutex::new(VecDeque::new()),
                recorded: Mutex::new(Vec::new()),
                default_response: ResultSet::empty(),
                state: Mutex::new(SessionState::NeverConnected),
                txn: TxnState::new(),
                last_query: Mutex::new(None),
                stmt_counter: AtomicU64::new(0),
                dbname: Mutex::new(None),
            }),
        }
    }

    /// Sets the database name this adapter reports, the way a real adapter
    /// stores the resolved name at connect time.
    pub fn with_database(self, name: impl Into<String>) -> Self {
        *self.inner.dbname.lock().unwrap_or_else(|e| e.into_inner()) = Some(name.into());
        self
    }

    /// Queues a response; responses are consumed in FIFO order, falling back
    /// to an empty result when the queue is drained.
    pub fn with_response(self, response: ResultSet) -> Self {
        self.inner
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    pub fn with_responses(self, responses: impl IntoIterator<Item = ResultSet>) -> Self {
        {
            let mut queue = self
                .inner
                .responses
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            for response in responses {
                queue.push_back(response);
            }
        }
        self
    }

    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.inner
            .recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_recorded(&self) -> Option<RecordedQuery> {
        self.inner
            .recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn assert_last_query(&self, expected_sql: &str, expected_binds: &[SqlValue]) {
        let last = self.last_recorded().expect("no queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.binds, expected_binds,
            "bind mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_binds, last.binds
        );
    }

    pub fn assert_query_count(&self, expected: usize) {
        let actual = self
            .inner
            .recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        assert_eq!(
            actual, expected,
            "query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn connect(&self) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            SessionState::Closed => Err(DriverError::Disconnected(
                "connection has been disconnected".to_string(),
            )),
            _ => {
                *state = SessionState::Connected;
                Ok(())
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::Closed;
        Ok(())
    }

    async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            match *state {
                SessionState::Closed => {
                    return Err(DriverError::Disconnected(
                        "connection has been disconnected".to_string(),
                    ))
                }
                SessionState::NeverConnected => *state = SessionState::Connected,
                SessionState::Connected => {}
            }
        }
        self.inner.record("SELECT 1", &[]);
        Ok(start.elapsed())
    }

    async fn begin(&self) -> Result<()> {
        self.inner.txn.begin()?;
        if let Err(e) = self.inner.run("BEGIN", &[]) {
            self.inner.txn.abort_begin();
            return Err(e);
        }
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.inner.txn.commit()?;
        if let Err(e) = self.inner.run("COMMIT", &[]) {
            // the engine-side transaction is still open
            self.inner.txn.restore_open();
            return Err(e);
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.inner.txn.rollback()?;
        if let Err(e) = self.inner.run("ROLLBACK", &[]) {
            self.inner.txn.restore_open();
            return Err(e);
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.inner.txn.is_open()
    }

    async fn execute(&self, query: &str, binds: &[SqlValue]) -> Result<ResultSet> {
        let (translated, _) = placeholder::number_markers(query);
        self.inner.run(&translated, binds)
    }

    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>> {
        self.inner.require_live()?;
        let (translated, _) = placeholder::number_markers(query);
        let name = format!(
            "stmt_{}",
            self.inner.stmt_counter.fetch_add(1, Ordering::SeqCst) + 1
        );
        Ok(Box::new(InMemoryStatement {
            inner: Arc::clone(&self.inner),
            name,
            translated,
            finished: AtomicBool::new(false),
        }))
    }

    fn preprocess_query(&self, query: &str, binds: &[SqlValue]) -> Result<String> {
        let inlined = placeholder::inline_binds(query, binds, placeholder::escape_literal)?;
        *self
            .inner
            .last_query
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(inlined.clone());
        Ok(inlined)
    }

    fn last_query(&self) -> Option<String> {
        self.inner
            .last_query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn database_name(&self) -> Option<String> {
        self.inner
            .dbname
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn list_schema(&self, schema: &str) -> Result<Vec<Schema>> {
        introspect::list_schema(self, schema).await
    }

    async fn describe_table(&self, table: &str, schema: &str) -> Result<Schema> {
        introspect::describe_table(self, table, schema).await
    }
}

/// Scripted prepared statement bound to one in-memory connection.
pub struct InMemoryStatement {
    inner: Arc<Inner>,
    name: String,
    translated: String,
    finished: AtomicBool,
}

#[async_trait]
impl Statement for InMemoryStatement {
    async fn execute(&self, binds: &[SqlValue]) -> Result<ResultSet> {
        if self.finished.load(Ordering::SeqCst) {
            return Err(DriverError::StatementFinished);
        }
        self.inner.run(&self.translated, binds)
    }

    async fn finish(&self) -> Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Driver factory for the in-memory adapter.
pub struct InMemoryDriver;

#[async_trait]
impl Driver for InMemoryDriver {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn open(&self, params: &ConnectParams) -> Result<Box<dyn Connection>> {
        let mut conn = InMemoryConnection::new();
        if let Some(dbname) = &params.dbname {
            conn = conn.with_database(dbname.clone());
        }
        conn.connect().await?;
        Ok(Box::new(conn))
    }
}

/// Builder for scripted responses.
pub struct ResponseBuilder {
    columns: Vec<(String, String)>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Sets the response columns as (name, native type) pairs.
    pub fn columns(mut self, cols: &[(&str, &str)]) -> Self {
        self.columns = cols
            .iter()
            .map(|(name, native)| (name.to_string(), native.to_string()))
            .collect();
        self
    }

    /// Adds a row of wire values, `None` for SQL NULL.
    pub fn row(mut self, values: &[Option<&str>]) -> Self {
        self.rows
            .push(values.iter().map(|v| v.map(str::to_string)).collect());
        self
    }

    pub fn build(self) -> ResultSet {
        let columns = metadata::map_columns(
            self.columns
                .into_iter()
                .map(|(name, native)| (name, native, true)),
            &Default::default(),
        );
        ResultSet::new(
            self.rows,
            Schema::new(vec![], columns),
            TypeMap::outbound_defaults(),
        )
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
