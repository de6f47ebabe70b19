use dbridge::error::DriverError;
use dbridge::{
    Connection, ConnectParams, Driver, InMemoryConnection, InMemoryDriver, ResponseBuilder,
    SqlValue, Statement,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn connected() -> InMemoryConnection {
    init_tracing();
    let conn = InMemoryConnection::new();
    conn.connect().await.unwrap();
    conn
}

#[tokio::test]
async fn ping_on_fresh_adapter_transparently_connects() {
    let conn = InMemoryConnection::new();

    // no connect() beforehand: ping establishes the session itself
    conn.ping().await.unwrap();

    // the session it opened is usable afterwards
    conn.execute("SELECT 1", &[]).await.unwrap();
    conn.assert_query_count(2);
}

#[tokio::test]
async fn ping_after_disconnect_is_disconnected() {
    let conn = connected().await;
    conn.disconnect().await.unwrap();

    let err = conn.ping().await.unwrap_err();
    assert!(matches!(err, DriverError::Disconnected(_)));
}

#[tokio::test]
async fn disconnect_twice_is_a_no_op() {
    let conn = connected().await;
    conn.disconnect().await.unwrap();
    conn.disconnect().await.unwrap();
}

#[tokio::test]
async fn execute_translates_placeholders_and_records_binds() {
    let conn = connected().await;

    conn.execute(
        "INSERT INTO t (a, b) VALUES (?, ?)",
        &[SqlValue::from("x"), SqlValue::from(7i64)],
    )
    .await
    .unwrap();

    conn.assert_last_query(
        "INSERT INTO t (a, b) VALUES ($1, $2)",
        &[SqlValue::Text("x".to_string()), SqlValue::Int64(7)],
    );
    assert_eq!(
        conn.last_query().as_deref(),
        Some("INSERT INTO t (a, b) VALUES ($1, $2)")
    );
}

#[tokio::test]
async fn nested_begin_is_rejected() {
    let conn = connected().await;

    conn.begin().await.unwrap();
    let err = conn.begin().await.unwrap_err();
    assert!(matches!(err, DriverError::Transaction(_)));
    // the open transaction is unaffected
    assert!(conn.in_transaction());
}

#[tokio::test]
async fn commit_and_rollback_require_an_open_transaction() {
    let conn = connected().await;

    assert!(matches!(
        conn.commit().await,
        Err(DriverError::Transaction(_))
    ));
    assert!(matches!(
        conn.rollback().await,
        Err(DriverError::Transaction(_))
    ));
    // nothing reached the engine
    conn.assert_query_count(0);
}

#[tokio::test]
async fn begin_commit_round_trip_clears_flag_and_issues_statements() {
    let conn = connected().await;

    conn.begin().await.unwrap();
    assert!(conn.in_transaction());
    conn.commit().await.unwrap();
    assert!(!conn.in_transaction());

    let queries: Vec<String> = conn.recorded_queries().into_iter().map(|q| q.sql).collect();
    assert_eq!(queries, vec!["BEGIN".to_string(), "COMMIT".to_string()]);
}

#[tokio::test]
async fn failed_commit_leaves_transaction_open() {
    let conn = connected().await;

    conn.begin().await.unwrap();
    conn.disconnect().await.unwrap();

    // COMMIT never reaches the engine, so the transaction is still live
    let err = conn.commit().await.unwrap_err();
    assert!(matches!(err, DriverError::Disconnected(_)));
    assert!(conn.in_transaction());

    // a recovery rollback still passes the local state check
    let err = conn.rollback().await.unwrap_err();
    assert!(matches!(err, DriverError::Disconnected(_)));
    assert!(conn.in_transaction());
}

#[tokio::test]
async fn rollback_clears_flag() {
    let conn = connected().await;

    conn.begin().await.unwrap();
    for i in 0..5 {
        conn.execute("INSERT INTO t (n) VALUES (?)", &[SqlValue::Int32(i)])
            .await
            .unwrap();
    }
    conn.rollback().await.unwrap();
    assert!(!conn.in_transaction());

    let queries = conn.recorded_queries();
    assert_eq!(queries.len(), 7);
    assert_eq!(queries.last().unwrap().sql, "ROLLBACK");
}

#[tokio::test]
async fn finished_statement_refuses_execution() {
    let conn = connected().await;

    let stmt = conn
        .prepare("SELECT * FROM t WHERE id = ?")
        .await
        .unwrap();
    stmt.execute(&[SqlValue::Int32(1)]).await.unwrap();

    stmt.finish().await.unwrap();
    // finish is idempotent
    stmt.finish().await.unwrap();

    let err = stmt.execute(&[SqlValue::Int32(2)]).await.unwrap_err();
    assert!(matches!(err, DriverError::StatementFinished));
}

#[tokio::test]
async fn statement_names_are_unique_per_connection() {
    let conn = connected().await;

    let a = conn.prepare("SELECT 1").await.unwrap();
    let b = conn.prepare("SELECT 2").await.unwrap();
    assert_ne!(a.name(), b.name());
}

#[tokio::test]
async fn prepared_statement_executes_translated_query() {
    let conn = connected().await;

    let stmt = conn
        .prepare("SELECT a FROM t WHERE b = ? AND c = ?")
        .await
        .unwrap();
    stmt.execute(&[SqlValue::from("x"), SqlValue::from(true)])
        .await
        .unwrap();

    conn.assert_last_query(
        "SELECT a FROM t WHERE b = $1 AND c = $2",
        &[SqlValue::Text("x".to_string()), SqlValue::Bool(true)],
    );
}

#[tokio::test]
async fn preprocess_query_inlines_escaped_binds() {
    let conn = connected().await;

    let sql = conn
        .preprocess_query(
            "SELECT * FROM t WHERE name = ?",
            &[SqlValue::from("O'Brien")],
        )
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE name = 'O''Brien'");
    assert_eq!(conn.last_query().as_deref(), Some(sql.as_str()));
}

#[tokio::test]
async fn describe_table_maps_catalog_rows() {
    let conn = connected().await;
    let conn = conn
        .with_response(
            // classification
            ResponseBuilder::new()
                .columns(&[("table_type", "text")])
                .row(&[Some("BASE TABLE")])
                .build(),
        )
        .with_response(
            // column triples in ordinal order
            ResponseBuilder::new()
                .columns(&[
                    ("column_name", "text"),
                    ("data_type", "text"),
                    ("is_nullable", "text"),
                ])
                .row(&[Some("bar"), Some("integer"), Some("YES")])
                .build(),
        );

    let schema = conn.describe_table("foo", "public").await.unwrap();

    assert_eq!(schema.tables, vec!["foo".to_string()]);
    assert_eq!(schema.columns.len(), 1);
    let col = &schema.columns[0];
    assert_eq!(col.name, "bar");
    assert_eq!(col.native_type, "integer");
    assert_eq!(col.portable_type, "integer");
    assert!(col.nullable);

    // both catalog queries carried the namespace and table as binds
    let queries = conn.recorded_queries();
    assert_eq!(queries.len(), 2);
    for q in &queries {
        assert!(q.sql.contains("$1"));
        assert_eq!(
            q.binds,
            vec![
                SqlValue::Text("public".to_string()),
                SqlValue::Text("foo".to_string())
            ]
        );
    }
}

#[tokio::test]
async fn describe_missing_table_is_not_found() {
    let conn = connected().await;
    let conn = conn.with_response(
        // classification query finds nothing
        ResponseBuilder::new()
            .columns(&[("table_type", "text")])
            .build(),
    );

    let err = conn.describe_table("absent", "public").await.unwrap_err();
    assert!(matches!(err, DriverError::NotFound(_)));
    // only the classification query ran
    conn.assert_query_count(1);
}

#[tokio::test]
async fn list_schema_describes_each_table_in_catalog_order() {
    let conn = connected().await;
    let classify = || {
        ResponseBuilder::new()
            .columns(&[("table_type", "text")])
            .row(&[Some("BASE TABLE")])
            .build()
    };
    let columns_for = |name: &str| {
        ResponseBuilder::new()
            .columns(&[
                ("column_name", "text"),
                ("data_type", "text"),
                ("is_nullable", "text"),
            ])
            .row(&[Some(name), Some("text"), Some("NO")])
            .build()
    };
    let conn = conn.with_responses([
        ResponseBuilder::new()
            .columns(&[("table_name", "text")])
            .row(&[Some("alpha")])
            .row(&[Some("beta")])
            .build(),
        classify(),
        columns_for("a"),
        classify(),
        columns_for("b"),
    ]);

    let schemas = conn.list_schema("public").await.unwrap();

    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas[0].tables, vec!["alpha".to_string()]);
    assert_eq!(schemas[1].tables, vec!["beta".to_string()]);
    assert_eq!(schemas[0].columns[0].name, "a");
    assert!(!schemas[0].columns[0].nullable);
}

#[tokio::test]
async fn timestamp_columns_report_portable_timestamp_tag() {
    let conn = connected().await;
    let conn = conn.with_response(
        ResponseBuilder::new()
            .columns(&[
                ("naive", "timestamp without time zone"),
                ("aware", "timestamp with time zone"),
            ])
            .row(&[
                Some("2024-05-01 12:00:00 +0000"),
                Some("2024-05-01 12:00:00 +0000"),
            ])
            .build(),
    );

    let result = conn.execute("SELECT naive, aware FROM t", &[]).await.unwrap();
    for col in &result.schema.columns {
        assert_eq!(col.portable_type, "timestamp");
    }
}

#[tokio::test]
async fn typed_values_flow_through_the_type_map() {
    let conn = connected().await;
    let conn = conn.with_response(
        ResponseBuilder::new()
            .columns(&[("id", "integer"), ("active", "boolean"), ("note", "text")])
            .row(&[Some("42"), Some("t"), None])
            .build(),
    );

    let result = conn.execute("SELECT * FROM t", &[]).await.unwrap();
    let row = result.row(0).unwrap();
    assert_eq!(row.typed_get("id").unwrap(), SqlValue::Int64(42));
    assert_eq!(row.typed_get("active").unwrap(), SqlValue::Bool(true));
    assert_eq!(row.typed_get("note").unwrap(), SqlValue::Null);
}

#[tokio::test]
async fn empty_namespace_falls_back_to_public() {
    let conn = connected().await;
    let conn = conn.with_response(
        ResponseBuilder::new()
            .columns(&[("table_type", "text")])
            .build(),
    );

    // missing table, but the recorded binds show the resolved namespace
    let _ = conn.describe_table("foo", "").await;
    conn.assert_last_query(
        "SELECT table_type FROM information_schema.tables \
         WHERE table_schema = $1 AND table_name = $2",
        &[
            SqlValue::Text("public".to_string()),
            SqlValue::Text("foo".to_string()),
        ],
    );
}

#[tokio::test]
async fn driver_opens_a_connected_adapter() {
    let driver = InMemoryDriver;
    assert_eq!(driver.name(), "in-memory");

    let conn = driver.open(&ConnectParams::new()).await.unwrap();
    conn.ping().await.unwrap();
    conn.execute("SELECT 1", &[]).await.unwrap();
}

#[tokio::test]
async fn driver_open_resolves_database_name() {
    let params = ConnectParams::new().dbname("app");
    let conn = InMemoryDriver.open(&params).await.unwrap();
    assert_eq!(conn.database_name().as_deref(), Some("app"));
}
