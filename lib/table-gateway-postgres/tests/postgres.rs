//! Round trips against a live PostgreSQL database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use assert_matches::assert_matches;
use chrono::{DateTime, TimeZone, Utc};
use table_gateway::{
    Adapter, AdapterConnection, Conditional, DatabaseConfig, Dto, Entity, GatewayError, Order,
    Row, Select, Statement, StatementKind, TableGateway, Value,
};
use table_gateway_postgres::PgAdapter;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "tg_it_note")]
struct Note {
    #[column(key)]
    note_id: String,
    author_id: Option<String>,
    title: String,
    likes: Option<i64>,
    created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Dto)]
struct NoteWithAuthor {
    note_id: String,
    title: String,
    author_name: Option<String>,
}

static SCHEMA: OnceCell<()> = OnceCell::const_new();
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

async fn adapter() -> Arc<PgAdapter> {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL must point at PostgreSQL");
    let adapter = PgAdapter::connect(config).await.expect("connect");
    SCHEMA
        .get_or_init(|| async {
            for ddl in [
                "CREATE TABLE IF NOT EXISTS tg_it_author (
                     author_id TEXT PRIMARY KEY,
                     name TEXT NOT NULL
                 )",
                "CREATE TABLE IF NOT EXISTS tg_it_note (
                     note_id TEXT PRIMARY KEY,
                     author_id TEXT,
                     title TEXT NOT NULL,
                     likes BIGINT,
                     created_dt TIMESTAMPTZ DEFAULT now()
                 )",
            ] {
                sqlx::query(ddl).execute(adapter.inner()).await.expect("schema");
            }
        })
        .await;
    Arc::new(adapter)
}

fn unique(prefix: &str) -> String {
    let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}", Utc::now().timestamp_micros())
}

fn select(sql: &str) -> Statement {
    Statement {
        sql: sql.to_string(),
        params: Vec::new(),
        kind: StatementKind::Select,
        returning: false,
    }
}

async fn single_value(adapter: &dyn Adapter, sql: &str) -> Result<Value, GatewayError> {
    let mut result = adapter.query(&select(sql)).await?;
    let row = result.rows.remove(0);
    Ok(row.get("v").cloned().unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn numeric_columns_are_rejected() {
    let adapter = adapter().await;

    assert_matches!(
        single_value(adapter.as_ref(), "SELECT 1.50::numeric AS v").await,
        Err(GatewayError::ColumnType { column, found: "NUMERIC", .. }) if column == "v"
    );
    assert_eq!(
        single_value(adapter.as_ref(), "SELECT SUM(x)::bigint AS v FROM (VALUES (1), (2)) t (x)")
            .await
            .unwrap(),
        Value::Int(3)
    );
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn uuid_and_json_read_as_text() {
    let adapter = adapter().await;

    let id = single_value(
        adapter.as_ref(),
        "SELECT '0190a4c2-7d1e-7000-8000-000000000001'::uuid AS v",
    )
    .await
    .unwrap();
    assert_eq!(id, Value::from("0190a4c2-7d1e-7000-8000-000000000001"));

    let json = single_value(adapter.as_ref(), r#"SELECT '{"a": 1}'::jsonb AS v"#)
        .await
        .unwrap();
    assert_eq!(json, Value::from(r#"{"a":1}"#));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn naive_timestamps_read_as_utc() {
    let adapter = adapter().await;

    let at = single_value(adapter.as_ref(), "SELECT TIMESTAMP '2024-03-01 10:00:00' AS v")
        .await
        .unwrap();

    assert_eq!(
        at,
        Value::Datetime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn inserted_rows_read_back_by_id() {
    let adapter = adapter().await;
    let notes = TableGateway::<Note>::new(adapter.clone());
    let note_id = unique("note");

    let inserted = notes
        .insert(
            Row::new()
                .with("note_id", note_id.as_str())
                .with("title", "Hello")
                .with("author_id", Value::Null)
                .with("created_dt", Value::Null),
        )
        .await
        .unwrap()
        .unwrap();

    // NULL columns are left out, so the column default applies
    assert!(inserted.created_dt.is_some());
    assert_eq!(inserted.likes, None);
    assert_eq!(notes.fetch_by_id(note_id.as_str()).await.unwrap(), Some(inserted));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn left_joined_nulls_hydrate_as_none() {
    let adapter = adapter().await;
    let notes = TableGateway::<Note>::new(adapter.clone());
    let note_id = unique("orphan");
    notes
        .insert(
            Row::new()
                .with("note_id", note_id.as_str())
                .with("author_id", unique("missing"))
                .with("title", "Orphan"),
        )
        .await
        .unwrap();

    let select = Select::new()
        .from_as(
            "n",
            Note::TABLE,
            [("note_id", "n.note_id"), ("title", "n.title")],
        )
        .columns([("author_name", "a.name")])
        .join_left("a", "tg_it_author", "a.author_id = n.author_id")
        .eq("n.note_id", note_id.as_str())
        .order("n.note_id", Order::Asc);
    let found: Vec<NoteWithAuthor> = notes.fetch_projection(select).await.unwrap();

    assert_eq!(
        found,
        vec![NoteWithAuthor {
            note_id,
            title: "Orphan".to_string(),
            author_name: None,
        }]
    );
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn committed_transactions_are_visible() {
    let adapter = adapter().await;
    let tx = Arc::new(adapter.begin().await.unwrap());
    let note_id = unique("committed");

    TableGateway::<Note>::new(tx.clone())
        .insert(Row::new().with("note_id", note_id.as_str()).with("title", "Kept"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let notes = TableGateway::<Note>::new(adapter.clone());
    assert!(notes.fetch_by_id(note_id.as_str()).await.unwrap().is_some());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn rolled_back_transactions_leave_nothing() {
    let adapter = adapter().await;
    let tx = Arc::new(adapter.begin().await.unwrap());
    let note_id = unique("rolled-back");

    TableGateway::<Note>::new(tx.clone())
        .insert(Row::new().with("note_id", note_id.as_str()).with("title", "Gone"))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let notes = TableGateway::<Note>::new(adapter.clone());
    assert_eq!(notes.fetch_by_id(note_id.as_str()).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn finished_transactions_refuse_statements() {
    let adapter = adapter().await;
    let tx = adapter.begin().await.unwrap();
    tx.commit().await.unwrap();

    assert_matches!(
        tx.query(&select("SELECT 1 AS v")).await,
        Err(GatewayError::Configuration(message)) if message.contains("already committed")
    );
    assert_matches!(tx.rollback().await, Err(GatewayError::Configuration(_)));
}
