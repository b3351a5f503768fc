//! Round trips against a live MySQL database.
//!
//! Run with `MYSQL_DATABASE_URL=mysql://... cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use assert_matches::assert_matches;
use chrono::{DateTime, TimeZone, Utc};
use table_gateway::{
    Adapter, AdapterConnection, Conditional, DatabaseConfig, Dto, Entity, GatewayError, Insert,
    OnConflict, Order, Row, Select, Statement, StatementKind, TableGateway, Value,
};
use table_gateway_mysql::MySqlAdapter;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "tg_it_note")]
struct Note {
    #[column(key)]
    note_id: String,
    author_id: Option<String>,
    title: String,
    pinned: bool,
    created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Dto)]
struct NoteWithAuthor {
    note_id: String,
    author_name: Option<String>,
}

static SCHEMA: OnceCell<()> = OnceCell::const_new();
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

async fn adapter() -> Arc<MySqlAdapter> {
    let config = DatabaseConfig::from_lookup(|key| match key {
        "DATABASE_URL" => std::env::var("MYSQL_DATABASE_URL").ok(),
        _ => None,
    })
    .expect("MYSQL_DATABASE_URL must point at MySQL");
    let adapter = MySqlAdapter::connect(config).await.expect("connect");
    SCHEMA
        .get_or_init(|| async {
            for ddl in [
                "CREATE TABLE IF NOT EXISTS tg_it_author (
                     author_id VARCHAR(64) PRIMARY KEY,
                     name VARCHAR(255) NOT NULL
                 )",
                "CREATE TABLE IF NOT EXISTS tg_it_note (
                     note_id VARCHAR(64) PRIMARY KEY,
                     author_id VARCHAR(64),
                     title VARCHAR(255) NOT NULL,
                     pinned BOOLEAN NOT NULL DEFAULT FALSE,
                     created_dt DATETIME(6) DEFAULT CURRENT_TIMESTAMP(6)
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

async fn single_value(adapter: &dyn Adapter, sql: &str) -> Result<Value, GatewayError> {
    let statement = Statement {
        sql: sql.to_string(),
        params: Vec::new(),
        kind: StatementKind::Select,
        returning: false,
    };
    let mut result = adapter.query(&statement).await?;
    let row = result.rows.remove(0);
    Ok(row.get("v").cloned().unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore] // Requires MYSQL_DATABASE_URL
async fn decimal_columns_are_rejected() {
    let adapter = adapter().await;

    assert_matches!(
        single_value(adapter.as_ref(), "SELECT CAST(1.5 AS DECIMAL(4, 2)) AS v").await,
        Err(GatewayError::ColumnType { found: "DECIMAL", .. })
    );
    assert_eq!(
        single_value(adapter.as_ref(), "SELECT CAST(SUM(2) AS SIGNED) AS v")
            .await
            .unwrap(),
        Value::Int(2)
    );
}

#[tokio::test]
#[ignore] // Requires MYSQL_DATABASE_URL
async fn json_reads_as_text_and_datetimes_as_utc() {
    let adapter = adapter().await;

    let json = single_value(adapter.as_ref(), r#"SELECT CAST('{"a": 1}' AS JSON) AS v"#)
        .await
        .unwrap();
    assert_eq!(json, Value::from(r#"{"a":1}"#));

    let at = single_value(
        adapter.as_ref(),
        "SELECT CAST('2024-03-01 10:00:00' AS DATETIME) AS v",
    )
    .await
    .unwrap();
    assert_eq!(
        at,
        Value::Datetime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
}

#[tokio::test]
#[ignore] // Requires MYSQL_DATABASE_URL
async fn inserted_rows_are_read_back_by_key() {
    let adapter = adapter().await;
    let notes = TableGateway::<Note>::new(adapter.clone());
    let note_id = unique("note");

    let inserted = notes
        .insert(
            Row::new()
                .with("note_id", note_id.as_str())
                .with("title", "Hello")
                .with("created_dt", Value::Null),
        )
        .await
        .unwrap()
        .unwrap();

    assert!(!inserted.pinned);
    assert!(inserted.created_dt.is_some());
    assert_eq!(notes.fetch_by_id(note_id.as_str()).await.unwrap(), Some(inserted));
}

#[tokio::test]
#[ignore] // Requires MYSQL_DATABASE_URL
async fn duplicate_inserts_are_ignored() {
    let adapter = adapter().await;
    let note_id = unique("dup");
    let insert = || {
        Insert::into_table(Note::TABLE)
            .set(Row::new().with("note_id", note_id.as_str()).with("title", "Once"))
            .on_conflict(OnConflict::DoNothing)
    };

    assert!(insert().execute(adapter.as_ref()).await.unwrap().success());
    assert!(!insert().execute(adapter.as_ref()).await.unwrap().success());
}

#[tokio::test]
#[ignore] // Requires MYSQL_DATABASE_URL
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
        .from_as("n", Note::TABLE, [("note_id", "n.note_id")])
        .columns([("author_name", "a.name")])
        .join_left("a", "tg_it_author", "a.author_id = n.author_id")
        .eq("n.note_id", note_id.as_str())
        .order("n.note_id", Order::Asc);
    let found: Vec<NoteWithAuthor> = notes.fetch_projection(select).await.unwrap();

    assert_eq!(
        found,
        vec![NoteWithAuthor {
            note_id,
            author_name: None,
        }]
    );
}
