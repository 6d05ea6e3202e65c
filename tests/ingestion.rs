use std::fs;

use litefed_lib::config::AppConfig;
use litefed_lib::engine::JournalMode;
use litefed_lib::ingest::IngestOptions;
use litefed_lib::session::WorkspaceSession;
use litefed_lib::{Dataframe, Record, Value, WorkspaceError};

async fn session(dir: &tempfile::TempDir) -> WorkspaceSession {
    WorkspaceSession::open(AppConfig::with_data_dir(dir.path().join("data")))
        .await
        .unwrap()
}

async fn select(session: &mut WorkspaceSession, sql: &str) -> Vec<Vec<Value>> {
    let outcome = session.run_query(sql, false).await.unwrap();
    outcome
        .rows()
        .unwrap()
        .rows
        .iter()
        .map(|row| row.values.clone())
        .collect()
}

#[tokio::test]
async fn csv_upload_builds_typed_table() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("users.csv");
    fs::write(&csv, "id,name,score\n1,Alice,9.5\n2,Bob,7\n").unwrap();

    let mut session = session(&dir).await;
    let summary = session.upload_data_file(&csv).await.unwrap();
    assert_eq!(summary.database.name, "users");
    assert!(summary.database.app_created);
    assert_eq!(summary.tables, vec![("users".to_string(), 2)]);

    let types = select(
        &mut session,
        "SELECT name, type FROM pragma_table_info('users', 'users') ORDER BY cid",
    )
    .await;
    assert_eq!(
        types,
        vec![
            vec![Value::from("id"), Value::from("INTEGER")],
            vec![Value::from("name"), Value::from("TEXT")],
            vec![Value::from("score"), Value::from("REAL")],
        ]
    );

    let rows = select(&mut session, "SELECT id, name, score FROM users.users ORDER BY id").await;
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(1), Value::from("Alice"), Value::Float(9.5)],
            vec![Value::Int(2), Value::from("Bob"), Value::Float(7.0)],
        ]
    );
}

#[tokio::test]
async fn json_upload_encodes_composite_cells() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("crm.json");
    fs::write(
        &json,
        r#"{
            "people": [
                {"id": 1, "tags": ["a", "b"], "meta": {"k": 1}},
                {"id": 2, "tags": [], "meta": null}
            ],
            "notes": [{"body": "hello"}]
        }"#,
    )
    .unwrap();

    let mut session = session(&dir).await;
    let summary = session.upload_data_file(&json).await.unwrap();
    assert_eq!(
        summary.tables,
        vec![("people".to_string(), 2), ("notes".to_string(), 1)]
    );

    let rows = select(&mut session, "SELECT id, tags, meta FROM crm.people ORDER BY id").await;
    assert_eq!(rows[0], vec![Value::Int(1), Value::from(r#"["a","b"]"#), Value::from(r#"{"k":1}"#)]);
    assert_eq!(rows[1], vec![Value::Int(2), Value::from("[]"), Value::Null]);

    let decoded: serde_json::Value = match &rows[0][1] {
        Value::Text(text) => serde_json::from_str(text).unwrap(),
        other => panic!("expected text, got {other:?}"),
    };
    assert_eq!(decoded, serde_json::json!(["a", "b"]));
}

#[tokio::test]
async fn top_level_json_array_is_named_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("Readings.json");
    fs::write(&json, r#"[{"t": 1.5, "ok": true}, 3, {"t": 2.0, "ok": false}]"#).unwrap();

    let mut session = session(&dir).await;
    let summary = session.upload_data_file(&json).await.unwrap();
    assert_eq!(summary.database.name, "readings");
    assert_eq!(summary.tables, vec![("readings".to_string(), 2)]);

    let rows = select(&mut session, "SELECT t, ok FROM readings.readings").await;
    assert_eq!(rows[0], vec![Value::Float(1.5), Value::Int(1)]);
}

#[tokio::test]
async fn sql_upload_runs_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("seed.sql");
    fs::write(
        &script,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);\nINSERT INTO t (v) VALUES ('a');\nINSERT INTO t (v) VALUES ('b');\n",
    )
    .unwrap();

    let mut session = session(&dir).await;
    let summary = session.upload_data_file(&script).await.unwrap();
    assert!(summary.tables.is_empty());
    assert!(summary.script_rows.is_some());

    let rows = select(&mut session, "SELECT count(*) FROM seed.t").await;
    assert_eq!(rows, vec![vec![Value::Int(2)]]);
}

#[tokio::test]
async fn failed_upload_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bad.sql");
    fs::write(&script, "CREATE TABLE t (x);\nNOT VALID SQL;").unwrap();

    let mut session = session(&dir).await;
    let err = session.upload_data_file(&script).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Engine { .. }));
    assert!(!session.config().databases_dir().join("bad.db").exists());
    assert!(session.catalog_entries().await.unwrap().is_empty());

    let text = dir.path().join("notes.txt");
    fs::write(&text, "x").unwrap();
    assert!(matches!(
        session.upload_data_file(&text).await,
        Err(WorkspaceError::Validation { .. })
    ));
}

#[tokio::test]
async fn upload_name_collision_is_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("sales.csv");
    fs::write(&csv, "a\n1\n").unwrap();

    let mut session = session(&dir).await;
    session.create_database("sales", JournalMode::Delete).await.unwrap();
    let err = session.upload_data_file(&csv).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::DuplicateName { .. }));
    assert!(!session.config().databases_dir().join("sales_2.db").exists());
}

#[tokio::test]
async fn dataframe_round_trip_into_attached_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;
    session.create_database("lab", JournalMode::Delete).await.unwrap();

    let df = Dataframe::from_rows(vec![
        Record::new()
            .with("id", 1i64)
            .with("label", "first")
            .with("ratio", 0.25)
            .with("flag", true),
        Record::new().with("id", 2i64).with("label", "second"),
    ]);
    let written = session
        .ingest_dataframe("lab", "samples", &df, IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(written, 2);

    let rows = select(&mut session, "SELECT id, label, ratio, flag FROM lab.samples ORDER BY id").await;
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(1), Value::from("first"), Value::Float(0.25), Value::Int(1)],
            vec![Value::Int(2), Value::from("second"), Value::Null, Value::Null],
        ]
    );
}

#[tokio::test]
async fn null_first_row_fails_without_ddl() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;
    session.create_database("lab", JournalMode::Delete).await.unwrap();

    let df = Dataframe::from_rows(vec![
        Record::new().with("a", Value::Null).with("b", Value::Null),
        Record::new().with("a", 1i64),
    ]);
    let err = session
        .ingest_dataframe("lab", "empty_schema", &df, IngestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::NoSchema { .. }));

    let tree = session.list_tables().await.unwrap();
    assert!(tree["lab"].is_empty());

    let err = session
        .ingest_dataframe("lab", "t", &Dataframe::new(), IngestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::EmptyInput { .. }));
}

#[tokio::test]
async fn strict_ingest_rolls_back_and_keeps_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;
    session.create_database("lab", JournalMode::Delete).await.unwrap();

    let good = Dataframe::from_rows(vec![Record::new().with("id", 1i64).with("v", "keep")]);
    session
        .ingest_dataframe("lab", "t", &good, IngestOptions::default())
        .await
        .unwrap();

    let bad = Dataframe::from_rows(vec![
        Record::new().with("id", 10i64).with("v", "x"),
        Record::new().with("id", 11i64),
    ]);
    let err = session
        .ingest_dataframe("lab", "t", &bad, IngestOptions::strict())
        .await
        .unwrap_err();
    match err {
        WorkspaceError::MissingColumn { column, row } => {
            assert_eq!(column, "v");
            assert_eq!(row, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let rows = select(&mut session, "SELECT id, v FROM lab.t").await;
    assert_eq!(rows, vec![vec![Value::Int(1), Value::from("keep")]]);
}

#[tokio::test]
async fn ingest_requires_live_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;
    let df = Dataframe::from_rows(vec![Record::new().with("id", 1i64)]);
    assert!(matches!(
        session
            .ingest_dataframe("nowhere", "t", &df, IngestOptions::default())
            .await,
        Err(WorkspaceError::NotFound { .. })
    ));
}
