use std::fs;
use std::path::{Path, PathBuf};

use litefed_lib::catalog::WorkspaceRoot;
use litefed_lib::config::AppConfig;
use litefed_lib::engine::sqlite;
use litefed_lib::engine::JournalMode;
use litefed_lib::session::WorkspaceSession;
use litefed_lib::WorkspaceError;

async fn session(dir: &tempfile::TempDir) -> WorkspaceSession {
    WorkspaceSession::open(AppConfig::with_data_dir(dir.path().join("data")))
        .await
        .unwrap()
}

async fn make_sqlite(path: &Path, table: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut conn = sqlite::open_file(path).await.unwrap();
    sqlite::execute_script(
        &mut conn,
        &format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, v TEXT); INSERT INTO {table} (v) VALUES ('x');"),
    )
    .await
    .unwrap();
    sqlite::close(conn).await.unwrap();
}

fn db_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map(|e| e == "db").unwrap_or(false))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn create_database_attaches_and_catalogs() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    let entry = session.create_database("Sales.db", JournalMode::Delete).await.unwrap();
    assert_eq!(entry.name, "sales");
    assert!(entry.app_created);
    assert!(entry.path.is_file());
    assert_eq!(entry.root, "main");

    let live = session.live_databases().await.unwrap();
    assert!(live.iter().any(|db| db.name == "sales"));
    assert_eq!(session.catalog_entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_create_leaves_one_file_and_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    session.create_database("sales", JournalMode::Delete).await.unwrap();
    let err = session.create_database("sales", JournalMode::Delete).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::DuplicateName { .. }));

    let dbs_dir = session.config().databases_dir();
    let files = db_files(&dbs_dir);
    // the primary file plus sales.db
    assert_eq!(files.len(), 2, "{files:?}");
    assert_eq!(session.catalog_entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reserved_and_empty_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    for name in ["main", "TEMP", "  "] {
        let err = session.create_database(name, JournalMode::Delete).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation { .. }), "{name}: {err:?}");
    }
}

#[tokio::test]
async fn wal_journal_mode_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    session.create_database("events", JournalMode::Wal).await.unwrap();
    let outcome = session.run_query("PRAGMA events.journal_mode", false).await.unwrap();
    let rows = outcome.rows().unwrap();
    assert_eq!(rows.rows[0].values[0], litefed_lib::Value::Text("wal".into()));
}

#[tokio::test]
async fn remove_twice_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    let entry = session.create_database("scratch", JournalMode::Delete).await.unwrap();
    session.set_current_database("scratch").await.unwrap();

    session.remove_database("scratch").await.unwrap();
    assert!(!entry.path.exists());
    assert!(session.catalog_entries().await.unwrap().is_empty());
    assert!(!session
        .live_databases()
        .await
        .unwrap()
        .iter()
        .any(|db| db.name == "scratch"));
    // the pointer named the removed database
    assert!(matches!(
        session.get_current_database().await,
        Err(WorkspaceError::NotFound { .. })
    ));

    let err = session.remove_database("scratch").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::NotFound { .. }));
}

#[tokio::test]
async fn current_database_pointer_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    assert!(matches!(
        session.get_current_database().await,
        Err(WorkspaceError::NotFound { .. })
    ));

    session.create_database("a", JournalMode::Delete).await.unwrap();
    session.set_current_database("a").await.unwrap();

    let err = session.set_current_database("").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }));
    assert_eq!(session.get_current_database().await.unwrap(), "a");

    let err = session.set_current_database("ghost").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::NotFound { .. }));
    assert_eq!(session.get_current_database().await.unwrap(), "a");
}

#[tokio::test]
async fn directory_workspace_discovers_files_and_reopens_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    make_sqlite(&root.join("a/data.db"), "one").await;
    make_sqlite(&root.join("b/data.db"), "two").await;
    make_sqlite(&root.join("inventory.sqlite"), "items").await;
    fs::write(root.join("broken.db"), b"this is not a database").unwrap();

    let mut session = session(&dir).await;
    let summary = session
        .open_workspace(WorkspaceRoot::directory(&root).unwrap())
        .await
        .unwrap();

    let mut attached = summary.attached.clone();
    attached.sort();
    assert_eq!(attached, vec!["data", "data_2", "inventory"]);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].path.ends_with("broken.db"));

    let tree = session.list_tables().await.unwrap();
    assert_eq!(tree["data"], vec!["one"]);
    assert_eq!(tree["data_2"], vec!["two"]);

    let again = session
        .open_workspace(WorkspaceRoot::directory(&root).unwrap())
        .await
        .unwrap();
    let mut reattached = again.attached.clone();
    reattached.sort();
    assert_eq!(reattached, attached);
    assert!(again.discovered.is_empty());
    assert_eq!(session.catalog_entries().await.unwrap().len(), 3);
}

#[tokio::test]
async fn roots_are_scoped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(&root).unwrap();

    let mut session = session(&dir).await;
    session.create_database("private", JournalMode::Delete).await.unwrap();

    session
        .open_workspace(WorkspaceRoot::directory(&root).unwrap())
        .await
        .unwrap();
    let created = session.create_database("shared", JournalMode::Delete).await.unwrap();
    assert_eq!(created.path.parent().unwrap(), root.canonicalize().unwrap());

    let names: Vec<String> = session
        .live_databases()
        .await
        .unwrap()
        .into_iter()
        .map(|db| db.name)
        .collect();
    assert!(names.contains(&"shared".to_string()));
    assert!(!names.contains(&"private".to_string()));

    let summary = session.open_workspace(WorkspaceRoot::Main).await.unwrap();
    assert_eq!(summary.attached, vec!["private"]);
}

#[tokio::test]
async fn missing_cataloged_file_is_skipped_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    let entry = session.create_database("gone", JournalMode::Delete).await.unwrap();
    fs::remove_file(&entry.path).unwrap();

    let summary = session.open_workspace(WorkspaceRoot::Main).await.unwrap();
    assert!(summary.attached.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    // the row survives for a later reconciliation
    assert_eq!(session.catalog_entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_database_uses_file_name_and_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let external = dir.path().join("elsewhere/Customers.sqlite");
    make_sqlite(&external, "customers").await;

    let mut session = session(&dir).await;
    let entry = session.import_database(&external).await.unwrap();
    assert_eq!(entry.name, "customers");
    assert!(!entry.app_created);

    let again = session.import_database(&external).await.unwrap();
    assert_eq!(again.id, entry.id);
    assert_eq!(session.catalog_entries().await.unwrap().len(), 1);

    // removing an imported database deletes the file as well
    session.remove_database("customers").await.unwrap();
    assert!(!external.exists());
}

#[tokio::test]
async fn import_rejects_unknown_extensions_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(&dir).await;

    let text = dir.path().join("notes.txt");
    fs::write(&text, b"hi").unwrap();
    assert!(matches!(
        session.import_database(&text).await,
        Err(WorkspaceError::Validation { .. })
    ));
    assert!(matches!(
        session.import_database(&dir.path().join("missing.db")).await,
        Err(WorkspaceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn import_of_main_file_gets_safe_alias() {
    let dir = tempfile::tempdir().unwrap();
    let external = dir.path().join("other/main.db");
    make_sqlite(&external, "things").await;

    let mut session = session(&dir).await;
    let entry = session.import_database(&external).await.unwrap();
    assert_eq!(entry.name, "main_db");
}

#[tokio::test]
async fn refused_catalog_insert_rolls_back_the_attach() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(&root).unwrap();

    let mut session = session(&dir).await;
    let owned = session.create_database("owned", JournalMode::Delete).await.unwrap();
    session
        .open_workspace(WorkspaceRoot::directory(&root).unwrap())
        .await
        .unwrap();

    // the path is already cataloged under the main root
    let err = session
        .attach_and_catalog("again", &owned.path, false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::DuplicateName { .. }), "{err:?}");
    let live = session.live_databases().await.unwrap();
    assert!(live.iter().all(|db| db.name != "again"));
    assert!(owned.path.is_file());

    let err = session
        .attach_and_catalog("again", &owned.path, true)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::DuplicateName { .. }));
    assert!(session
        .live_databases()
        .await
        .unwrap()
        .iter()
        .all(|db| db.name != "again"));
    assert!(!owned.path.exists());
    assert!(session.catalog_entries().await.unwrap().is_empty());

    let summary = session.open_workspace(WorkspaceRoot::Main).await.unwrap();
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(session.catalog_entries().await.unwrap().len(), 1);
}
