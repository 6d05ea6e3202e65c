// SPDX-License-Identifier: Apache-2.0

//! Reads and writes of the catalog tables on the session connection.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteConnection;

use litefed_core::{WorkspaceError, WorkspaceResult};

use crate::catalog::CatalogEntry;
use crate::engine::sqlite::engine_error;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS main.dbs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    root TEXT NOT NULL,
    app_created BOOLEAN NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(name, root)
);
CREATE TABLE IF NOT EXISTS main.current_db (
    id INTEGER PRIMARY KEY,
    current_db TEXT
);
"#;

const SELECT_ENTRY: &str =
    "SELECT id, name, path, root, app_created, created_at FROM main.dbs";

type EntryRow = (i64, String, String, String, bool, NaiveDateTime);

fn to_entry(row: EntryRow) -> CatalogEntry {
    let (id, name, path, root, app_created, created_at) = row;
    CatalogEntry {
        id,
        name,
        path: PathBuf::from(path),
        root,
        app_created,
        created_at,
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub async fn ensure_schema(conn: &mut SqliteConnection) -> WorkspaceResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, SCHEMA))?;
    Ok(())
}

/// Returns true when a row was written, false when a uniqueness rule ignored it.
pub async fn insert_or_ignore(
    conn: &mut SqliteConnection,
    name: &str,
    path: &Path,
    root: &str,
    app_created: bool,
) -> WorkspaceResult<bool> {
    let sql = "INSERT OR IGNORE INTO main.dbs (name, path, root, app_created) VALUES (?1, ?2, ?3, ?4)";
    let result = sqlx::query(sql)
        .bind(name)
        .bind(path_key(path))
        .bind(root)
        .bind(app_created)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_entry(conn: &mut SqliteConnection, name: &str, root: &str) -> WorkspaceResult<u64> {
    let sql = "DELETE FROM main.dbs WHERE name = ?1 AND root = ?2";
    let result = sqlx::query(sql)
        .bind(name)
        .bind(root)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    Ok(result.rows_affected())
}

pub async fn list_for_root(conn: &mut SqliteConnection, root: &str) -> WorkspaceResult<Vec<CatalogEntry>> {
    let sql = format!("{} WHERE root = ?1 ORDER BY id", SELECT_ENTRY);
    let rows: Vec<EntryRow> = sqlx::query_as(&sql)
        .bind(root)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(rows.into_iter().map(to_entry).collect())
}

pub async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
    root: &str,
) -> WorkspaceResult<Option<CatalogEntry>> {
    let sql = format!("{} WHERE name = ?1 AND root = ?2", SELECT_ENTRY);
    let rows: Vec<EntryRow> = sqlx::query_as(&sql)
        .bind(name)
        .bind(root)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(rows.into_iter().next().map(to_entry))
}

pub async fn find_by_path(conn: &mut SqliteConnection, path: &Path) -> WorkspaceResult<Option<CatalogEntry>> {
    let sql = format!("{} WHERE path = ?1", SELECT_ENTRY);
    let rows: Vec<EntryRow> = sqlx::query_as(&sql)
        .bind(path_key(path))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, &sql))?;
    Ok(rows.into_iter().next().map(to_entry))
}

pub async fn set_current(conn: &mut SqliteConnection, name: &str) -> WorkspaceResult<()> {
    if name.trim().is_empty() {
        return Err(WorkspaceError::validation("Current database name is required"));
    }
    let sql = "INSERT INTO main.current_db (id, current_db) VALUES (1, ?1)
        ON CONFLICT(id) DO UPDATE SET current_db = excluded.current_db";
    sqlx::query(sql)
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    Ok(())
}

pub async fn get_current(conn: &mut SqliteConnection) -> WorkspaceResult<Option<String>> {
    let sql = "SELECT current_db FROM main.current_db WHERE id = 1";
    let rows: Vec<Option<String>> = sqlx::query_scalar(sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    Ok(rows
        .into_iter()
        .next()
        .flatten()
        .filter(|name| !name.is_empty()))
}

pub async fn clear_current(conn: &mut SqliteConnection) -> WorkspaceResult<()> {
    let sql = "DELETE FROM main.current_db WHERE id = 1";
    sqlx::query(sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| engine_error(e, sql))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sqlite::open_primary;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, SqliteConnection) {
        let dir = tempdir().unwrap();
        let mut conn = open_primary(&dir.path().join("primary.db")).await.unwrap();
        ensure_schema(&mut conn).await.unwrap();
        (dir, conn)
    }

    #[tokio::test]
    async fn insert_or_ignore_enforces_both_uniqueness_rules() {
        let (_dir, mut conn) = setup().await;
        let a = Path::new("/data/a.db");

        assert!(insert_or_ignore(&mut conn, "a", a, "main", true).await.unwrap());
        // same name, same root
        assert!(!insert_or_ignore(&mut conn, "a", Path::new("/data/b.db"), "main", false)
            .await
            .unwrap());
        // same path, other root
        assert!(!insert_or_ignore(&mut conn, "x", a, "/other", false).await.unwrap());
        // same name, other root
        assert!(insert_or_ignore(&mut conn, "a", Path::new("/other/a.db"), "/other", false)
            .await
            .unwrap());

        let main = list_for_root(&mut conn, "main").await.unwrap();
        assert_eq!(main.len(), 1);
        assert!(main[0].app_created);
        assert_eq!(main[0].path, PathBuf::from("/data/a.db"));
        assert_eq!(list_for_root(&mut conn, "/other").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookups_and_delete() {
        let (_dir, mut conn) = setup().await;
        insert_or_ignore(&mut conn, "sales", Path::new("/d/sales.db"), "/d", false)
            .await
            .unwrap();

        let by_name = find_by_name(&mut conn, "sales", "/d").await.unwrap().unwrap();
        let by_path = find_by_path(&mut conn, Path::new("/d/sales.db")).await.unwrap().unwrap();
        assert_eq!(by_name, by_path);
        assert!(find_by_name(&mut conn, "sales", "main").await.unwrap().is_none());

        assert_eq!(delete_entry(&mut conn, "sales", "/d").await.unwrap(), 1);
        assert_eq!(delete_entry(&mut conn, "sales", "/d").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn current_pointer_is_a_single_row() {
        let (_dir, mut conn) = setup().await;
        assert_eq!(get_current(&mut conn).await.unwrap(), None);

        set_current(&mut conn, "orders").await.unwrap();
        set_current(&mut conn, "sales").await.unwrap();
        assert_eq!(get_current(&mut conn).await.unwrap().as_deref(), Some("sales"));

        assert!(matches!(
            set_current(&mut conn, "  ").await,
            Err(WorkspaceError::Validation { .. })
        ));
        assert_eq!(get_current(&mut conn).await.unwrap().as_deref(), Some("sales"));

        clear_current(&mut conn).await.unwrap();
        assert_eq!(get_current(&mut conn).await.unwrap(), None);
    }
}
