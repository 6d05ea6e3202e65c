// SPDX-License-Identifier: Apache-2.0

//! The workspace session
//!
//! [`WorkspaceSession`] is the single writer of the live attachment set, the
//! catalog tables and the current-database pointer. Hosts that serve several
//! callers wrap it in a mutex (see `SharedState`).

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, error, info, instrument, warn};

use litefed_core::ident::{alias_from_path, is_database_file, is_reserved_schema, logical_name, with_suffix};
use litefed_core::{Dataframe, WorkspaceError, WorkspaceResult};

use crate::catalog::{is_bookkeeping_table, store, CatalogEntry, WorkspaceRoot};
use crate::config::AppConfig;
use crate::engine::sqlite::{self, JournalMode};
use crate::engine::types::{LiveDatabase, QueryOutcome};
use crate::export::{self, ExportSummary, ExportTarget};
use crate::gatekeeper::{self, CellUpdate};
use crate::ingest::{self, DataFile, DataFileKind, IngestOptions};
use crate::session::scan::discover_database_files;
use crate::session::{SkippedFile, UploadSummary, WorkspaceSummary};

const PRIMARY_SCHEMA: &str = "main";

pub struct WorkspaceSession {
    conn: SqliteConnection,
    config: AppConfig,
    root: WorkspaceRoot,
    primary_path: PathBuf,
}

impl WorkspaceSession {
    /// Opens the primary file, prepares the catalog and attaches the
    /// databases cataloged under the `main` root.
    #[instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub async fn open(config: AppConfig) -> WorkspaceResult<Self> {
        let primary_path = config.primary_path();
        let mut conn = sqlite::open_primary(&primary_path).await?;
        store::ensure_schema(&mut conn).await?;

        let primary_path = primary_path.canonicalize().unwrap_or(primary_path);
        let mut session = Self {
            conn,
            config,
            root: WorkspaceRoot::Main,
            primary_path,
        };
        session.open_workspace(WorkspaceRoot::Main).await?;

        info!(primary = %session.primary_path.display(), "Session opened");
        Ok(session)
    }

    pub async fn close(self) -> WorkspaceResult<()> {
        sqlite::close(self.conn).await
    }

    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary_path
    }

    // ==================== Workspace ====================

    /// Switches the active root: detach everything, re-attach the root's
    /// catalog entries, then attach any uncataloged database files found
    /// below a directory root. Per-file failures are logged and skipped.
    #[instrument(skip(self), fields(root = %root))]
    pub async fn open_workspace(&mut self, root: WorkspaceRoot) -> WorkspaceResult<WorkspaceSummary> {
        self.detach_all().await?;
        self.root = root;
        let root_key = self.root.key();

        let mut skipped = Vec::new();
        for entry in store::list_for_root(&mut self.conn, &root_key).await? {
            if !entry.path.is_file() {
                warn!(name = %entry.name, path = %entry.path.display(), "Cataloged file is missing");
                skipped.push(SkippedFile {
                    path: entry.path,
                    reason: "file not found".to_string(),
                });
                continue;
            }
            if let Err(e) = self.attach_live(&entry.name, &entry.path).await {
                warn!(name = %entry.name, error = %e, "Failed to re-attach cataloged database");
                skipped.push(SkippedFile {
                    path: entry.path,
                    reason: e.to_string(),
                });
            }
        }

        let mut discovered = Vec::new();
        if let Some(dir) = self.root.path().map(Path::to_path_buf) {
            let exclude = [self.primary_path.clone()];
            for path in discover_database_files(&dir, &exclude) {
                if store::find_by_path(&mut self.conn, &path).await?.is_some() {
                    continue;
                }
                match self.attach_with_fallback(&path, false).await {
                    Ok(entry) => discovered.push(entry.name),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping database file");
                        skipped.push(SkippedFile {
                            path,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let attached = self
            .live_databases()
            .await?
            .into_iter()
            .map(|db| db.name)
            .filter(|name| !is_reserved_schema(name))
            .collect();

        info!(
            discovered = discovered.len(),
            skipped = skipped.len(),
            "Workspace opened"
        );
        Ok(WorkspaceSummary {
            root: root_key,
            attached,
            discovered,
            skipped,
        })
    }

    /// Detaches every schema except `main` and `temp`.
    pub async fn detach_all(&mut self) -> WorkspaceResult<()> {
        for db in sqlite::database_list(&mut self.conn).await? {
            if is_reserved_schema(&db.name) {
                continue;
            }
            sqlite::detach(&mut self.conn, &db.name).await?;
            debug!(name = %db.name, "Detached");
        }
        Ok(())
    }

    pub async fn live_databases(&mut self) -> WorkspaceResult<Vec<LiveDatabase>> {
        sqlite::database_list(&mut self.conn).await
    }

    /// Database name to user table names, for every live schema.
    pub async fn list_tables(&mut self) -> WorkspaceResult<BTreeMap<String, Vec<String>>> {
        let mut tree = BTreeMap::new();
        for db in sqlite::database_list(&mut self.conn).await? {
            let mut tables = sqlite::list_tables(&mut self.conn, &db.name).await?;
            if db.name == PRIMARY_SCHEMA {
                tables.retain(|table| !is_bookkeeping_table(table));
            }
            tree.insert(db.name, tables);
        }
        Ok(tree)
    }

    pub async fn catalog_entries(&mut self) -> WorkspaceResult<Vec<CatalogEntry>> {
        store::list_for_root(&mut self.conn, &self.root.key()).await
    }

    // ==================== Attach / catalog ====================

    /// Attaches `name` unless it is already live on the same file. Returns
    /// true when this call attached it.
    async fn attach_live(&mut self, name: &str, path: &Path) -> WorkspaceResult<bool> {
        let live = sqlite::database_list(&mut self.conn).await?;
        if let Some(db) = live.iter().find(|db| db.name.eq_ignore_ascii_case(name)) {
            if same_file(&db.file, path) {
                debug!(name, "Already attached");
                return Ok(false);
            }
            return Err(WorkspaceError::duplicate_name(name));
        }

        sqlite::attach(&mut self.conn, name, path).await?;
        if let Err(e) = sqlite::probe_schema(&mut self.conn, name).await {
            if let Err(detach_err) = sqlite::detach(&mut self.conn, name).await {
                error!(name, error = %detach_err, "Failed to detach after probe failure");
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Attaches a file and records it in the catalog. When the catalog
    /// refuses the entry the attach is undone, and an app-created file is
    /// deleted.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn attach_and_catalog(
        &mut self,
        name: &str,
        path: &Path,
        app_created: bool,
    ) -> WorkspaceResult<CatalogEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::validation("Database name is required"));
        }
        if is_reserved_schema(name) {
            return Err(WorkspaceError::validation(format!(
                "'{}' is a reserved schema name",
                name
            )));
        }
        let path = path.canonicalize().map_err(|e| {
            WorkspaceError::not_found(format!("{}: {}", path.display(), e))
        })?;

        let newly_attached = self.attach_live(name, &path).await?;
        let root_key = self.root.key();

        let cataloged = match store::insert_or_ignore(&mut self.conn, name, &path, &root_key, app_created).await {
            Ok(true) => Ok(()),
            Ok(false) => match store::find_by_path(&mut self.conn, &path).await {
                Ok(Some(existing)) if existing.name == name && existing.root == root_key => Ok(()),
                Ok(_) => Err(WorkspaceError::duplicate_name(name)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = cataloged {
            self.rollback_attach(name, &path, newly_attached, app_created).await;
            return Err(e);
        }

        store::find_by_name(&mut self.conn, name, &root_key)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(format!("Catalog entry '{}'", name)))
    }

    async fn rollback_attach(&mut self, name: &str, path: &Path, newly_attached: bool, app_created: bool) {
        if newly_attached {
            if let Err(e) = sqlite::detach(&mut self.conn, name).await {
                error!(name, error = %e, "Rollback detach failed");
            }
        }
        if app_created {
            if let Err(e) = remove_database_file(path) {
                error!(path = %path.display(), error = %e, "Rollback file removal failed");
            }
        }
    }

    /// Attaches a file under its derived alias, moving to `_2`, `_3`, ... on
    /// name collisions.
    async fn attach_with_fallback(&mut self, path: &Path, app_created: bool) -> WorkspaceResult<CatalogEntry> {
        let base = alias_from_path(path);
        let root_key = self.root.key();
        for attempt in 0..self.config.max_path_attempts {
            let candidate = with_suffix(&base, attempt);
            if store::find_by_name(&mut self.conn, &candidate, &root_key).await?.is_some() {
                continue;
            }
            match self.attach_and_catalog(&candidate, path, app_created).await {
                Err(WorkspaceError::DuplicateName { .. }) => continue,
                other => return other,
            }
        }
        Err(WorkspaceError::resource_exhausted(format!(
            "No free name for {} after {} attempts",
            path.display(),
            self.config.max_path_attempts
        )))
    }

    // ==================== Current database ====================

    /// Points unqualified browse/edit operations at `name`. Empty names are
    /// rejected and the pointer is left unchanged.
    pub async fn set_current_database(&mut self, name: &str) -> WorkspaceResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::validation("Current database name is required"));
        }
        let live = sqlite::database_list(&mut self.conn).await?;
        if !live.iter().any(|db| db.name == name) {
            return Err(WorkspaceError::not_found(format!("Database '{}' is not attached", name)));
        }
        store::set_current(&mut self.conn, name).await
    }

    /// The current-database pointer; `NotFound` when unset.
    pub async fn get_current_database(&mut self) -> WorkspaceResult<String> {
        store::get_current(&mut self.conn)
            .await?
            .ok_or_else(|| WorkspaceError::not_found("No current database"))
    }

    async fn current_database(&mut self) -> WorkspaceResult<Option<String>> {
        store::get_current(&mut self.conn).await
    }

    // ==================== Create / import / remove ====================

    fn target_dir(&self) -> PathBuf {
        match self.root.path() {
            Some(dir) => dir.to_path_buf(),
            None => self.config.databases_dir(),
        }
    }

    fn unique_path(&self, dir: &Path, base: &str) -> WorkspaceResult<PathBuf> {
        for attempt in 0..self.config.max_path_attempts {
            let candidate = dir.join(format!("{}.db", with_suffix(base, attempt)));
            if !candidate.exists() {
                return Ok(candidate);
            }
            debug!(path = %candidate.display(), "File collision, trying next suffix");
        }
        Err(WorkspaceError::resource_exhausted(format!(
            "Failed to find a unique file path for database '{}' after {} attempts",
            base, self.config.max_path_attempts
        )))
    }

    fn create_empty_file(path: &Path) -> WorkspaceResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| WorkspaceError::io(format!("Failed to create {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Creates an empty database file under the active root and attaches it.
    #[instrument(skip(self), fields(root = %self.root))]
    pub async fn create_database(&mut self, name: &str, journal: JournalMode) -> WorkspaceResult<CatalogEntry> {
        if name.trim().is_empty() {
            return Err(WorkspaceError::validation("Database name is required"));
        }
        let logical = logical_name(name);
        if is_reserved_schema(&logical) {
            return Err(WorkspaceError::validation(format!(
                "'{}' is a reserved schema name",
                logical
            )));
        }
        if store::find_by_name(&mut self.conn, &logical, &self.root.key()).await?.is_some() {
            return Err(WorkspaceError::duplicate_name(logical));
        }

        let path = self.unique_path(&self.target_dir(), &logical)?;
        Self::create_empty_file(&path)?;

        let entry = match self.attach_and_catalog(&logical, &path, true).await {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(io) = remove_database_file(&path) {
                    error!(path = %path.display(), error = %io, "Failed to remove new file");
                }
                return Err(e);
            }
        };

        if journal == JournalMode::Wal {
            if let Err(e) = sqlite::set_journal_mode(&mut self.conn, &logical, journal).await {
                if let Err(cleanup) = self.remove_database(&logical).await {
                    error!(name = %logical, error = %cleanup, "Failed to remove database after journal mode error");
                }
                return Err(e);
            }
        }

        info!(name = %entry.name, path = %entry.path.display(), "Database created");
        Ok(entry)
    }

    /// Attaches an existing database file chosen by the user. The file is
    /// never deleted by rollback.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn import_database(&mut self, path: &Path) -> WorkspaceResult<CatalogEntry> {
        if !is_database_file(path) {
            return Err(WorkspaceError::validation(format!(
                "Not a recognized database file: {}",
                path.display()
            )));
        }
        let path = path.canonicalize().map_err(|e| {
            WorkspaceError::not_found(format!("{}: {}", path.display(), e))
        })?;

        if let Some(existing) = store::find_by_path(&mut self.conn, &path).await? {
            if existing.root != self.root.key() {
                return Err(WorkspaceError::duplicate_name(existing.name));
            }
            self.attach_live(&existing.name, &path).await?;
            return Ok(existing);
        }

        let entry = self.attach_with_fallback(&path, false).await?;
        info!(name = %entry.name, "Database imported");
        Ok(entry)
    }

    /// Detaches, un-catalogs and deletes a database. Every step runs; the
    /// first failure is returned.
    #[instrument(skip(self), fields(root = %self.root))]
    pub async fn remove_database(&mut self, name: &str) -> WorkspaceResult<()> {
        let root_key = self.root.key();
        let entry = match store::find_by_name(&mut self.conn, name.trim(), &root_key).await? {
            Some(entry) => entry,
            None => store::find_by_name(&mut self.conn, &logical_name(name), &root_key)
                .await?
                .ok_or_else(|| WorkspaceError::not_found(format!("Database '{}'", name.trim())))?,
        };

        let mut first_error: Option<WorkspaceError> = None;
        let mut keep = |result: WorkspaceResult<()>| {
            if let Err(e) = result {
                error!(error = %e, "Remove step failed");
                first_error.get_or_insert(e);
            }
        };

        let live = sqlite::database_list(&mut self.conn).await;
        match live {
            Ok(live) if live.iter().any(|db| db.name == entry.name) => {
                keep(sqlite::detach(&mut self.conn, &entry.name).await);
            }
            Ok(_) => {}
            Err(e) => keep(Err(e)),
        }

        keep(
            store::delete_entry(&mut self.conn, &entry.name, &root_key)
                .await
                .map(|_| ()),
        );

        match store::get_current(&mut self.conn).await {
            Ok(Some(current)) if current == entry.name => keep(store::clear_current(&mut self.conn).await),
            Ok(_) => {}
            Err(e) => keep(Err(e)),
        }

        keep(remove_database_file(&entry.path).map_err(|e| {
            WorkspaceError::io(format!("Failed to delete {}: {}", entry.path.display(), e))
        }));

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(name = %entry.name, "Database removed");
                Ok(())
            }
        }
    }

    // ==================== Ingestion ====================

    /// Builds a new database from a CSV, JSON or SQL file and attaches it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload_data_file(&mut self, path: &Path) -> WorkspaceResult<UploadSummary> {
        DataFileKind::from_path(path)?;
        let logical = alias_from_path(path);
        if store::find_by_name(&mut self.conn, &logical, &self.root.key()).await?.is_some() {
            return Err(WorkspaceError::duplicate_name(logical));
        }

        let data = ingest::read_data_file(path).await?;
        let db_path = self.unique_path(&self.target_dir(), &logical)?;
        Self::create_empty_file(&db_path)?;

        let populated = populate_file(&db_path, &data).await;
        let (tables, script_rows) = match populated {
            Ok(result) => result,
            Err(e) => {
                if let Err(io) = remove_database_file(&db_path) {
                    error!(path = %db_path.display(), error = %io, "Failed to remove partial file");
                }
                return Err(e);
            }
        };

        let database = match self.attach_and_catalog(&logical, &db_path, true).await {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(io) = remove_database_file(&db_path) {
                    error!(path = %db_path.display(), error = %io, "Failed to remove new file");
                }
                return Err(e);
            }
        };

        info!(name = %database.name, tables = tables.len(), "Data file loaded");
        Ok(UploadSummary {
            database,
            tables,
            script_rows,
        })
    }

    /// Replaces `database.table` with the dataframe's rows.
    pub async fn ingest_dataframe(
        &mut self,
        database: &str,
        table: &str,
        dataframe: &Dataframe,
        options: IngestOptions,
    ) -> WorkspaceResult<u64> {
        let live = sqlite::database_list(&mut self.conn).await?;
        if !live.iter().any(|db| db.name == database) {
            return Err(WorkspaceError::not_found(format!("Database '{}' is not attached", database)));
        }
        ingest::ingest(&mut self.conn, dataframe, Some(database), table, options).await
    }

    // ==================== Queries ====================

    /// Runs user SQL through the gatekeeper with the session's lock setting.
    pub async fn run_query(&mut self, sql: &str, editable: bool) -> WorkspaceResult<QueryOutcome> {
        let locked = self.config.gate_locked();
        gatekeeper::run(&mut self.conn, sql, editable, locked).await
    }

    pub async fn browse_table(&mut self, table: &str) -> WorkspaceResult<QueryOutcome> {
        let current = self.current_database().await?;
        let limit = self.config.browse_limit;
        gatekeeper::browse_table(&mut self.conn, current.as_deref(), table, limit).await
    }

    pub async fn update_cell(&mut self, request: &CellUpdate) -> WorkspaceResult<u64> {
        let database = match &request.database {
            Some(db) if !db.trim().is_empty() => Some(db.clone()),
            _ => self.current_database().await?,
        };
        gatekeeper::update_cell(&mut self.conn, database.as_deref(), request).await
    }

    // ==================== Export ====================

    /// Exports `main` and every attached catalog database of the active root.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub async fn export(&mut self, target: ExportTarget, destination: &Path) -> WorkspaceResult<ExportSummary> {
        let live = sqlite::database_list(&mut self.conn).await?;
        if live
            .iter()
            .any(|db| !db.file.is_empty() && same_file(&db.file, destination))
        {
            return Err(WorkspaceError::validation(
                "Export destination is an attached database",
            ));
        }

        let mut sources = vec![PRIMARY_SCHEMA.to_string()];
        for entry in store::list_for_root(&mut self.conn, &self.root.key()).await? {
            if live.iter().any(|db| db.name == entry.name) {
                sources.push(entry.name);
            }
        }

        export::export_all(&mut self.conn, &sources, target, destination).await
    }
}

/// Writes parsed data-file contents into a standalone database file.
async fn populate_file(path: &Path, data: &DataFile) -> WorkspaceResult<(Vec<(String, u64)>, Option<u64>)> {
    let mut conn = sqlite::open_file(path).await?;
    let result: WorkspaceResult<(Vec<(String, u64)>, Option<u64>)> = async {
        match data {
            DataFile::Tables(tables) => {
                let mut written = Vec::with_capacity(tables.len());
                for (table, dataframe) in tables {
                    let rows = ingest::ingest(&mut conn, dataframe, None, table, IngestOptions::default()).await?;
                    written.push((table.clone(), rows));
                }
                Ok((written, None))
            }
            DataFile::Script(script) => {
                let rows = sqlite::execute_script(&mut conn, script).await?;
                Ok((Vec::new(), Some(rows)))
            }
        }
    }
    .await;

    let closed = sqlite::close(conn).await;
    let result = result?;
    closed?;
    Ok(result)
}

fn same_file(live: &str, path: &Path) -> bool {
    let live = Path::new(live);
    match (live.canonicalize(), path.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => live == path,
    }
}

/// Deletes a database file and its journal sidecars. Missing files are fine.
pub(crate) fn remove_database_file(path: &Path) -> std::io::Result<()> {
    let mut result = Ok(());
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut target = path.as_os_str().to_os_string();
        target.push(suffix);
        match std::fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) if result.is_ok() => result = Err(e),
            Err(_) => {}
        }
    }
    result
}
