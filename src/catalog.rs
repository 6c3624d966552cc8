//! Database-level operations: the table list, table creation, backups and
//! spreadsheet export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::RemoteStore;
use crate::data_types::{ColumnDefinition, DatabaseInfo, TableSnapshot};
use crate::error::{report, AdminError, Result};
use crate::notify::Notifier;
use crate::state::TableStateController;
use crate::templates::Revision;

/// Check a table definition before it is sent to the server.
pub fn validate_table_definition(name: &str, columns: &[ColumnDefinition]) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AdminError::validation("Table name can't be empty"));
    }
    if columns.is_empty() {
        return Err(AdminError::validation("A table needs at least one column"));
    }
    if columns.iter().any(|c| c.name.trim().is_empty()) {
        return Err(AdminError::validation("All column names must be filled in"));
    }
    if columns.iter().filter(|c| c.is_primary_key).count() > 1 {
        return Err(AdminError::validation(
            "Only one column can be the primary key",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DatabaseCatalogController {
    store: Arc<dyn RemoteStore>,
    tables: TableStateController,
    notifier: Notifier,
    export_file_name: String,
    info: Arc<Mutex<DatabaseInfo>>,
    revision: Revision,
}

impl DatabaseCatalogController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        tables: TableStateController,
        notifier: Notifier,
        export_file_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tables,
            notifier,
            export_file_name: export_file_name.into(),
            info: Arc::new(Mutex::new(DatabaseInfo::default())),
            revision: Revision::default(),
        }
    }

    pub fn db_name(&self) -> String {
        self.info.lock().db_name.clone()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.info.lock().tables.clone()
    }

    /// Bumped every time the set of tables may have changed.
    pub fn revision(&self) -> Revision {
        self.revision.clone()
    }

    /// Reload the database name and table list. On failure both are cleared.
    pub async fn refresh(&self) -> Result<DatabaseInfo> {
        match self.store.get_database_info().await {
            Ok(info) => {
                debug!("Database {:?} has {} tables", info.db_name, info.tables.len());
                *self.info.lock() = info.clone();
                Ok(info)
            }
            Err(e) => {
                *self.info.lock() = DatabaseInfo::default();
                Err(report(&self.notifier, "Loading database info", e.into()))
            }
        }
    }

    /// Mark the table list as changed and reload it.
    pub async fn invalidate(&self) -> Result<()> {
        self.revision.bump();
        self.refresh().await.map(|_| ())
    }

    pub async fn create_table(
        &self,
        name: &str,
        columns: &[ColumnDefinition],
    ) -> Result<Value> {
        validate_table_definition(name, columns)
            .map_err(|e| report(&self.notifier, "Creating table", e))?;

        let name = name.trim();
        let result = self
            .store
            .create_table(name, columns)
            .await
            .map_err(|e| report(&self.notifier, "Creating table", e.into()))?;

        info!("Created table {name:?} with {} columns", columns.len());
        self.notifier.success(format!("Table {name} created"));
        self.invalidate().await.ok();
        Ok(result)
    }

    pub async fn backup(&self) -> Result<String> {
        let reply = self
            .store
            .backup()
            .await
            .map_err(|e| report(&self.notifier, "Creating backup", e.into()))?;

        info!("Backup created: {}", reply.message);
        self.notifier.success("Backup created");
        self.invalidate().await.ok();
        Ok(reply.message)
    }

    /// Replace the database with the last backup. Destructive: callers must
    /// have asked for confirmation. The active table context is dropped.
    pub async fn restore(&self) -> Result<String> {
        let reply = self
            .store
            .restore()
            .await
            .map_err(|e| report(&self.notifier, "Restoring backup", e.into()))?;

        info!("Database restored: {}", reply.message);
        self.notifier.success("Database restored");
        self.tables.clear();
        self.invalidate().await.ok();
        Ok(reply.message)
    }

    /// Have the server render `snapshot` as a spreadsheet and store it in
    /// `dir` under the configured file name.
    pub async fn export(&self, snapshot: &TableSnapshot, dir: &Path) -> Result<PathBuf> {
        let bytes = self
            .store
            .export_to_excel(&snapshot.export_projection())
            .await
            .map_err(|e| report(&self.notifier, "Exporting", e.into()))?;

        let path = dir.join(&self.export_file_name);
        tokio::fs::write(&path, &bytes).await.map_err(|source| {
            report(
                &self.notifier,
                "Exporting",
                AdminError::Io {
                    path: path.clone(),
                    source,
                },
            )
        })?;

        info!("Exported {} rows to {}", snapshot.rows.len(), path.display());
        self.notifier
            .success(format!("Exported to {}", path.display()));
        Ok(path)
    }
}
