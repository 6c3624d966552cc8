//! Saved SQL templates and query execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::client::RemoteStore;
use crate::data_types::{SqlTemplate, TableSnapshot};
use crate::error::{report, AdminError, Result};
use crate::normalize::local_snapshot;
use crate::notify::Notifier;
use crate::state::{QueryTicket, TableStateController};

/// Change counter for a catalog. Writers bump it; readers remember the value
/// they last loaded at and re-fetch once it moved.
#[derive(Debug, Clone, Default)]
pub struct Revision(Arc<AtomicU64>);

impl Revision {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[derive(Debug, Default)]
struct LoadedNames {
    revision: Option<u64>,
    names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SqlTemplateController {
    store: Arc<dyn RemoteStore>,
    tables: TableStateController,
    notifier: Notifier,
    revision: Revision,
    loaded: Arc<Mutex<LoadedNames>>,
}

impl SqlTemplateController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        tables: TableStateController,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            tables,
            notifier,
            revision: Revision::default(),
            loaded: Arc::new(Mutex::new(LoadedNames::default())),
        }
    }

    /// Handle to the template catalog revision, for views that list templates.
    pub fn revision(&self) -> Revision {
        self.revision.clone()
    }

    /// Names of the saved templates. They are fetched again whenever a
    /// template was saved since the last fetch.
    pub async fn list_templates(&self) -> Result<Vec<String>> {
        let revision = self.revision.current();
        {
            let loaded = self.loaded.lock();
            if loaded.revision == Some(revision) {
                return Ok(loaded.names.clone());
            }
        }

        debug!("Fetching SQL templates (revision {revision})");
        match self.store.list_sql_templates().await {
            Ok(templates) => {
                let names: Vec<String> = templates.into_iter().map(|t| t.name).collect();
                let mut loaded = self.loaded.lock();
                loaded.revision = Some(revision);
                loaded.names = names.clone();
                Ok(names)
            }
            Err(e) => {
                *self.loaded.lock() = LoadedNames::default();
                Err(report(&self.notifier, "Loading SQL templates", e.into()))
            }
        }
    }

    /// Drop the loaded names so the next listing goes to the server.
    pub fn refresh(&self) {
        self.loaded.lock().revision = None;
    }

    pub async fn save_template(&self, name: &str, sql: &str) -> Result<()> {
        if name.trim().is_empty() || sql.trim().is_empty() {
            return Err(report(
                &self.notifier,
                "Saving SQL template",
                AdminError::validation("Template name and query must both be filled in"),
            ));
        }

        let template = SqlTemplate {
            name: name.to_string(),
            query: sql.to_string(),
        };
        self.store
            .save_sql_template(&template)
            .await
            .map_err(|e| report(&self.notifier, "Saving SQL template", e.into()))?;

        let revision = self.revision.bump();
        info!("Saved SQL template {name:?} (revision {revision})");
        self.notifier.success(format!("Template {name} saved"));
        Ok(())
    }

    /// Execute the saved template `name` against `context_table` and show the
    /// result in place of the table rows.
    pub async fn run_template(&self, name: &str, context_table: &str) -> Result<TableSnapshot> {
        if name.trim().is_empty() {
            return Err(report(
                &self.notifier,
                "Running SQL template",
                AdminError::NotProvided {
                    what: "Template name",
                },
            ));
        }

        let ticket = self.tables.begin_query();
        let result = async {
            let snapshot = self.store.run_template(name, context_table).await?;
            Ok::<_, AdminError>(local_snapshot(snapshot)?)
        }
        .await
        .map_err(|e| report(&self.notifier, "Running SQL template", e))?;

        self.present(ticket, result, &format!("template {name:?}"))
    }

    /// Execute free-form SQL, scoped to `context_table` when one is given.
    pub async fn run_query(
        &self,
        sql: &str,
        context_table: Option<&str>,
    ) -> Result<TableSnapshot> {
        if sql.trim().is_empty() {
            return Err(report(
                &self.notifier,
                "Running query",
                AdminError::validation("Query is empty"),
            ));
        }

        let ticket = self.tables.begin_query();
        let result = async {
            let snapshot = self.store.run_query(sql, context_table).await?;
            Ok::<_, AdminError>(local_snapshot(snapshot)?)
        }
        .await
        .map_err(|e| report(&self.notifier, "Running query", e))?;

        self.present(ticket, result, "query")
    }

    fn present(
        &self,
        ticket: QueryTicket,
        result: TableSnapshot,
        what: &str,
    ) -> Result<TableSnapshot> {
        if self.tables.present_query_result(ticket, result.clone()) {
            info!("Executed {what}: {} rows", result.rows.len());
            self.notifier.success("Query executed successfully");
        }
        Ok(result)
    }
}
