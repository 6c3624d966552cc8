//! Authoritative in-memory view of the active table (or of the last ad-hoc
//! query result) and its reconciliation with the backend.
//!
//! Nothing is mutated optimistically: the local snapshot changes only after
//! the server acknowledged the operation. Row updates and deletions patch the
//! snapshot in place; insertions and structural changes replace it with a
//! fresh fetch.
//!
//! Requests are tagged with the generation of the context they were issued
//! in. Selecting another table (or dispatching another query) starts a new
//! generation, and responses belonging to an older one are dropped instead
//! of overwriting the newer state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::RemoteStore;
use crate::data_types::{Row, RowId, TableSnapshot};
use crate::error::{report, AdminError, Result};
use crate::normalize::{local_rows, local_snapshot};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Loaded,
}

/// What the table area currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Table(TableSnapshot),
    /// Display-only rows of a template or ad-hoc query
    QueryResult(TableSnapshot),
}

impl View {
    pub fn snapshot(&self) -> &TableSnapshot {
        match self {
            View::Table(s) | View::QueryResult(s) => s,
        }
    }
}

/// Generation a query was dispatched in; see [`TableStateController::begin_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

#[derive(Debug)]
struct TableState {
    table: Option<String>,
    snapshot: TableSnapshot,
    load_state: LoadState,
    query_result: Option<TableSnapshot>,
    // bumped whenever the table context changes
    table_generation: u64,
    // bumped on every query dispatch and table change
    query_generation: u64,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            table: None,
            snapshot: TableSnapshot::default(),
            load_state: LoadState::Empty,
            query_result: None,
            table_generation: 0,
            query_generation: 0,
        }
    }
}

impl TableState {
    fn reset(&mut self, table: Option<String>) {
        self.table = table;
        self.snapshot = TableSnapshot::default();
        self.load_state = LoadState::Empty;
        self.query_result = None;
        self.table_generation += 1;
        self.query_generation += 1;
    }

    fn current_table(&self) -> Result<String> {
        self.table.clone().ok_or(AdminError::NotProvided {
            what: "Table name",
        })
    }

    /// Table the row operations apply to; query results can't be edited.
    fn editable_table(&self) -> Result<String> {
        let table = self.current_table()?;
        if self.query_result.is_some() {
            return Err(AdminError::validation(
                "Query results are read-only, switch back to the table view to edit rows",
            ));
        }
        Ok(table)
    }

    fn table_context(&self) -> Result<(String, u64)> {
        Ok((self.current_table()?, self.table_generation))
    }

    fn editable_context(&self) -> Result<(String, u64)> {
        Ok((self.editable_table()?, self.table_generation))
    }

    /// The row `row_id` with `column` set to `value`.
    fn prepare_edit(
        &self,
        row_id: &RowId,
        column: &str,
        value: Value,
    ) -> Result<(String, Row, u64)> {
        let (table, generation) = self.editable_context()?;
        if !self.snapshot.has_column(column) {
            return Err(AdminError::validation(format!(
                "Column {column:?} doesn't exist in table {table:?}"
            )));
        }
        let mut updated = self
            .snapshot
            .find(row_id)
            .cloned()
            .ok_or_else(|| AdminError::RowNotFound { id: row_id.clone() })?;
        updated.insert(column.to_string(), value);
        Ok((table, updated, generation))
    }
}

#[derive(Debug, Clone)]
pub struct TableStateController {
    store: Arc<dyn RemoteStore>,
    state: Arc<Mutex<TableState>>,
    notifier: Notifier,
}

impl TableStateController {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Notifier) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(TableState::default())),
            notifier,
        }
    }

    pub fn table_name(&self) -> Option<String> {
        self.state.lock().table.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().load_state
    }

    /// The table snapshot, regardless of whether a query result covers it.
    pub fn snapshot(&self) -> TableSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn query_result(&self) -> Option<TableSnapshot> {
        self.state.lock().query_result.clone()
    }

    pub fn view(&self) -> View {
        let state = self.state.lock();
        match &state.query_result {
            Some(result) => View::QueryResult(result.clone()),
            None => View::Table(state.snapshot.clone()),
        }
    }

    /// Fetch columns and rows of `name` and make them the current table view.
    /// On failure the view falls back to empty, never to a partial snapshot.
    pub async fn select_table(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            self.clear();
            return Err(report(
                &self.notifier,
                "Loading table",
                AdminError::NotProvided {
                    what: "Table name",
                },
            ));
        }

        let generation = {
            let mut state = self.state.lock();
            state.reset(Some(name.to_string()));
            state.table_generation
        };
        debug!("Loading table {name:?} (generation {generation})");

        let fetched = self.fetch_table(name).await;

        let mut state = self.state.lock();
        if state.table_generation != generation {
            debug!("Discarding stale response for table {name:?}");
            return Ok(());
        }

        match fetched {
            Ok(snapshot) => {
                info!(
                    "Loaded table {name:?}: {} columns, {} rows",
                    snapshot.columns.len(),
                    snapshot.rows.len()
                );
                state.snapshot = snapshot;
                state.load_state = LoadState::Loaded;
                Ok(())
            }
            Err(err) => {
                state.snapshot = TableSnapshot::default();
                state.load_state = LoadState::Empty;
                drop(state);
                Err(report(&self.notifier, "Loading table", err))
            }
        }
    }

    async fn fetch_table(&self, name: &str) -> Result<TableSnapshot> {
        let columns = self.store.get_columns(name).await?;
        let rows = self.store.get_rows(name).await?;
        Ok(local_snapshot(TableSnapshot { columns, rows })?)
    }

    /// Forget the table context altogether.
    pub fn clear(&self) {
        self.state.lock().reset(None);
    }

    /// Send the row with `column` set to `value` and, once the server accepted
    /// it, swap it in for the old row.
    pub async fn edit_cell(&self, row_id: &RowId, column: &str, value: Value) -> Result<()> {
        let (table, updated, generation) = self
            .state
            .lock()
            .prepare_edit(row_id, column, value)
            .map_err(|e| report(&self.notifier, "Updating row", e))?;

        self.store
            .update_row(&table, row_id, &updated)
            .await
            .map_err(|e| report(&self.notifier, "Updating row", e.into()))?;

        let mut state = self.state.lock();
        if state.table_generation != generation {
            debug!("Table changed while updating row {row_id} of {table:?}, not patching");
            return Ok(());
        }
        if let Some(position) = state.snapshot.position_of(row_id) {
            state.snapshot.rows[position] = updated;
        }
        drop(state);

        info!("Updated {column:?} of row {row_id} in {table:?}");
        self.notifier.success(format!("Row {row_id} updated"));
        Ok(())
    }

    pub async fn delete_row_by_id(&self, row_id: &RowId) -> Result<()> {
        let (table, generation) = self
            .state
            .lock()
            .editable_context()
            .map_err(|e| report(&self.notifier, "Deleting row", e))?;

        self.store
            .delete_row(&table, row_id)
            .await
            .map_err(|e| report(&self.notifier, "Deleting row", e.into()))?;

        let mut state = self.state.lock();
        if state.table_generation != generation {
            debug!("Table changed while deleting row {row_id} of {table:?}, not patching");
            return Ok(());
        }
        state.snapshot.rows.retain(|row| !row_id.matches(row));
        drop(state);

        info!("Deleted row {row_id} from {table:?}");
        self.notifier.success(format!("Row {row_id} deleted"));
        Ok(())
    }

    /// Insert `fields` (local key convention) and reload the rows so that
    /// server-generated values (ids, defaults) show up.
    pub async fn insert_row(&self, fields: &Row) -> Result<()> {
        let (table, generation) = self
            .state
            .lock()
            .editable_context()
            .map_err(|e| report(&self.notifier, "Adding row", e))?;

        self.store
            .insert_row(&table, fields)
            .await
            .map_err(|e| report(&self.notifier, "Adding row", e.into()))?;
        info!("Inserted row into {table:?}");

        let rows = async {
            let rows = self.store.get_rows(&table).await?;
            Ok::<_, AdminError>(local_rows(&rows)?)
        }
        .await
        .map_err(|e| report(&self.notifier, "Reloading rows", e))?;

        let mut state = self.state.lock();
        if state.table_generation != generation {
            debug!("Table changed while inserting into {table:?}, not reloading");
            return Ok(());
        }
        state.snapshot.rows = rows;
        drop(state);

        self.notifier.success("Row added");
        Ok(())
    }

    /// Drop the active table. Callers are expected to have asked the user;
    /// afterwards there is no table context left.
    pub async fn drop_current_table(&self) -> Result<String> {
        let (table, generation) = self
            .state
            .lock()
            .table_context()
            .map_err(|e| report(&self.notifier, "Dropping table", e))?;

        self.store
            .drop_table(&table)
            .await
            .map_err(|e| report(&self.notifier, "Dropping table", e.into()))?;

        let mut state = self.state.lock();
        if state.table_generation == generation {
            state.reset(None);
        }
        drop(state);

        info!("Dropped table {table:?}");
        self.notifier.success(format!("Table {table} dropped"));
        Ok(table)
    }

    /// Start a query dispatch. The ticket must be handed back to
    /// [`present_query_result`](Self::present_query_result).
    pub fn begin_query(&self) -> QueryTicket {
        let mut state = self.state.lock();
        state.query_generation += 1;
        QueryTicket(state.query_generation)
    }

    /// Show `result` in place of the table view, unless a newer query or a
    /// table selection happened since `ticket` was issued. Returns whether
    /// the result was shown.
    pub fn present_query_result(&self, ticket: QueryTicket, result: TableSnapshot) -> bool {
        let mut state = self.state.lock();
        if state.query_generation != ticket.0 {
            debug!("Discarding stale query result (generation {})", ticket.0);
            return false;
        }
        state.query_result = Some(result);
        true
    }

    /// Leave the query result and go back to the table rows.
    pub fn show_table_view(&self) {
        let mut state = self.state.lock();
        state.query_result = None;
        state.query_generation += 1;
    }
}
