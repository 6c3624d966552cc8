//! Typed access to the admin REST backend.
//!
//! Every operation is exactly one request/response cycle: nothing is cached,
//! retried or timed out on the client side. Row payloads are converted to the
//! wire key convention before they are sent; rows coming back are returned in
//! whatever convention the server used and are normalized by the callers.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::data_types::{
    ColumnDefinition, ColumnDescriptor, DatabaseInfo, Row, RowId, ServerMessage,
    SqlTemplate, TableSnapshot,
};
use crate::normalize::NormalizeError;

mod http;

pub use http::HttpRemoteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Request to {endpoint} failed with status {status}")]
    RequestFailed {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("Request to {endpoint} could not be completed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl StoreError {
    /// Endpoint ("METHOD /path") the failed request was addressed to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            StoreError::RequestFailed { endpoint, .. }
            | StoreError::Transport { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[async_trait]
pub trait RemoteStore: Send + Sync + Debug {
    async fn get_database_info(&self) -> Result<DatabaseInfo>;

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Rows exactly as the server sent them (wire convention).
    async fn get_rows(&self, table: &str) -> Result<Vec<Row>>;

    async fn insert_row(&self, table: &str, row: &Row) -> Result<()>;

    async fn update_row(&self, table: &str, id: &RowId, row: &Row) -> Result<()>;

    async fn delete_row(&self, table: &str, id: &RowId) -> Result<()>;

    /// Returns whatever the server answered with (`Value::Null` for an empty body).
    async fn create_table(
        &self,
        table_name: &str,
        columns: &[ColumnDefinition],
    ) -> Result<Value>;

    async fn drop_table(&self, table: &str) -> Result<()>;

    async fn list_sql_templates(&self) -> Result<Vec<SqlTemplate>>;

    /// Saving an existing name overwrites it; that is up to the server.
    async fn save_sql_template(&self, template: &SqlTemplate) -> Result<()>;

    async fn run_template(&self, name: &str, context_table: &str)
        -> Result<TableSnapshot>;

    async fn run_query(
        &self,
        sql: &str,
        context_table: Option<&str>,
    ) -> Result<TableSnapshot>;

    async fn backup(&self) -> Result<ServerMessage>;

    /// Destructive: callers must have confirmed with the user.
    async fn restore(&self) -> Result<ServerMessage>;

    /// Spreadsheet bytes, generated by the server and not interpreted here.
    /// `snapshot` is in the local convention and goes out re-keyed.
    async fn export_to_excel(&self, snapshot: &TableSnapshot) -> Result<Bytes>;
}
