use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{HttpRemoteStore, RemoteStore, Result};
use crate::data_types::{
    ColumnDefinition, ColumnDescriptor, DatabaseInfo, Row, RowId, ServerMessage, SqlTemplate,
    TableSnapshot,
};
use crate::notify::Notifier;

pub async fn mock_store() -> (MockServer, Arc<dyn RemoteStore>) {
    let server = MockServer::start().await;
    let store = HttpRemoteStore::new(&server.uri(), "dbadmin-test").unwrap();
    (server, Arc::new(store))
}

pub fn notifier() -> Notifier {
    Notifier::default()
}

pub fn row(value: Value) -> Row {
    value.as_object().expect("row literal is an object").clone()
}

pub fn clients_columns() -> Value {
    json!([
        {"name": "id", "type": "integer"},
        {"name": "client_name", "type": "text"},
        {"name": "email", "type": "text"}
    ])
}

pub fn clients_rows() -> Value {
    json!([
        {"id": 1, "client_name": "Ann", "email": "ann@example.com"},
        {"id": 5, "client_name": "Bob", "email": "bob@example.com"},
        {"id": 7, "client_name": "Cid", "email": null}
    ])
}

/// Serve `columns` and `rows` for `table` on the column/row listing endpoints.
pub async fn mount_table(server: &MockServer, table: &str, columns: Value, rows: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/tables/{table}/columns")))
        .respond_with(ResponseTemplate::new(200).set_body_json(columns))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/tables/{table}/rows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

/// Holds column fetches of one table until the test hands out a permit,
/// so request interleavings can be set up without relying on timing.
#[derive(Debug)]
pub struct GatedStore {
    inner: Arc<dyn RemoteStore>,
    table: String,
    gate: Arc<Semaphore>,
}

impl GatedStore {
    pub fn wrap(
        inner: Arc<dyn RemoteStore>,
        table: &str,
    ) -> (Arc<dyn RemoteStore>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let store = GatedStore {
            inner,
            table: table.to_string(),
            gate: gate.clone(),
        };
        (Arc::new(store), gate)
    }
}

#[async_trait]
impl RemoteStore for GatedStore {
    async fn get_database_info(&self) -> Result<DatabaseInfo> {
        self.inner.get_database_info().await
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        if table == self.table {
            let _permit = self.gate.acquire().await.expect("gate is never closed");
        }
        self.inner.get_columns(table).await
    }

    async fn get_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.inner.get_rows(table).await
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        self.inner.insert_row(table, row).await
    }

    async fn update_row(&self, table: &str, id: &RowId, row: &Row) -> Result<()> {
        self.inner.update_row(table, id, row).await
    }

    async fn delete_row(&self, table: &str, id: &RowId) -> Result<()> {
        self.inner.delete_row(table, id).await
    }

    async fn create_table(
        &self,
        table_name: &str,
        columns: &[ColumnDefinition],
    ) -> Result<Value> {
        self.inner.create_table(table_name, columns).await
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.inner.drop_table(table).await
    }

    async fn list_sql_templates(&self) -> Result<Vec<SqlTemplate>> {
        self.inner.list_sql_templates().await
    }

    async fn save_sql_template(&self, template: &SqlTemplate) -> Result<()> {
        self.inner.save_sql_template(template).await
    }

    async fn run_template(&self, name: &str, context_table: &str) -> Result<TableSnapshot> {
        self.inner.run_template(name, context_table).await
    }

    async fn run_query(
        &self,
        sql: &str,
        context_table: Option<&str>,
    ) -> Result<TableSnapshot> {
        self.inner.run_query(sql, context_table).await
    }

    async fn backup(&self) -> Result<ServerMessage> {
        self.inner.backup().await
    }

    async fn restore(&self) -> Result<ServerMessage> {
        self.inner.restore().await
    }

    async fn export_to_excel(&self, snapshot: &TableSnapshot) -> Result<Bytes> {
        self.inner.export_to_excel(snapshot).await
    }
}
