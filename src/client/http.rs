use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{RemoteStore, Result, StoreError};
use crate::config::schema::Backend;
use crate::data_types::{
    ColumnDefinition, ColumnDescriptor, CreateTableRequest, DatabaseInfo, QueryRunRequest,
    Row, RowId, ServerMessage, SqlTemplate, TableSnapshot, TemplateRunRequest,
};
use crate::normalize::{wire_format, wire_snapshot};

// Unreserved characters (RFC 3986) stay as they are in path segments
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Table names are case-insensitive on the backend; paths always use the
/// lower-cased form.
fn table_segment(table: &str) -> String {
    utf8_percent_encode(&table.to_lowercase(), SEGMENT).to_string()
}

fn id_segment(id: &RowId) -> String {
    utf8_percent_encode(&id.to_string(), SEGMENT).to_string()
}

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        // Fail early on garbage; the string form is what requests are built from
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    pub fn from_config(backend: &Backend) -> Result<Self> {
        Self::new(&backend.base_url, &backend.user_agent)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<(RequestBuilder, String)> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))?;
        let endpoint = format!("{method} {path}");
        let builder = self
            .client
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent);
        Ok((builder, endpoint))
    }

    async fn execute(&self, request: RequestBuilder, endpoint: &str) -> Result<Response> {
        debug!("Sending {endpoint}");

        let response = request.send().await.map_err(|source| StoreError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::RequestFailed {
                status,
                endpoint: endpoint.to_string(),
            });
        }

        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T> {
        let response = self.execute(request, endpoint).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| StoreError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (request, endpoint) = self.request(Method::GET, path)?;
        self.fetch_json(request, &endpoint).await
    }

    // The acknowledgement bodies carry nothing we use, so they are not parsed
    async fn ack(&self, request: RequestBuilder, endpoint: &str) -> Result<()> {
        self.execute(request, endpoint).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get_database_info(&self) -> Result<DatabaseInfo> {
        self.get_json("/api/database/info").await
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.get_json(&format!("/api/tables/{}/columns", table_segment(table)))
            .await
    }

    async fn get_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.get_json(&format!("/api/tables/{}/rows", table_segment(table)))
            .await
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<()> {
        let body = wire_format(row)?;
        let (request, endpoint) = self.request(
            Method::POST,
            &format!("/api/tables/{}/rows", table_segment(table)),
        )?;
        self.ack(request.json(&body), &endpoint).await
    }

    async fn update_row(&self, table: &str, id: &RowId, row: &Row) -> Result<()> {
        let body = wire_format(row)?;
        let (request, endpoint) = self.request(
            Method::PUT,
            &format!("/api/tables/{}/{}", table_segment(table), id_segment(id)),
        )?;
        self.ack(request.json(&body), &endpoint).await
    }

    async fn delete_row(&self, table: &str, id: &RowId) -> Result<()> {
        let (request, endpoint) = self.request(
            Method::DELETE,
            &format!("/api/tables/{}/{}", table_segment(table), id_segment(id)),
        )?;
        self.ack(request, &endpoint).await
    }

    async fn create_table(
        &self,
        table_name: &str,
        columns: &[ColumnDefinition],
    ) -> Result<Value> {
        let body = CreateTableRequest {
            table_name: table_name.to_string(),
            columns: columns.to_vec(),
        };
        let (request, endpoint) = self.request(Method::POST, "/api/tables")?;
        let response = self.execute(request.json(&body), &endpoint).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| StoreError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        // Servers answer with JSON, plain text or nothing at all
        Ok(if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        })
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let (request, endpoint) = self.request(
            Method::DELETE,
            &format!("/api/tables/{}", table_segment(table)),
        )?;
        self.ack(request, &endpoint).await
    }

    async fn list_sql_templates(&self) -> Result<Vec<SqlTemplate>> {
        self.get_json("/api/database/sql-options").await
    }

    async fn save_sql_template(&self, template: &SqlTemplate) -> Result<()> {
        let (request, endpoint) = self.request(Method::POST, "/api/database/sql-options")?;
        self.ack(request.json(template), &endpoint).await
    }

    async fn run_template(
        &self,
        name: &str,
        context_table: &str,
    ) -> Result<TableSnapshot> {
        let body = TemplateRunRequest {
            template_name: name,
            table_name: context_table,
        };
        let (request, endpoint) =
            self.request(Method::POST, "/api/database/execute-sql-template")?;
        self.fetch_json(request.json(&body), &endpoint).await
    }

    async fn run_query(
        &self,
        sql: &str,
        context_table: Option<&str>,
    ) -> Result<TableSnapshot> {
        let body = QueryRunRequest {
            query: sql,
            table_name: context_table,
        };
        let (request, endpoint) =
            self.request(Method::POST, "/api/database/execute-sql-simple")?;
        self.fetch_json(request.json(&body), &endpoint).await
    }

    async fn backup(&self) -> Result<ServerMessage> {
        let (request, endpoint) = self.request(Method::POST, "/api/database/backup")?;
        self.fetch_json(request, &endpoint).await
    }

    async fn restore(&self) -> Result<ServerMessage> {
        let (request, endpoint) = self.request(Method::POST, "/api/database/restore")?;
        self.fetch_json(request, &endpoint).await
    }

    async fn export_to_excel(&self, snapshot: &TableSnapshot) -> Result<Bytes> {
        let body = wire_snapshot(snapshot)?;
        let (request, endpoint) =
            self.request(Method::POST, "/api/database/export-to-excel")?;
        let response = self.execute(request.json(&body), &endpoint).await?;
        response
            .bytes()
            .await
            .map_err(|source| StoreError::Transport { endpoint, source })
    }
}
