use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display as StrumDisplay, EnumString};

/// A single table row, keyed by column name. Key order is whatever the
/// server (or the caller) enumerated them in.
pub type Row = Map<String, Value>;

/// Column holding the identity used to match rows on update/delete.
pub const ID_COLUMN: &str = "id";

/// Placeholder sent for missing cells when exporting a snapshot.
pub const EXPORT_NULL: &str = "NULL";

/// Types offered when defining a new table. The backend accepts any label.
pub const SUGGESTED_COLUMN_TYPES: [&str; 7] = [
    "INTEGER",
    "BIGINT",
    "SERIAL",
    "VARCHAR",
    "TEXT",
    "DATE",
    "TIMESTAMP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum NamingConvention {
    /// underscore_separated, used in HTTP payloads
    Wire,
    /// capitalizedWordBoundary, used in the in-memory state
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn position_of(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|row| id.matches(row))
    }

    pub fn find(&self, id: &RowId) -> Option<&Row> {
        self.rows.iter().find(|row| id.matches(row))
    }

    /// Project every row onto the columns, in column order, substituting
    /// [`EXPORT_NULL`] for missing or null cells. This is the shape the
    /// spreadsheet export endpoint expects.
    pub fn export_projection(&self) -> TableSnapshot {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        let value = match row.get(&column.name) {
                            None | Some(Value::Null) => Value::from(EXPORT_NULL),
                            Some(value) => value.clone(),
                        };
                        (column.name.clone(), value)
                    })
                    .collect::<Row>()
            })
            .collect();

        TableSnapshot {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Identity of an editable row. The backend hands out either numeric or
/// textual ids, so both are accepted and compared by their rendered form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(RowId::Int)
                .or_else(|| Some(RowId::Text(n.to_string()))),
            Value::String(s) => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn of(row: &Row) -> Option<Self> {
        row.get(ID_COLUMN).and_then(RowId::from_value)
    }

    pub fn matches(&self, row: &Row) -> bool {
        RowId::of(row).map_or(false, |other| other.to_string() == self.to_string())
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(i) => write!(f, "{i}"),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId::Int(id)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        id.parse().unwrap_or_else(|_| RowId::Text(id.to_string()))
    }
}

impl FromStr for RowId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(());
        }
        Ok(s.parse::<i64>()
            .map(RowId::Int)
            .unwrap_or_else(|_| RowId::Text(s.to_string())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlTemplate {
    pub name: String,
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Column of a table that is about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
            is_primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRunRequest<'a> {
    pub template_name: &'a str,
    pub table_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRunRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<&'a str>,
}

/// Informational reply of the backup/restore endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: String,
}

/// Render a cell the way the table views show it.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        // Nested values are shown as compact JSON
        other => other.to_string(),
    }
}
