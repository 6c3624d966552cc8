use std::str::FromStr;

use crate::data_types::{ColumnDefinition, RowId};

/// Backslash commands available inside the CLI
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    ListTables,
    SelectTable(String),
    TableView,
    ListTemplates,
    RunTemplate(String),
    SaveTemplate {
        name: String,
        query: String,
    },
    EditCell {
        id: RowId,
        column: String,
        value: String,
    },
    DeleteRow(RowId),
    InsertRow(Vec<(String, String)>),
    CreateTable {
        name: String,
        columns: Vec<ColumnDefinition>,
    },
    DropTable,
    Backup,
    Restore,
    Export(Option<String>),
}

pub fn all_commands_info() -> Vec<(&'static str, &'static str)> {
    vec![
        ("\\q", "Quit"),
        ("\\?", "Show this help"),
        ("\\d", "List tables"),
        ("\\d NAME", "Open table NAME"),
        ("\\table", "Leave the query result, show the table rows again"),
        ("\\t", "List saved SQL templates"),
        ("\\run NAME", "Run template NAME against the open table"),
        ("\\save NAME SQL", "Save SQL as template NAME"),
        ("\\edit ID COLUMN VALUE", "Set COLUMN of row ID to VALUE"),
        ("\\del ID", "Delete row ID"),
        ("\\insert COL=VALUE ...", "Add a row to the open table"),
        ("\\create NAME COL:TYPE[:pk] ...", "Create a table"),
        ("\\drop", "Drop the open table"),
        ("\\backup", "Back up the database"),
        ("\\restore", "Restore the database from its backup"),
        ("\\export [DIR]", "Export the displayed rows as a spreadsheet"),
    ]
}

fn parse_column(definition: &str) -> Result<ColumnDefinition, String> {
    let mut parts = definition.split(':');
    let name = parts.next().unwrap_or_default();
    let r#type = parts
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| format!("column {definition:?} has no type, expected NAME:TYPE[:pk]"))?;

    let column = ColumnDefinition::new(name, r#type.to_uppercase());
    match parts.next() {
        None => Ok(column),
        Some(flag) if flag.eq_ignore_ascii_case("pk") => Ok(column.primary_key()),
        Some(flag) => Err(format!("unknown column flag {flag:?}")),
    }
}

fn parse_assignment(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected COLUMN=VALUE, got {pair:?}"))
}

fn parse_id(id: &str) -> Result<RowId, String> {
    id.parse().map_err(|_| "missing row id".to_string())
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (c, arg) = match s.split_once(' ') {
            Some((a, b)) => (a, Some(b.trim())),
            None => (s, None),
        };

        Ok(match (c, arg) {
            ("q", None) | ("quit", None) => Self::Quit,
            ("?", None) => Self::Help,
            ("d", None) => Self::ListTables,
            ("d", Some(name)) => Self::SelectTable(name.into()),
            ("table", None) => Self::TableView,
            ("t", None) => Self::ListTemplates,
            ("run", Some(name)) => Self::RunTemplate(name.into()),
            ("save", Some(rest)) => {
                let (name, query) = rest
                    .split_once(' ')
                    .ok_or_else(|| "usage: \\save NAME SQL".to_string())?;
                Self::SaveTemplate {
                    name: name.into(),
                    query: query.trim().into(),
                }
            }
            ("edit", Some(rest)) => {
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(id), Some(column), Some(value)) => Self::EditCell {
                        id: parse_id(id)?,
                        column: column.into(),
                        value: value.into(),
                    },
                    _ => return Err("usage: \\edit ID COLUMN VALUE".to_string()),
                }
            }
            ("del", Some(id)) => Self::DeleteRow(parse_id(id)?),
            ("insert", Some(rest)) => Self::InsertRow(
                rest.split_whitespace()
                    .map(parse_assignment)
                    .collect::<Result<_, _>>()?,
            ),
            ("create", Some(rest)) => {
                let mut parts = rest.split_whitespace();
                let name = parts.next().unwrap_or_default().to_string();
                let columns = parts.map(parse_column).collect::<Result<_, _>>()?;
                Self::CreateTable { name, columns }
            }
            ("drop", None) => Self::DropTable,
            ("backup", None) => Self::Backup,
            ("restore", None) => Self::Restore,
            ("export", dir) => Self::Export(dir.map(String::from)),
            _ => return Err(format!("'\\{s}' is not a valid command")),
        })
    }
}
