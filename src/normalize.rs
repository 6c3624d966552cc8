//! Re-keying of flat records between the wire convention (`client_id`) and
//! the local convention (`clientId`).
//!
//! Only keys are touched: values are moved over as-is and nested values are
//! not recursed into. Output keys keep the input's enumeration order.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::data_types::{ColumnDescriptor, NamingConvention, Row, TableSnapshot};

lazy_static! {
    static ref UPPERCASE: Regex = Regex::new("[A-Z]").expect("valid regex");
    static ref UNDERSCORE_LOWER: Regex = Regex::new("_([a-z])").expect("valid regex");
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Keys {first:?} and {second:?} both map to {key:?} in the {convention} convention")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
        convention: NamingConvention,
    },
}

/// `clientId` -> `client_id`
pub fn to_snake_case(key: &str) -> String {
    UPPERCASE
        .replace_all(key, |caps: &Captures| format!("_{}", caps[0].to_lowercase()))
        .into_owned()
}

/// `client_id` -> `clientId`
pub fn to_camel_case(key: &str) -> String {
    UNDERSCORE_LOWER
        .replace_all(key, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

pub fn convert_key(key: &str, target: NamingConvention) -> String {
    match target {
        NamingConvention::Wire => to_snake_case(key),
        NamingConvention::Local => to_camel_case(key),
    }
}

/// Convert `keys` into `target`, in order. Two input keys landing on the
/// same output key are reported instead of letting one silently shadow the
/// other.
fn convert_keys<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    target: NamingConvention,
) -> Result<Vec<String>, NormalizeError> {
    let mut converted: Vec<String> = Vec::new();
    // output key -> input key that produced it
    let mut origins: Vec<&str> = Vec::new();

    for key in keys {
        let candidate = convert_key(key, target);
        if let Some(i) = converted.iter().position(|k| *k == candidate) {
            return Err(NormalizeError::KeyCollision {
                key: candidate,
                first: origins[i].to_string(),
                second: key.to_string(),
                convention: target,
            });
        }
        converted.push(candidate);
        origins.push(key);
    }

    Ok(converted)
}

/// Re-key a record into `target`, failing on key collisions.
pub fn rekey(record: &Row, target: NamingConvention) -> Result<Row, NormalizeError> {
    let keys = convert_keys(record.keys().map(String::as_str), target)?;
    Ok(keys.into_iter().zip(record.values().cloned()).collect())
}

pub fn wire_format(record: &Row) -> Result<Row, NormalizeError> {
    rekey(record, NamingConvention::Wire)
}

pub fn local_format(record: &Row) -> Result<Row, NormalizeError> {
    rekey(record, NamingConvention::Local)
}

pub fn local_rows(rows: &[Row]) -> Result<Vec<Row>, NormalizeError> {
    rows.iter().map(local_format).collect()
}

/// Convert column names and row keys together so that every row key can
/// still be looked up among the columns.
pub fn rekey_snapshot(
    snapshot: &TableSnapshot,
    target: NamingConvention,
) -> Result<TableSnapshot, NormalizeError> {
    let names = convert_keys(snapshot.columns.iter().map(|c| c.name.as_str()), target)?;
    let columns = names
        .into_iter()
        .zip(&snapshot.columns)
        .map(|(name, c)| ColumnDescriptor {
            name,
            r#type: c.r#type.clone(),
        })
        .collect();
    let rows = snapshot
        .rows
        .iter()
        .map(|row| rekey(row, target))
        .collect::<Result<_, _>>()?;

    Ok(TableSnapshot { columns, rows })
}

/// Bring a snapshot fetched from the server into the local convention.
pub fn local_snapshot(snapshot: TableSnapshot) -> Result<TableSnapshot, NormalizeError> {
    rekey_snapshot(&snapshot, NamingConvention::Local)
}

/// Put a locally held snapshot back into the wire convention.
pub fn wire_snapshot(snapshot: &TableSnapshot) -> Result<TableSnapshot, NormalizeError> {
    rekey_snapshot(snapshot, NamingConvention::Wire)
}
