//! Plain-text rendering of snapshots for the terminal.

use crate::data_types::{format_cell, TableSnapshot};

const NO_COLUMNS: &str = "No columns";
const NO_DATA: &str = "No data";

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(len)))
}

/// Aligned table with a `name (type)` header line per column.
pub fn render_snapshot(snapshot: &TableSnapshot) -> String {
    if snapshot.columns.is_empty() {
        return NO_COLUMNS.to_string();
    }

    let header: Vec<String> = snapshot
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.r#type))
        .collect();
    let body: Vec<Vec<String>> = snapshot
        .rows
        .iter()
        .map(|row| {
            snapshot
                .columns
                .iter()
                .map(|c| row.get(&c.name).map(format_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .map(|cells| cells[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        line(&header),
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    ];
    if body.is_empty() {
        out.push(NO_DATA.to_string());
    } else {
        out.extend(body.iter().map(|cells| line(cells)));
    }
    out.join("\n")
}
