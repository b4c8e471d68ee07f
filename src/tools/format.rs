//! Output formatting for query results.
//!
//! Rows are rendered as JSON (default), an ASCII table like the `bq` CLI, or a
//! markdown table.

use crate::error::{BqError, BqResult};
use crate::models::Row;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of row objects (default)
    #[default]
    Json,
    /// ASCII table
    Table,
    /// Markdown table
    Markdown,
}

/// Render rows in the requested format.
pub fn render_rows(rows: &[Row], format: OutputFormat, elapsed_ms: u64) -> BqResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(rows)
            .map_err(|e| BqError::internal(format!("Failed to serialize rows: {}", e))),
        OutputFormat::Table => Ok(format_as_table(&column_names(rows), rows, elapsed_ms)),
        OutputFormat::Markdown => Ok(format_as_markdown(&column_names(rows), rows)),
    }
}

/// Column names in first-seen order across all rows.
pub fn column_names(rows: &[Row]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_as_table(columns: &[String], rows: &[Row], elapsed_ms: u64) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                widths[i] = widths[i].max(format_value(value).width());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    for (col, w) in columns.iter().zip(&widths) {
        output.push_str(&format!("| {} ", pad(col, *w, Align::Center)));
    }
    output.push_str("|\n");
    output.push_str(&separator);

    for row in rows {
        for (col, w) in columns.iter().zip(&widths) {
            let value = row.get(col).unwrap_or(&JsonValue::Null);
            let align = if value.is_number() {
                Align::Right
            } else {
                Align::Left
            };
            output.push_str(&format!("| {} ", pad(&format_value(value), *w, align)));
        }
        output.push_str("|\n");
    }
    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        rows.len(),
        row_text,
        elapsed_ms as f64 / 1000.0
    ));
    output
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width; `format!` width counts chars, not terminal columns.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

pub fn format_as_markdown(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output: String = columns.iter().map(|c| format!("| {} ", c)).collect::<String>() + "|\n";
    output.push_str(&(columns.iter().map(|_| "|---").collect::<String>() + "|\n"));

    for row in rows {
        for col in columns {
            let value = row.get(col).unwrap_or(&JsonValue::Null);
            let cell = format_value(value).replace('|', "\\|");
            output.push_str(&format!("| {} ", cell));
        }
        output.push_str("|\n");
    }

    output.push_str(&format!("\n*{} rows*", rows.len()));
    output
}
