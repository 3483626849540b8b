//! Output formatting for CLI

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Render rows as pretty JSON or a table; `None` means the caller prints text
pub fn format_rows<T: Serialize + Tabled>(rows: &[T], format: &str) -> Option<String> {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            Some(serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string()))
        }
        OutputFormat::Table => Some(Table::new(rows).to_string()),
        OutputFormat::Text => None,
    }
}
