// Output formatting utilities for CLI commands.
// Provides unified formatting for the table, JSON and YAML output formats.

use anyhow::{Result, anyhow};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse output format from string.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: table, json, yaml",
                s
            )),
        }
    }
}

/// Format data as JSON string.
pub fn format_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).map_err(|e| anyhow!("JSON serialization failed: {}", e))
}

/// Format data as YAML string.
pub fn format_yaml<T: Serialize>(data: &T) -> Result<String> {
    serde_yaml::to_string(data).map_err(|e| anyhow!("YAML serialization failed: {}", e))
}

/// Print data in the specified format to the provided writer.
///
/// For table format, uses the provided `table_printer` function.
/// For JSON/YAML, serializes the data and writes to the writer.
///
/// # Arguments
///
/// * `writer` - The writer to output to (e.g., stdout, file, buffer)
/// * `data` - The data to format (must implement `Serialize`)
/// * `format` - The output format
/// * `table_printer` - Function to print table format (only called for Table format)
pub fn print_output<T, W, F>(
    writer: &mut W,
    data: &T,
    format: OutputFormat,
    table_printer: F,
) -> Result<()>
where
    T: Serialize,
    W: std::io::Write,
    F: FnOnce(&mut W, &T) -> Result<()>,
{
    match format {
        OutputFormat::Table => table_printer(writer, data),
        OutputFormat::Json => {
            writeln!(writer, "{}", format_json(data)?)?;
            Ok(())
        }
        OutputFormat::Yaml => {
            // serde_yaml already ends documents with a newline
            write!(writer, "{}", format_yaml(data)?)?;
            Ok(())
        }
    }
}

/// Create a standard table with ComposeDB styling.
pub fn create_table<T: Tabled>(data: impl IntoIterator<Item = T>) -> Table {
    let mut table = Table::new(data);
    table.with(Style::sharp());
    table
}

/// Render an optional value for a table cell.
pub fn cell(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
