use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Render rows as a rounded table or pretty JSON.
pub(crate) fn render<T: Tabled + Serialize>(
    rows: &[T],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            Ok(table.to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(rows),
    }
}

/// Placeholder for empty optional cells.
pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}
