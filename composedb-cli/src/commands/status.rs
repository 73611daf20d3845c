//! Show health and statistics of a database service.

use crate::cli::GlobalFlags;
use crate::formatter::{self, OutputFormat, cell};
use clap::Args;
use composedb::{DbHealth, DbStatus};
use std::io::Write;
use tabled::Tabled;

/// Show health and statistics of a database service
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Service name in the compose project
    pub service: String,

    /// Output format: table, json or yaml
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

impl FieldRow {
    fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub async fn execute(args: StatusArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let rt = global.create_runtime()?;
    let status = rt.status(&global.target(&args.service)?).await?;

    let mut stdout = std::io::stdout().lock();
    formatter::print_output(&mut stdout, &status, format, print_status_table)
}

fn health_label(health: DbHealth) -> &'static str {
    match health {
        DbHealth::Healthy => "healthy",
        DbHealth::Unhealthy => "unhealthy",
    }
}

fn print_status_table<W: Write>(writer: &mut W, status: &DbStatus) -> anyhow::Result<()> {
    let mut rows = vec![
        FieldRow::new("type", status.engine.to_string()),
        FieldRow::new("version", status.version.clone()),
        FieldRow::new("status", health_label(status.status)),
        FieldRow::new("size", cell(status.size.as_ref())),
        FieldRow::new("connections", cell(status.connections)),
        FieldRow::new("uptime", cell(status.uptime.as_ref())),
        FieldRow::new("memory", cell(status.memory_usage.as_ref())),
    ];
    rows.extend(status.additional.iter().map(|(key, value)| {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        FieldRow::new(key, rendered)
    }));

    writeln!(writer, "{}", formatter::create_table(rows))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use composedb::ServiceType;

    #[test]
    fn test_status_table() {
        let mut status = DbStatus::healthy(ServiceType::Redis, "7.2.4");
        status.status = DbHealth::Unhealthy;
        status.connections = Some(3);
        status
            .additional
            .insert("role".into(), serde_json::Value::from("master"));

        let mut buffer = Vec::new();
        print_status_table(&mut buffer, &status).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("redis"));
        assert!(output.contains("7.2.4"));
        assert!(output.contains("unhealthy"));
        assert!(output.contains("master"));
        assert!(output.contains("memory"));
    }
}
