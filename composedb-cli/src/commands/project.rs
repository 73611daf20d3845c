//! Show the resolved compose project and its services.

use crate::cli::GlobalFlags;
use crate::formatter::{self, OutputFormat};
use clap::Args;
use composedb::ProjectConfig;
use std::io::Write;
use tabled::Tabled;

/// Show the resolved compose project
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Output format: table, json or yaml
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "SERVICE")]
    name: String,
    #[tabled(rename = "TYPE")]
    service_type: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "PORTS")]
    ports: String,
}

pub async fn execute(args: ProjectArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let rt = global.create_runtime()?;
    let project = rt.find_project(&global.find_options()?).await?;

    let mut stdout = std::io::stdout().lock();
    formatter::print_output(&mut stdout, project.as_ref(), format, print_project_table)
}

fn print_project_table<W: Write>(writer: &mut W, project: &ProjectConfig) -> anyhow::Result<()> {
    if project.descriptor_path.is_empty() {
        writeln!(writer, "Project: {}", project.name)?;
    } else {
        writeln!(writer, "Project: {} ({})", project.name, project.descriptor_path)?;
    }

    if project.services.is_empty() {
        writeln!(writer, "No services declared")?;
        return Ok(());
    }

    let rows = project.services.values().map(|service| ServiceRow {
        name: service.name.clone(),
        service_type: service.service_type.to_string(),
        image: service
            .image
            .clone()
            .or_else(|| service.build.as_ref().map(|b| format!("build: {}", b.context)))
            .unwrap_or_else(|| "-".to_string()),
        ports: service.ports.join(", "),
    });
    writeln!(writer, "{}", formatter::create_table(rows))?;
    Ok(())
}
