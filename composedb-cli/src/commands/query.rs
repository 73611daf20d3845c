//! Run a query against a database service.

use crate::cli::GlobalFlags;
use clap::Args;
use composedb::{QueryFormat, QueryOptions};
use std::io::Write;

/// Run a query against a database service
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Service name in the compose project
    pub service: String,

    /// Query text (SQL, psql meta-command, sqlite dot-command or redis command)
    pub query: String,

    /// Output format: table, json or csv
    #[arg(long, default_value = "table")]
    pub format: QueryFormat,

    /// Database to connect to instead of the service default
    #[arg(short, long)]
    pub database: Option<String>,

    /// User to connect as instead of the service default
    #[arg(short, long)]
    pub user: Option<String>,
}

pub async fn execute(args: QueryArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let rt = global.create_runtime()?;
    let options = QueryOptions {
        database: args.database,
        user: args.user,
        format: args.format,
    };

    let output = rt
        .query(&global.target(&args.service)?, &args.query, &options)
        .await?;

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", output)?;
    if !output.is_empty() && !output.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
