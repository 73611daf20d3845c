//! Restore a database service from a backup.

use crate::cli::GlobalFlags;
use clap::Args;
use composedb::RestoreOptions;

/// Restore a database service from a backup
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Service name in the compose project
    pub service: String,

    /// Backup path inside the container
    pub path: String,

    /// Drop existing objects before restoring them
    #[arg(long)]
    pub clean: bool,

    /// Restore only the data, not the schema
    #[arg(long, conflicts_with = "schema_only")]
    pub data_only: bool,

    /// Restore only the schema, not the data
    #[arg(long)]
    pub schema_only: bool,

    /// Database to restore into instead of the service default
    #[arg(short, long)]
    pub database: Option<String>,

    /// User to connect as instead of the service default
    #[arg(short, long)]
    pub user: Option<String>,
}

pub async fn execute(args: RestoreArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let rt = global.create_runtime()?;
    let options = RestoreOptions {
        database: args.database,
        user: args.user,
        clean: args.clean,
        data_only: args.data_only,
        schema_only: args.schema_only,
    };

    rt.restore(&global.target(&args.service)?, &args.path, &options)
        .await?;
    eprintln!("Restored {} from {}", args.service, args.path);
    Ok(())
}
