//! Back up a database service.

use crate::cli::GlobalFlags;
use clap::Args;
use composedb::{BackupFormat, BackupOptions};

/// Back up a database service
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Service name in the compose project
    pub service: String,

    /// Dump format: custom, sql, tar or directory
    #[arg(long, default_value = "custom")]
    pub format: BackupFormat,

    /// Backup path inside the container (default: timestamped file in the backup dir)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Only dump this table (can be specified multiple times)
    #[arg(short, long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Database to dump instead of the service default
    #[arg(short, long)]
    pub database: Option<String>,

    /// User to connect as instead of the service default
    #[arg(short, long)]
    pub user: Option<String>,
}

pub async fn execute(args: BackupArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let rt = global.create_runtime()?;
    let options = BackupOptions {
        database: args.database,
        user: args.user,
        format: args.format,
        output_path: args.output,
        tables: args.tables,
    };

    let path = rt.backup(&global.target(&args.service)?, &options).await?;
    println!("{}", path);
    Ok(())
}
