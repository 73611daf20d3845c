//! Show connection parameters of a database service.

use crate::cli::GlobalFlags;
use crate::formatter::{self, OutputFormat, cell};
use clap::Args;
use composedb::ConnectionInfo;
use std::io::Write;
use tabled::Tabled;

/// Show connection parameters of a database service
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Service name in the compose project
    pub service: String,

    /// Output format: table, json or yaml
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "HOST")]
    host: String,
    #[tabled(rename = "PORT")]
    port: String,
    #[tabled(rename = "USER")]
    user: String,
    #[tabled(rename = "PASSWORD")]
    password: String,
    #[tabled(rename = "DATABASE")]
    database: String,
}

impl From<&ConnectionInfo> for ConnectionRow {
    fn from(info: &ConnectionInfo) -> Self {
        Self {
            host: info.host.clone(),
            port: cell(info.port),
            user: cell(info.user.as_ref()),
            password: if info.password.is_some() {
                "(set)".to_string()
            } else {
                "-".to_string()
            },
            database: cell(info.database.as_ref()),
        }
    }
}

pub async fn execute(args: ConnectionArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let rt = global.create_runtime()?;
    let info = rt
        .connection_info(&global.target(&args.service)?)
        .await?;

    let mut stdout = std::io::stdout().lock();
    formatter::print_output(&mut stdout, &info, format, |w, info| {
        writeln!(w, "{}", formatter::create_table([ConnectionRow::from(info)]))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_hides_password() {
        let info = ConnectionInfo {
            host: "localhost".into(),
            port: Some(6379),
            user: None,
            password: Some("hunter2".into()),
            database: Some("0".into()),
        };

        let row = ConnectionRow::from(&info);
        assert_eq!(row.port, "6379");
        assert_eq!(row.user, "-");
        assert_eq!(row.password, "(set)");
    }
}
