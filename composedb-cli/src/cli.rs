//! CLI definition and argument parsing for composedb-cli.
//! This module contains the main CLI structure, the subcommand list and the
//! global flags that locate the compose project.

use clap::{Args, Parser, Subcommand};
use composedb::{ComposeDbRuntime, FindProjectOptions, ServiceTarget};
use std::path::PathBuf;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "composedb",
    author,
    version,
    about = "Database operations for services of a compose project"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[non_exhaustive]
pub enum Commands {
    /// Show the resolved compose project
    Project(crate::commands::project::ProjectArgs),

    /// Run a query against a database service
    Query(crate::commands::query::QueryArgs),

    /// Back up a database service
    Backup(crate::commands::backup::BackupArgs),

    /// Restore a database service from a backup
    Restore(crate::commands::restore::RestoreArgs),

    /// Show health and statistics of a database service
    Status(crate::commands::status::StatusArgs),

    /// Show connection parameters of a database service
    #[command(visible_alias = "conn")]
    Connection(crate::commands::connection::ConnectionArgs),
}

// ============================================================================
// GLOBAL FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// ComposeDB home directory (holds config.json)
    #[arg(long, global = true, env = "COMPOSEDB_HOME")]
    pub home: Option<PathBuf>,

    /// Compose descriptor to use instead of searching for one
    #[arg(short = 'f', long = "file", global = true, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Directory the descriptor search starts from (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_directory: Option<PathBuf>,

    /// Project name
    #[arg(short = 'p', long = "project-name", global = true, value_name = "NAME")]
    pub project_name: Option<String>,

    /// Environment whose docker-compose.<ENV>.yml layer is merged
    #[arg(long, global = true, env = "COMPOSEDB_ENV", value_name = "ENV")]
    pub env: Option<String>,
}

impl GlobalFlags {
    pub fn create_runtime(&self) -> anyhow::Result<ComposeDbRuntime> {
        let home_dir = self.home.clone().unwrap_or_else(|| {
            let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(".composedb");
            path
        });

        // Load configuration from file
        let mut options = crate::config::load_config(&home_dir);

        // CLI flags win over the config file
        if let Some(env) = self.env.as_ref().filter(|e| !e.is_empty()) {
            options.environment = Some(env.clone());
        }

        ComposeDbRuntime::new(options).map_err(Into::into)
    }

    /// Project lookup options for the flags given on the command line.
    pub fn find_options(&self) -> anyhow::Result<FindProjectOptions> {
        let working_dir = match &self.project_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        Ok(FindProjectOptions {
            project_name: self.project_name.clone(),
            descriptor_path: self.file.clone(),
            working_dir: Some(working_dir),
        })
    }

    pub fn target(&self, service: &str) -> anyhow::Result<ServiceTarget> {
        Ok(ServiceTarget::new(service).with_find_options(self.find_options()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "composedb",
            "status",
            "db",
            "-f",
            "/srv/app/compose.yml",
            "--env",
            "staging",
        ])
        .unwrap();

        assert_eq!(cli.global.file, Some(PathBuf::from("/srv/app/compose.yml")));
        assert_eq!(cli.global.env.as_deref(), Some("staging"));
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_find_options_use_project_directory() {
        let cli = Cli::try_parse_from([
            "composedb",
            "--project-directory",
            "/srv/app",
            "-p",
            "shop",
            "project",
        ])
        .unwrap();

        let find = cli.global.find_options().unwrap();
        assert_eq!(find.working_dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(find.project_name.as_deref(), Some("shop"));
        assert!(find.descriptor_path.is_none());
    }

    #[test]
    fn test_target_carries_service_name() {
        let cli = Cli::try_parse_from(["composedb", "connection", "cache"]).unwrap();
        let target = cli.global.target("cache").unwrap();
        assert_eq!(target.service, "cache");
        assert!(target.project.is_none());
        assert!(target.find.working_dir.is_some());
    }
}
