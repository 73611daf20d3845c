//! PostgreSQL adapter (`psql`, `pg_dump`, `pg_restore`).

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use super::{
    AdapterContext, BackupFormat, BackupOptions, ConnectionInfo, DatabaseAdapter, DbStatus,
    QueryFormat, QueryOptions, ResolvedService, RestoreOptions, ServiceTarget, env_value,
    shell_quote,
};
use crate::exec::ExecOptions;
use crate::project::{ServiceConfig, ServiceType};
use composedb_shared::errors::ComposeDbResult;

const DEFAULT_USER: &str = "postgres";
const DEFAULT_DATABASE: &str = "postgres";
const DEFAULT_PORT: u16 = 5432;

/// Environment variable carrying the password to the client tools.
const PASSWORD_ENV: &str = "PGPASSWORD";

/// Extensions restored with `pg_restore`; anything else is plain SQL.
const ARCHIVE_EXTENSIONS: &[&str] = &["dump", "tar", "backup"];

const VERSION_QUERY: &str = "SELECT version();";
const SIZE_QUERY: &str = "SELECT pg_size_pretty(pg_database_size(current_database()));";
const CONNECTIONS_QUERY: &str = "SELECT count(*) FROM pg_stat_activity;";
const UPTIME_QUERY: &str = "SELECT date_trunc('second', current_timestamp - pg_postmaster_start_time());";

pub struct PostgresAdapter {
    ctx: AdapterContext,
}

impl PostgresAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn exec_options(conn: &ConnectionInfo) -> ExecOptions {
        match &conn.password {
            Some(password) => ExecOptions::default().with_env(PASSWORD_ENV, password.clone()),
            None => ExecOptions::default(),
        }
    }

    /// `psql -U <user> -d <db>` for the given overrides.
    fn client_args(
        conn: &ConnectionInfo,
        user: Option<&String>,
        database: Option<&String>,
    ) -> Vec<String> {
        vec![
            "psql".to_string(),
            "-U".to_string(),
            user.or(conn.user.as_ref())
                .cloned()
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            "-d".to_string(),
            database
                .or(conn.database.as_ref())
                .cloned()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        ]
    }

    async fn scalar(
        &self,
        service: &ResolvedService,
        conn: &ConnectionInfo,
        sql: &str,
    ) -> ComposeDbResult<String> {
        let mut command = Self::client_args(conn, None, None);
        command.extend(["-c".to_string(), sql.to_string()]);
        let output = self
            .ctx
            .run(service, &command, &Self::exec_options(conn))
            .await?;
        Ok(parse_scalar_table(&output))
    }
}

/// Build the client command for `query`.
fn query_command(
    conn: &ConnectionInfo,
    query: &str,
    options: &QueryOptions,
) -> Vec<String> {
    let mut command =
        PostgresAdapter::client_args(conn, options.user.as_ref(), options.database.as_ref());

    let sql = if is_meta_command(query) {
        query.to_string()
    } else {
        match options.format {
            QueryFormat::Table => query.to_string(),
            QueryFormat::Csv => {
                command.push("--csv".to_string());
                query.to_string()
            }
            QueryFormat::Json => {
                command.extend(["-A".to_string(), "-t".to_string()]);
                format!(
                    "SELECT json_agg(t) FROM ({}) t",
                    query.trim().trim_end_matches(';')
                )
            }
        }
    };

    command.extend(["-c".to_string(), sql]);
    command
}

/// `(flag, extension)` for a dump format.
///
/// A directory dump has no extension, so `restore` treats it as a plain SQL
/// file and pipes it into `psql`, which fails. Directory dumps written here
/// must be restored with `pg_restore` by hand.
fn dump_format(format: BackupFormat) -> (&'static str, &'static str) {
    match format {
        BackupFormat::Custom => ("-Fc", "dump"),
        BackupFormat::Tar => ("-Ft", "tar"),
        BackupFormat::Directory => ("-Fd", ""),
        BackupFormat::Sql => ("-Fp", "sql"),
    }
}

fn is_meta_command(query: &str) -> bool {
    query.trim_start().starts_with('\\')
}

fn is_archive(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARCHIVE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Extract the single value from psql's aligned table output.
///
/// Non-blank lines are header, separator, value, row count. The value is the
/// third line when there are at least three, else the second; a separator
/// in that position (or fewer than two lines) means no value.
pub fn parse_scalar_table(output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();

    let candidate = match lines.len() {
        0 | 1 => return String::new(),
        2 => lines[1],
        _ => lines[2],
    }
    .trim();

    if candidate.chars().all(|c| c == '-' || c == '+') {
        return String::new();
    }
    candidate.to_string()
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn engine(&self) -> ServiceType {
        ServiceType::Postgresql
    }

    async fn query(
        &self,
        target: &ServiceTarget,
        query: &str,
        options: &QueryOptions,
    ) -> ComposeDbResult<String> {
        let service = self.ctx.resolve(target).await?;
        if !is_meta_command(query) {
            self.ctx.validator.validate(query)?;
        }

        let conn = self.connection_info(&service.config, &service.env);
        let command = query_command(&conn, query, options);
        tracing::debug!(service = %target.service, "Running psql query");

        self.ctx
            .run(&service, &command, &Self::exec_options(&conn))
            .await
    }

    async fn backup(
        &self,
        target: &ServiceTarget,
        options: &BackupOptions,
    ) -> ComposeDbResult<String> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);

        let (flag, extension) = dump_format(options.format);
        let output_path = options
            .output_path
            .clone()
            .unwrap_or_else(|| self.ctx.default_backup_path(&target.service, extension));

        let mut command = Self::client_args(&conn, options.user.as_ref(), options.database.as_ref());
        command[0] = "pg_dump".to_string();
        command.extend([flag.to_string(), "-f".to_string(), output_path.clone()]);
        for table in &options.tables {
            command.extend(["-t".to_string(), table.clone()]);
        }

        self.ctx.ensure_parent_dir(&service, &output_path).await?;
        self.ctx
            .run(&service, &command, &Self::exec_options(&conn))
            .await?;

        tracing::info!(service = %target.service, path = %output_path, "PostgreSQL backup written");
        Ok(output_path)
    }

    async fn restore(
        &self,
        target: &ServiceTarget,
        backup_path: &str,
        options: &RestoreOptions,
    ) -> ComposeDbResult<()> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        let mut client = Self::client_args(&conn, options.user.as_ref(), options.database.as_ref());

        let command = if is_archive(backup_path) {
            client[0] = "pg_restore".to_string();
            if options.clean {
                client.extend(["--clean".to_string(), "--if-exists".to_string()]);
            }
            if options.data_only {
                client.push("--data-only".to_string());
            }
            if options.schema_only {
                client.push("--schema-only".to_string());
            }
            client.push(backup_path.to_string());
            client
        } else {
            client.extend(["-v".to_string(), "ON_ERROR_STOP=1".to_string()]);
            let piped = format!(
                "{} < {}",
                client
                    .iter()
                    .map(|a| shell_quote(a))
                    .collect::<Vec<_>>()
                    .join(" "),
                shell_quote(backup_path)
            );
            vec!["sh".to_string(), "-c".to_string(), piped]
        };

        self.ctx
            .run(&service, &command, &Self::exec_options(&conn))
            .await?;
        tracing::info!(service = %target.service, path = %backup_path, "PostgreSQL restore complete");
        Ok(())
    }

    async fn status(&self, target: &ServiceTarget) -> ComposeDbResult<DbStatus> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);

        let version = self.scalar(&service, &conn, VERSION_QUERY).await?;
        let size = self.scalar(&service, &conn, SIZE_QUERY).await?;
        let connections = self.scalar(&service, &conn, CONNECTIONS_QUERY).await?;
        let uptime = self.scalar(&service, &conn, UPTIME_QUERY).await?;

        let mut status = DbStatus::healthy(ServiceType::Postgresql, version);
        status.size = Some(size).filter(|s| !s.is_empty());
        status.connections = connections.parse().ok();
        status.uptime = Some(uptime).filter(|s| !s.is_empty());
        Ok(status)
    }

    fn connection_info(
        &self,
        service: &ServiceConfig,
        env: &BTreeMap<String, String>,
    ) -> ConnectionInfo {
        ConnectionInfo {
            host: "localhost".to_string(),
            port: Some(
                env_value(service, env, "PGPORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
            ),
            user: Some(
                env_value(service, env, "POSTGRES_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            ),
            password: env_value(service, env, "POSTGRES_PASSWORD"),
            database: Some(
                env_value(service, env, "POSTGRES_DB")
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionInfo {
        ConnectionInfo {
            host: "localhost".into(),
            port: Some(5432),
            user: Some("app".into()),
            password: None,
            database: Some("shop".into()),
        }
    }

    #[test]
    fn test_parse_scalar_table() {
        assert_eq!(parse_scalar_table("size\n----\n11 MB\n(1 row)\n"), "11 MB");
        assert_eq!(parse_scalar_table("size\n----\n"), "");
        assert_eq!(parse_scalar_table("  count \n-------\n     3\n(1 row)\n\n"), "3");
        assert_eq!(parse_scalar_table("only"), "");
        assert_eq!(parse_scalar_table(""), "");
        assert_eq!(parse_scalar_table("x\n42\n"), "42");
    }

    #[test]
    fn test_query_command_table() {
        let cmd = query_command(&conn(), "SELECT 1", &QueryOptions::default());
        assert_eq!(cmd, vec!["psql", "-U", "app", "-d", "shop", "-c", "SELECT 1"]);
    }

    #[test]
    fn test_query_command_overrides_and_csv() {
        let options = QueryOptions {
            database: Some("other".into()),
            user: Some("admin".into()),
            format: QueryFormat::Csv,
        };
        let cmd = query_command(&conn(), "SELECT 1", &options);
        assert_eq!(
            cmd,
            vec!["psql", "-U", "admin", "-d", "other", "--csv", "-c", "SELECT 1"]
        );
    }

    #[test]
    fn test_query_command_json_wraps_statement() {
        let options = QueryOptions {
            format: QueryFormat::Json,
            ..QueryOptions::default()
        };
        let cmd = query_command(&conn(), "SELECT id FROM users;", &options);
        assert_eq!(
            &cmd[5..],
            &["-A", "-t", "-c", "SELECT json_agg(t) FROM (SELECT id FROM users) t"]
        );
    }

    #[test]
    fn test_meta_command_ignores_format() {
        let options = QueryOptions {
            format: QueryFormat::Json,
            ..QueryOptions::default()
        };
        let cmd = query_command(&conn(), "\\dt", &options);
        assert_eq!(cmd.last().map(String::as_str), Some("\\dt"));
        assert!(!cmd.contains(&"-A".to_string()));
    }

    #[test]
    fn test_archive_detection() {
        assert!(is_archive("/backups/db.dump"));
        assert!(is_archive("/backups/db.TAR"));
        assert!(!is_archive("/backups/db.sql"));
        assert!(!is_archive("/backups/db"));
    }

    #[test]
    fn test_directory_dump_is_not_restorable_as_archive() {
        let (flag, extension) = dump_format(BackupFormat::Directory);
        assert_eq!((flag, extension), ("-Fd", ""));
        assert!(!is_archive("/backups/db_backup_20240101_000000"));
    }
}
