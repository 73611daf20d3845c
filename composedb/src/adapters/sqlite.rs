//! SQLite adapter (`sqlite3` against a file inside the container).

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{
    AdapterContext, BackupOptions, ConnectionInfo, DatabaseAdapter, DbStatus, QueryFormat,
    QueryOptions, RestoreOptions, ServiceTarget, env_value,
};
use crate::exec::ExecOptions;
use crate::project::{ServiceConfig, ServiceType};
use composedb_shared::errors::ComposeDbResult;

const DEFAULT_DATABASE_PATH: &str = "/data/database.db";
const PATH_VARIABLES: [&str; 2] = ["SQLITE_DATABASE", "DATABASE_PATH"];

const VERSION_QUERY: &str = "SELECT sqlite_version();";
const TABLE_COUNT_QUERY: &str = "SELECT count(*) FROM sqlite_master WHERE type='table';";

pub struct SqliteAdapter {
    ctx: AdapterContext,
}

impl SqliteAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn database_path(conn: &ConnectionInfo, database: Option<&String>) -> String {
        database
            .or(conn.database.as_ref())
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
    }
}

fn is_dot_command(query: &str) -> bool {
    query.trim_start().starts_with('.')
}

fn query_command(path: &str, query: &str, format: QueryFormat) -> Vec<String> {
    let mut command = vec!["sqlite3".to_string()];
    match format {
        QueryFormat::Table => command.extend(["-header", "-column"].map(String::from)),
        QueryFormat::Json => command.push("-json".to_string()),
        QueryFormat::Csv => command.extend(["-header", "-csv"].map(String::from)),
    }
    command.extend([path.to_string(), query.to_string()]);
    command
}

/// `.backup` dot-command with the path quoted for the sqlite shell.
fn backup_command(path: &str, output_path: &str) -> Vec<String> {
    vec![
        "sqlite3".to_string(),
        path.to_string(),
        format!(".backup '{}'", output_path.replace('\'', "''")),
    ]
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn engine(&self) -> ServiceType {
        ServiceType::Sqlite
    }

    async fn query(
        &self,
        target: &ServiceTarget,
        query: &str,
        options: &QueryOptions,
    ) -> ComposeDbResult<String> {
        let service = self.ctx.resolve(target).await?;
        if !is_dot_command(query) {
            self.ctx.validator.validate(query)?;
        }

        let conn = self.connection_info(&service.config, &service.env);
        let path = Self::database_path(&conn, options.database.as_ref());
        let command = query_command(&path, query, options.format);

        self.ctx
            .run(&service, &command, &ExecOptions::default())
            .await
    }

    async fn backup(
        &self,
        target: &ServiceTarget,
        options: &BackupOptions,
    ) -> ComposeDbResult<String> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        let path = Self::database_path(&conn, options.database.as_ref());
        let output_path = options
            .output_path
            .clone()
            .unwrap_or_else(|| self.ctx.default_backup_path(&target.service, "db"));

        self.ctx.ensure_parent_dir(&service, &output_path).await?;
        self.ctx
            .run(
                &service,
                &backup_command(&path, &output_path),
                &ExecOptions::default(),
            )
            .await?;

        tracing::info!(service = %target.service, path = %output_path, "SQLite backup written");
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
        let path = Self::database_path(&conn, options.database.as_ref());

        self.ctx
            .run(
                &service,
                &["cp", backup_path, path.as_str()],
                &ExecOptions::default(),
            )
            .await?;

        tracing::info!(service = %target.service, path = %backup_path, "SQLite database restored");
        Ok(())
    }

    async fn status(&self, target: &ServiceTarget) -> ComposeDbResult<DbStatus> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        let path = Self::database_path(&conn, None);

        let version = self
            .ctx
            .run(&service, &["sqlite3", path.as_str(), VERSION_QUERY], &ExecOptions::default())
            .await?;
        let tables = self
            .ctx
            .run(
                &service,
                &["sqlite3", path.as_str(), TABLE_COUNT_QUERY],
                &ExecOptions::default(),
            )
            .await?;

        let mut status = DbStatus::healthy(ServiceType::Sqlite, version.trim());
        status
            .additional
            .insert("path".to_string(), serde_json::Value::from(path));
        if let Ok(count) = tables.trim().parse::<u64>() {
            status
                .additional
                .insert("tables".to_string(), serde_json::Value::from(count));
        }
        Ok(status)
    }

    fn connection_info(
        &self,
        service: &ServiceConfig,
        env: &BTreeMap<String, String>,
    ) -> ConnectionInfo {
        let path = PATH_VARIABLES
            .iter()
            .find_map(|key| env_value(service, env, key))
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        ConnectionInfo {
            host: "localhost".to_string(),
            port: None,
            user: None,
            password: None,
            database: Some(path),
        }
    }
}
