//! Redis adapter (`redis-cli`, RDB snapshots).

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{
    AdapterContext, BackupOptions, ConnectionInfo, DatabaseAdapter, DbHealth, DbStatus,
    QueryOptions, ResolvedService, RestoreOptions, ServiceTarget, env_value,
};
use crate::exec::ExecOptions;
use crate::project::{ServiceConfig, ServiceType};
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

const DEFAULT_PORT: u16 = 6379;
const DEFAULT_DATABASE: &str = "0";

/// RDB file written by the official image (`dir /data`, `dbfilename dump.rdb`).
pub const SNAPSHOT_PATH: &str = "/data/dump.rdb";

/// `INFO` key whose value is split into a nested mapping.
const KEYSPACE_KEY: &str = "db0";

pub struct RedisAdapter {
    ctx: AdapterContext,
}

impl RedisAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn cli_args(conn: &ConnectionInfo) -> Vec<String> {
        let mut args = vec!["redis-cli".to_string()];
        if let Some(password) = &conn.password {
            args.extend([
                "-a".to_string(),
                password.clone(),
                "--no-auth-warning".to_string(),
            ]);
        }
        args
    }

    async fn cli<S: AsRef<str>>(
        &self,
        service: &ResolvedService,
        conn: &ConnectionInfo,
        command: &[S],
    ) -> ComposeDbResult<String> {
        let mut args = Self::cli_args(conn);
        args.extend(command.iter().map(|s| s.as_ref().to_string()));
        self.ctx.run(service, &args, &ExecOptions::default()).await
    }

    /// Poll `INFO persistence` until no background save is running.
    async fn wait_for_snapshot(
        &self,
        service: &ResolvedService,
        conn: &ConnectionInfo,
    ) -> ComposeDbResult<()> {
        let policy = self.ctx.snapshot;

        for attempt in 1..=policy.attempts {
            let info = parse_info(&self.cli(service, conn, &["INFO", "persistence"]).await?);
            if info.field("rdb_bgsave_in_progress") != Some("1") {
                tracing::debug!(attempt, "Snapshot complete");
                return Ok(());
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        Err(ComposeDbError::BackupTimeout {
            service: service.config.name.clone(),
            attempts: policy.attempts,
        })
    }
}

/// Parsed `INFO` output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedisInfo {
    pub fields: BTreeMap<String, String>,
    /// `db0:keys=1,expires=0` split into `{keys: 1, expires: 0}`.
    pub keyspace: BTreeMap<String, String>,
}

impl RedisInfo {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Parse `INFO` text: `key:value` per line, `#` section headers ignored.
pub fn parse_info(output: &str) -> RedisInfo {
    let mut info = RedisInfo::default();

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        if key == KEYSPACE_KEY {
            info.keyspace = value
                .split(',')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        } else {
            info.fields.insert(key.to_string(), value.to_string());
        }
    }

    info
}

/// Render seconds as e.g. "2 days, 3 hours and 4 minutes".
///
/// Seconds below a minute are dropped; zero renders as "0 minutes".
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" }))
        .collect();

    match parts.as_slice() {
        [] => "0 minutes".to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn status_from_info(info: &RedisInfo) -> DbStatus {
    let degraded =
        info.field("loading") == Some("1") || info.field("rdb_last_bgsave_status") == Some("err");

    let mut status = DbStatus::healthy(
        ServiceType::Redis,
        info.field("redis_version").unwrap_or_default(),
    );
    if degraded {
        status.status = DbHealth::Unhealthy;
    }

    status.memory_usage = info.field("used_memory_human").map(str::to_string);
    status.uptime = info
        .field("uptime_in_seconds")
        .and_then(|s| s.parse().ok())
        .map(format_uptime);
    status.connections = info
        .field("connected_clients")
        .and_then(|s| s.parse().ok());
    status.size = info.keyspace.get("keys").map(|k| format!("{} keys", k));

    for key in ["role", "redis_mode"] {
        if let Some(value) = info.field(key) {
            status
                .additional
                .insert(key.to_string(), serde_json::Value::from(value));
        }
    }
    if !info.keyspace.is_empty() {
        let keyspace: serde_json::Map<String, serde_json::Value> = info
            .keyspace
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v.as_str())))
            .collect();
        status
            .additional
            .insert(KEYSPACE_KEY.to_string(), serde_json::Value::Object(keyspace));
    }

    status
}

#[async_trait]
impl DatabaseAdapter for RedisAdapter {
    fn engine(&self) -> ServiceType {
        ServiceType::Redis
    }

    async fn query(
        &self,
        target: &ServiceTarget,
        query: &str,
        _options: &QueryOptions,
    ) -> ComposeDbResult<String> {
        let words: Vec<&str> = query.split_whitespace().collect();
        if words.is_empty() {
            return Err(ComposeDbError::InvalidArgument(
                "redis command is empty".to_string(),
            ));
        }

        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        self.cli(&service, &conn, words.as_slice()).await
    }

    async fn backup(
        &self,
        target: &ServiceTarget,
        options: &BackupOptions,
    ) -> ComposeDbResult<String> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        let output_path = options
            .output_path
            .clone()
            .unwrap_or_else(|| self.ctx.default_backup_path(&target.service, "rdb"));

        self.cli(&service, &conn, &["BGSAVE"]).await?;
        self.wait_for_snapshot(&service, &conn).await?;

        self.ctx.ensure_parent_dir(&service, &output_path).await?;
        self.ctx
            .run(
                &service,
                &["cp", SNAPSHOT_PATH, output_path.as_str()],
                &ExecOptions::default(),
            )
            .await?;

        tracing::info!(service = %target.service, path = %output_path, "Redis snapshot copied");
        Ok(output_path)
    }

    /// Stop, overwrite the RDB file, start.
    ///
    /// Not atomic: a failure after the stop leaves the service stopped and
    /// possibly with a partially written snapshot.
    async fn restore(
        &self,
        target: &ServiceTarget,
        backup_path: &str,
        _options: &RestoreOptions,
    ) -> ComposeDbResult<()> {
        let service = self.ctx.resolve(target).await?;

        self.ctx.executor.stop_service(&service.location).await?;

        let one_off = ExecOptions {
            one_off: true,
            ..ExecOptions::default()
        };
        self.ctx
            .run(&service, &["cp", backup_path, SNAPSHOT_PATH], &one_off)
            .await?;

        self.ctx.executor.start_service(&service.location).await?;

        tracing::info!(service = %target.service, path = %backup_path, "Redis snapshot restored");
        Ok(())
    }

    async fn status(&self, target: &ServiceTarget) -> ComposeDbResult<DbStatus> {
        let service = self.ctx.resolve(target).await?;
        let conn = self.connection_info(&service.config, &service.env);
        let info = parse_info(&self.cli(&service, &conn, &["INFO"]).await?);
        Ok(status_from_info(&info))
    }

    fn connection_info(
        &self,
        service: &ServiceConfig,
        env: &BTreeMap<String, String>,
    ) -> ConnectionInfo {
        ConnectionInfo {
            host: "localhost".to_string(),
            port: Some(
                env_value(service, env, "REDIS_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
            ),
            user: None,
            password: env_value(service, env, "REDIS_PASSWORD"),
            database: Some(DEFAULT_DATABASE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\nuptime_in_seconds:93784\r\n\r\n# Clients\r\nconnected_clients:3\r\n\r\n# Memory\r\nused_memory_human:1.05M\r\n\r\n# Persistence\r\nloading:0\r\nrdb_bgsave_in_progress:0\r\nrdb_last_bgsave_status:ok\r\n\r\n# Replication\r\nrole:master\r\n\r\n# Keyspace\r\ndb0:keys=42,expires=1,avg_ttl=0\r\n";

    #[test]
    fn test_parse_info_nests_keyspace() {
        let info = parse_info(INFO);
        assert_eq!(info.field("redis_version"), Some("7.2.4"));
        assert_eq!(info.field("connected_clients"), Some("3"));
        assert_eq!(info.keyspace["keys"], "42");
        assert_eq!(info.keyspace["expires"], "1");
        assert!(info.field("db0").is_none());
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0 minutes");
        assert_eq!(format_uptime(59), "0 minutes");
        assert_eq!(format_uptime(60), "1 minute");
        assert_eq!(format_uptime(7_200), "2 hours");
        assert_eq!(format_uptime(90_000), "1 day and 1 hour");
        assert_eq!(format_uptime(93_784), "1 day, 2 hours and 3 minutes");
    }

    #[test]
    fn test_status_from_info() {
        let status = status_from_info(&parse_info(INFO));
        assert_eq!(status.engine, ServiceType::Redis);
        assert_eq!(status.version, "7.2.4");
        assert_eq!(status.status, DbHealth::Healthy);
        assert_eq!(status.memory_usage.as_deref(), Some("1.05M"));
        assert_eq!(status.uptime.as_deref(), Some("1 day, 2 hours and 3 minutes"));
        assert_eq!(status.connections, Some(3));
        assert_eq!(status.size.as_deref(), Some("42 keys"));
        assert_eq!(status.additional["role"], "master");
        assert_eq!(status.additional["db0"]["keys"], "42");
    }

    #[test]
    fn test_failed_bgsave_is_unhealthy() {
        let status = status_from_info(&parse_info("redis_version:7.0.0\nrdb_last_bgsave_status:err\n"));
        assert_eq!(status.status, DbHealth::Unhealthy);
    }

    #[test]
    fn test_cli_args_with_password() {
        let conn = ConnectionInfo {
            password: Some("pw".into()),
            ..ConnectionInfo::default()
        };
        assert_eq!(
            RedisAdapter::cli_args(&conn),
            vec!["redis-cli", "-a", "pw", "--no-auth-warning"]
        );
    }
}
