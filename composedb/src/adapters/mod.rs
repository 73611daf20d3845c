//! Database adapters.
//!
//! Each adapter turns the generic operations of [`DatabaseAdapter`] into
//! command lines for one engine family, runs them through the
//! [`CommandExecutor`] and parses the engine's text output.

mod postgres;
mod redis;
mod registry;
mod sqlite;

pub use postgres::PostgresAdapter;
pub use redis::RedisAdapter;
pub use registry::AdapterRegistry;
pub use sqlite::SqliteAdapter;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::env::EnvironmentProvider;
use crate::exec::{CommandExecutor, ExecOptions, ServiceLocation};
use crate::project::{FindProjectOptions, ProjectConfig, ProjectResolver, ServiceConfig, ServiceType};
use crate::validator::QueryValidator;
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

// ============================================================================
// Operation parameters
// ============================================================================

/// Output format of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for QueryFormat {
    type Err = ComposeDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ComposeDbError::InvalidArgument(format!(
                "unknown query format '{}' (expected table, json or csv)",
                s
            ))),
        }
    }
}

/// Dump format of a backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFormat {
    /// Compressed binary container (the default).
    #[default]
    Custom,
    Sql,
    Tar,
    Directory,
}

impl std::str::FromStr for BackupFormat {
    type Err = ComposeDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "sql" | "plain" => Ok(Self::Sql),
            "tar" => Ok(Self::Tar),
            "directory" | "dir" => Ok(Self::Directory),
            _ => Err(ComposeDbError::InvalidArgument(format!(
                "unknown backup format '{}' (expected custom, sql, tar or directory)",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub database: Option<String>,
    pub user: Option<String>,
    pub format: QueryFormat,
}

#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    pub database: Option<String>,
    pub user: Option<String>,
    pub format: BackupFormat,
    /// Destination inside the container. Defaults to a timestamped file
    /// under the configured backup directory.
    pub output_path: Option<String>,
    /// Restrict the dump to these tables. Empty means everything.
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub database: Option<String>,
    pub user: Option<String>,
    /// Drop objects before recreating them.
    pub clean: bool,
    pub data_only: bool,
    pub schema_only: bool,
}

// ============================================================================
// Results
// ============================================================================

/// Connection parameters derived from a service's environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Database name, numeric index or file path, depending on the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbHealth {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbStatus {
    #[serde(rename = "type")]
    pub engine: ServiceType,
    pub version: String,
    pub status: DbHealth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, serde_json::Value>,
}

impl DbStatus {
    pub fn healthy(engine: ServiceType, version: impl Into<String>) -> Self {
        Self {
            engine,
            version: version.into(),
            status: DbHealth::Healthy,
            size: None,
            connections: None,
            uptime: None,
            memory_usage: None,
            additional: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Adapter contract
// ============================================================================

/// Which service an operation targets.
#[derive(Debug, Clone, Default)]
pub struct ServiceTarget {
    pub service: String,
    /// Already-resolved project. When absent the project is resolved with `find`.
    pub project: Option<Arc<ProjectConfig>>,
    pub find: FindProjectOptions,
}

impl ServiceTarget {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: Arc<ProjectConfig>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_find_options(mut self, find: FindProjectOptions) -> Self {
        self.find = find;
        self
    }
}

/// Uniform operations over one database engine family.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Engine family this adapter serves.
    fn engine(&self) -> ServiceType;

    /// Run query text and return the engine's raw output.
    async fn query(
        &self,
        target: &ServiceTarget,
        query: &str,
        options: &QueryOptions,
    ) -> ComposeDbResult<String>;

    /// Write a backup and return the path of the artifact.
    async fn backup(&self, target: &ServiceTarget, options: &BackupOptions)
    -> ComposeDbResult<String>;

    async fn restore(
        &self,
        target: &ServiceTarget,
        backup_path: &str,
        options: &RestoreOptions,
    ) -> ComposeDbResult<()>;

    async fn status(&self, target: &ServiceTarget) -> ComposeDbResult<DbStatus>;

    fn connection_info(
        &self,
        service: &ServiceConfig,
        env: &BTreeMap<String, String>,
    ) -> ConnectionInfo;
}

// ============================================================================
// Shared adapter plumbing
// ============================================================================

/// Bounds for waiting on an asynchronous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// Collaborators and settings shared by all adapters.
#[derive(Clone)]
pub struct AdapterContext {
    pub executor: Arc<dyn CommandExecutor>,
    pub env_provider: Arc<dyn EnvironmentProvider>,
    pub validator: Arc<dyn QueryValidator>,
    pub resolver: Arc<ProjectResolver>,
    pub backup_dir: String,
    pub snapshot: SnapshotPolicy,
}

/// A service looked up in its project, with its environment snapshot.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub project: Arc<ProjectConfig>,
    pub config: ServiceConfig,
    pub env: BTreeMap<String, String>,
    pub location: ServiceLocation,
}

impl AdapterContext {
    /// Resolve the target's project, service config and environment.
    ///
    /// The live container environment is preferred; the environment provider
    /// is the fallback when the container cannot report one.
    pub async fn resolve(&self, target: &ServiceTarget) -> ComposeDbResult<ResolvedService> {
        let project = match &target.project {
            Some(project) => Arc::clone(project),
            None => self.resolver.find_project(&target.find).await?,
        };
        let config = project.service(&target.service)?.clone();
        let location = ServiceLocation::new(&target.service, &project);

        let env = match self.executor.get_service_environment(&location).await? {
            Some(env) => env,
            None => {
                self.env_provider
                    .load_env(&project.project_dir, &config)
                    .await?
            }
        };

        Ok(ResolvedService {
            project,
            config,
            env,
            location,
        })
    }

    pub async fn run<S: AsRef<str>>(
        &self,
        service: &ResolvedService,
        command: &[S],
        options: &ExecOptions,
    ) -> ComposeDbResult<String> {
        let command: Vec<String> = command.iter().map(|s| s.as_ref().to_string()).collect();
        self.executor
            .execute(&service.location, &command, options)
            .await
    }

    /// Create the parent directory of `path` inside the container.
    pub async fn ensure_parent_dir(&self, service: &ResolvedService, path: &str) -> ComposeDbResult<()> {
        if let Some((parent, _)) = path.rsplit_once('/')
            && !parent.is_empty()
        {
            self.run(service, &["mkdir", "-p", parent], &ExecOptions::default())
                .await?;
        }
        Ok(())
    }

    /// `<backup_dir>/<service>_<YYYYmmdd_HHMMSS>[.<extension>]`.
    pub fn default_backup_path(&self, service: &str, extension: &str) -> String {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let dir = self.backup_dir.trim_end_matches('/');
        if extension.is_empty() {
            format!("{}/{}_{}", dir, service, timestamp)
        } else {
            format!("{}/{}_{}.{}", dir, service, timestamp, extension)
        }
    }
}

/// Look up `key` in the environment snapshot, then in the declared environment.
pub(crate) fn env_value(
    service: &ServiceConfig,
    env: &BTreeMap<String, String>,
    key: &str,
) -> Option<String> {
    env.get(key)
        .or_else(|| service.environment.get(key))
        .filter(|v| !v.is_empty())
        .cloned()
}

/// Quote a string for a POSIX shell.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<QueryFormat>().unwrap(), QueryFormat::Json);
        assert_eq!("plain".parse::<BackupFormat>().unwrap(), BackupFormat::Sql);
        assert!("xml".parse::<QueryFormat>().is_err());
        assert!("zip".parse::<BackupFormat>().is_err());
    }

    #[test]
    fn test_status_serializes_without_empty_fields() {
        let status = DbStatus::healthy(ServiceType::Sqlite, "3.45.1");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "sqlite");
        assert_eq!(json["status"], "healthy");
        assert!(json.get("size").is_none());
        assert!(json.get("additional").is_none());
    }

    #[test]
    fn test_connection_info_never_serializes_password() {
        let info = ConnectionInfo {
            host: "localhost".into(),
            password: Some("secret".into()),
            ..ConnectionInfo::default()
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("secret"));
    }
}
