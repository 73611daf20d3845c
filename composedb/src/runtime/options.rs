//! Configuration for ComposeDB.

use crate::adapters::SnapshotPolicy;
use crate::runtime::constants::{dirs as const_dirs, envs as const_envs, snapshot};
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for [`ComposeDbRuntime`](crate::ComposeDbRuntime).
///
/// Every field has a default, so a partial `config.json` is valid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComposeDbOptions {
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    /// Directory inside containers that default backup paths live under.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Current environment identifier for the `docker-compose.<env>.yml` layer.
    ///
    /// Default: value of `COMPOSEDB_ENV`, if set
    #[serde(default = "default_environment")]
    pub environment: Option<String>,

    /// How many times snapshot completion is polled before giving up.
    #[serde(default = "default_poll_attempts")]
    pub snapshot_poll_attempts: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub snapshot_poll_interval_ms: u64,

    /// Compose CLI prefix used by the default executor.
    ///
    /// Default: ["docker", "compose"]
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,
}

fn default_home_dir() -> PathBuf {
    std::env::var(const_envs::COMPOSEDB_HOME)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(const_dirs::COMPOSEDB_DIR);
            path
        })
}

fn default_backup_dir() -> String {
    const_dirs::BACKUP_DIR.to_string()
}

fn default_environment() -> Option<String> {
    std::env::var(const_envs::COMPOSEDB_ENV)
        .ok()
        .filter(|e| !e.is_empty())
}

fn default_poll_attempts() -> u32 {
    snapshot::POLL_ATTEMPTS
}

fn default_poll_interval_ms() -> u64 {
    snapshot::POLL_INTERVAL_MS
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

impl Default for ComposeDbOptions {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            backup_dir: default_backup_dir(),
            environment: default_environment(),
            snapshot_poll_attempts: default_poll_attempts(),
            snapshot_poll_interval_ms: default_poll_interval_ms(),
            compose_command: default_compose_command(),
        }
    }
}

impl ComposeDbOptions {
    /// Reject option combinations the runtime cannot work with.
    pub fn sanitize(&self) -> ComposeDbResult<()> {
        if self.snapshot_poll_attempts == 0 {
            return Err(ComposeDbError::Config(
                "snapshot_poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.backup_dir.trim().is_empty() {
            return Err(ComposeDbError::Config("backup_dir is empty".to_string()));
        }
        if self.compose_command.first().is_none_or(|p| p.is_empty()) {
            return Err(ComposeDbError::Config("compose_command is empty".to_string()));
        }
        Ok(())
    }

    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy {
            attempts: self.snapshot_poll_attempts,
            interval: Duration::from_millis(self.snapshot_poll_interval_ms),
        }
    }
}
