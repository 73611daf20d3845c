//! Command execution inside service containers.

mod compose;

pub use compose::ComposeExecutor;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::project::ProjectConfig;
use composedb_shared::errors::ComposeDbResult;

/// Identifies one service container for the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLocation {
    pub service: String,
    pub project: String,
    /// Descriptor the project was resolved from. May be empty.
    pub descriptor_path: String,
    /// Project directory. May be empty.
    pub project_dir: String,
}

impl ServiceLocation {
    pub fn new(service: impl Into<String>, project: &ProjectConfig) -> Self {
        Self {
            service: service.into(),
            project: project.name.clone(),
            descriptor_path: project.descriptor_path.clone(),
            project_dir: project.project_dir.clone(),
        }
    }
}

/// Per-invocation settings for [`CommandExecutor::execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Extra environment for the spawned command. Values never appear on a command line.
    pub env: BTreeMap<String, String>,

    pub user: Option<String>,

    pub workdir: Option<String>,

    /// Run in a fresh one-off container of the service instead of the running
    /// one, so the command works while the service is stopped.
    pub one_off: bool,
}

impl ExecOptions {
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Runs commands in service containers.
///
/// Transport failures and non-zero exits are both reported as
/// `ExecutionFailed`; callers do not distinguish them.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` in the service container and return its stdout.
    async fn execute(
        &self,
        location: &ServiceLocation,
        command: &[String],
        options: &ExecOptions,
    ) -> ComposeDbResult<String>;

    async fn stop_service(&self, location: &ServiceLocation) -> ComposeDbResult<()>;

    async fn start_service(&self, location: &ServiceLocation) -> ComposeDbResult<()>;

    /// Environment of the live container, or `None` when it is unavailable.
    async fn get_service_environment(
        &self,
        location: &ServiceLocation,
    ) -> ComposeDbResult<Option<BTreeMap<String, String>>>;
}
