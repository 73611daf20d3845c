//! Runtime composition root.
//!
//! [`ComposeDbRuntime`] owns the project resolver (and its cache) and the
//! adapter registry. Create one at startup and pass it by reference.

pub mod constants;
pub mod options;

use std::sync::Arc;

use crate::adapters::{
    AdapterContext, AdapterRegistry, BackupOptions, ConnectionInfo, DatabaseAdapter, DbStatus,
    PostgresAdapter, QueryOptions, RedisAdapter, RestoreOptions, ServiceTarget, SqliteAdapter,
};
use crate::env::{DotEnvProvider, EnvironmentProvider};
use crate::exec::{CommandExecutor, ComposeExecutor};
use crate::project::{FindProjectOptions, ProjectConfig, ProjectResolver, ServiceType};
use crate::validator::{QueryValidator, SqlGuard};
use composedb_shared::errors::ComposeDbResult;
use options::ComposeDbOptions;

pub struct ComposeDbRuntime {
    options: ComposeDbOptions,
    resolver: Arc<ProjectResolver>,
    registry: AdapterRegistry,
    context: AdapterContext,
}

impl ComposeDbRuntime {
    /// Runtime backed by the compose CLI, `.env` files and [`SqlGuard`].
    pub fn new(options: ComposeDbOptions) -> ComposeDbResult<Self> {
        options.sanitize()?;
        let executor = ComposeExecutor::new(options.compose_command.clone())?;
        Self::with_collaborators(
            options,
            Arc::new(executor),
            Arc::new(DotEnvProvider),
            Arc::new(SqlGuard),
        )
    }

    /// Runtime with injected collaborators.
    pub fn with_collaborators(
        options: ComposeDbOptions,
        executor: Arc<dyn CommandExecutor>,
        env_provider: Arc<dyn EnvironmentProvider>,
        validator: Arc<dyn QueryValidator>,
    ) -> ComposeDbResult<Self> {
        options.sanitize()?;

        let resolver = Arc::new(ProjectResolver::new(options.environment.clone()));
        let context = AdapterContext {
            executor,
            env_provider,
            validator,
            resolver: Arc::clone(&resolver),
            backup_dir: options.backup_dir.clone(),
            snapshot: options.snapshot_policy(),
        };

        let mut registry = AdapterRegistry::new();
        registry.register(
            ServiceType::Postgresql.as_str(),
            Arc::new(PostgresAdapter::new(context.clone())),
        );
        registry.register(
            ServiceType::Redis.as_str(),
            Arc::new(RedisAdapter::new(context.clone())),
        );
        registry.register(
            ServiceType::Sqlite.as_str(),
            Arc::new(SqliteAdapter::new(context.clone())),
        );

        tracing::debug!(
            adapters = ?registry.registered_types(),
            environment = ?options.environment,
            "ComposeDB runtime initialized"
        );

        Ok(Self {
            options,
            resolver,
            registry,
            context,
        })
    }

    pub fn options(&self) -> &ComposeDbOptions {
        &self.options
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Register (or replace) the adapter for an engine type.
    pub fn register_adapter(&mut self, engine_type: &str, adapter: Arc<dyn DatabaseAdapter>) {
        self.registry.register(engine_type, adapter);
    }

    pub async fn find_project(
        &self,
        options: &FindProjectOptions,
    ) -> ComposeDbResult<Arc<ProjectConfig>> {
        self.resolver.find_project(options).await
    }

    /// Pick the adapter for the target's declared service type.
    ///
    /// The returned target carries the resolved project so the adapter does
    /// not resolve it again.
    pub async fn adapter_for(
        &self,
        target: &ServiceTarget,
    ) -> ComposeDbResult<(Arc<dyn DatabaseAdapter>, ServiceTarget)> {
        let project = match &target.project {
            Some(project) => Arc::clone(project),
            None => self.resolver.find_project(&target.find).await?,
        };
        let service_type = project.service(&target.service)?.service_type;
        let adapter = self.registry.get(service_type.as_str())?;

        Ok((adapter, target.clone().with_project(project)))
    }

    pub async fn query(
        &self,
        target: &ServiceTarget,
        query: &str,
        options: &QueryOptions,
    ) -> ComposeDbResult<String> {
        let (adapter, target) = self.adapter_for(target).await?;
        adapter.query(&target, query, options).await
    }

    pub async fn backup(
        &self,
        target: &ServiceTarget,
        options: &BackupOptions,
    ) -> ComposeDbResult<String> {
        let (adapter, target) = self.adapter_for(target).await?;
        adapter.backup(&target, options).await
    }

    pub async fn restore(
        &self,
        target: &ServiceTarget,
        backup_path: &str,
        options: &RestoreOptions,
    ) -> ComposeDbResult<()> {
        let (adapter, target) = self.adapter_for(target).await?;
        adapter.restore(&target, backup_path, options).await
    }

    pub async fn status(&self, target: &ServiceTarget) -> ComposeDbResult<DbStatus> {
        let (adapter, target) = self.adapter_for(target).await?;
        adapter.status(&target).await
    }

    pub async fn connection_info(&self, target: &ServiceTarget) -> ComposeDbResult<ConnectionInfo> {
        let (adapter, target) = self.adapter_for(target).await?;
        let service = self.context.resolve(&target).await?;
        Ok(adapter.connection_info(&service.config, &service.env))
    }
}
