//! Engine type → adapter lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::DatabaseAdapter;
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

/// Maps lower-cased engine type keys to adapters.
///
/// Registering a type twice replaces the earlier adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn DatabaseAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine_type: &str, adapter: Arc<dyn DatabaseAdapter>) {
        let key = engine_type.to_lowercase();
        if self.adapters.insert(key.clone(), adapter).is_some() {
            tracing::debug!(engine_type = %key, "Replaced registered adapter");
        }
    }

    pub fn get(&self, engine_type: &str) -> ComposeDbResult<Arc<dyn DatabaseAdapter>> {
        self.adapters
            .get(&engine_type.to_lowercase())
            .cloned()
            .ok_or_else(|| ComposeDbError::UnknownAdapter {
                requested: engine_type.to_string(),
                registered: self.registered_types(),
            })
    }

    pub fn has(&self, engine_type: &str) -> bool {
        self.adapters.contains_key(&engine_type.to_lowercase())
    }

    /// Registered type keys, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.adapters.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        BackupOptions, ConnectionInfo, DbStatus, QueryOptions, RestoreOptions, ServiceTarget,
    };
    use crate::project::{ServiceConfig, ServiceType};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct NamedAdapter(&'static str);

    #[async_trait]
    impl DatabaseAdapter for NamedAdapter {
        fn engine(&self) -> ServiceType {
            ServiceType::Generic
        }

        async fn query(
            &self,
            _target: &ServiceTarget,
            _query: &str,
            _options: &QueryOptions,
        ) -> ComposeDbResult<String> {
            Ok(self.0.to_string())
        }

        async fn backup(
            &self,
            _target: &ServiceTarget,
            _options: &BackupOptions,
        ) -> ComposeDbResult<String> {
            Ok(String::new())
        }

        async fn restore(
            &self,
            _target: &ServiceTarget,
            _backup_path: &str,
            _options: &RestoreOptions,
        ) -> ComposeDbResult<()> {
            Ok(())
        }

        async fn status(&self, _target: &ServiceTarget) -> ComposeDbResult<DbStatus> {
            Ok(DbStatus::healthy(ServiceType::Generic, self.0))
        }

        fn connection_info(
            &self,
            _service: &ServiceConfig,
            _env: &BTreeMap<String, String>,
        ) -> ConnectionInfo {
            ConnectionInfo::default()
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = AdapterRegistry::new();
        registry.register("PostgreSQL", Arc::new(NamedAdapter("pg")));

        assert!(registry.has("postgresql"));
        assert!(registry.has("POSTGRESQL"));
        assert!(registry.get("Postgresql").is_ok());
        assert_eq!(registry.registered_types(), vec!["postgresql"]);
    }

    #[test]
    fn test_unknown_type_lists_registered() {
        let mut registry = AdapterRegistry::new();
        registry.register("redis", Arc::new(NamedAdapter("redis")));
        registry.register("postgresql", Arc::new(NamedAdapter("pg")));

        let err = registry.get("mongodb").err().unwrap();
        match err {
            ComposeDbError::UnknownAdapter {
                requested,
                registered,
            } => {
                assert_eq!(requested, "mongodb");
                assert_eq!(registered, vec!["postgresql", "redis"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reregistering_replaces_adapter() {
        let mut registry = AdapterRegistry::new();
        registry.register("redis", Arc::new(NamedAdapter("first")));
        registry.register("REDIS", Arc::new(NamedAdapter("second")));

        let adapter = registry.get("redis").unwrap();
        let status = adapter.status(&ServiceTarget::new("cache")).await.unwrap();
        assert_eq!(status.version, "second");
        assert_eq!(registry.registered_types().len(), 1);
    }
}
