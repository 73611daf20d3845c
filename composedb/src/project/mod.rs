//! Compose project model.
//!
//! A [`ProjectConfig`] is built once per resolution pass and never mutated
//! afterwards; the resolver hands it out as `Arc<ProjectConfig>`.

pub mod merge;
pub mod parser;
mod resolver;

pub use resolver::{FindProjectOptions, ProjectResolver};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

/// One resolved compose project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// Path of the first descriptor layer. Empty when no local file exists.
    pub descriptor_path: String,

    /// Directory holding the descriptor. Empty when no local file exists.
    pub project_dir: String,

    pub services: BTreeMap<String, ServiceConfig>,
}

impl ProjectConfig {
    /// Stub project with no services, used when topology comes from elsewhere.
    pub fn stub(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Look up a service, failing with `ServiceNotFound`.
    pub fn service(&self, name: &str) -> ComposeDbResult<&ServiceConfig> {
        self.services
            .get(name)
            .ok_or_else(|| ComposeDbError::ServiceNotFound {
                service: name.to_string(),
                project: self.name.clone(),
            })
    }
}

/// One declared service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    /// "published:target" strings, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(rename = "type")]
    pub service_type: ServiceType,
}

/// Build section of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub context: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

/// Engine family of a service, inferred from its image name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Generic,
    /// Relational SQL (PostgreSQL and derivatives).
    Postgresql,
    /// Key-value store.
    Redis,
    /// Embedded single-file database.
    Sqlite,
    /// Other relational engines.
    Mysql,
    /// Document store.
    Mongodb,
}

// Checked in order; the first family with a matching marker wins.
const TYPE_MARKERS: &[(ServiceType, &[&str])] = &[
    (
        ServiceType::Postgresql,
        &["postgres", "pgvector", "timescale", "postgis"],
    ),
    (ServiceType::Redis, &["redis"]),
    (ServiceType::Mysql, &["mysql", "mariadb"]),
    (ServiceType::Mongodb, &["mongo"]),
    (ServiceType::Sqlite, &["sqlite"]),
];

impl ServiceType {
    /// Infer the engine family from an image reference (case-insensitive).
    pub fn from_image(image: Option<&str>) -> Self {
        let Some(image) = image else {
            return ServiceType::Generic;
        };
        let image = image.to_lowercase();

        TYPE_MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| image.contains(m)))
            .map(|(ty, _)| *ty)
            .unwrap_or(ServiceType::Generic)
    }

    /// Registry key for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Generic => "generic",
            ServiceType::Postgresql => "postgresql",
            ServiceType::Redis => "redis",
            ServiceType::Sqlite => "sqlite",
            ServiceType::Mysql => "mysql",
            ServiceType::Mongodb => "mongodb",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
