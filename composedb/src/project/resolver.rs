//! Project discovery and caching.
//!
//! Discovery walks upward from the working directory until it finds a
//! directory holding a base descriptor, then layers
//! base → `<name>.<environment>.yml` → `<name>.override.yml` on top of each other.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::merge::merge_documents;
use super::parser::{into_project, parse_descriptor, parse_document};
use super::ProjectConfig;
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

/// Base descriptor names, in lookup priority order.
pub const BASE_DESCRIPTORS: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

const DESCRIPTOR_STEMS: [&str; 2] = ["docker-compose", "compose"];
const DESCRIPTOR_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Inputs to [`ProjectResolver::find_project`].
#[derive(Debug, Clone, Default)]
pub struct FindProjectOptions {
    /// Explicit project name. Without any file context this yields a stub project.
    pub project_name: Option<String>,

    /// Explicit descriptor path; relative paths resolve against `working_dir`.
    pub descriptor_path: Option<PathBuf>,

    /// Directory the upward search starts from. Defaults to the process cwd.
    pub working_dir: Option<PathBuf>,
}

impl FindProjectOptions {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            project_name: Some(name.into()),
            ..Self::default()
        }
    }

    fn has_file_context(&self) -> bool {
        self.descriptor_path.is_some() || self.working_dir.is_some()
    }
}

/// Resolves and caches [`ProjectConfig`]s.
///
/// Cache entries are keyed by the explicit descriptor path, or by the working
/// directory when none is given. An entry is dropped whenever re-resolution
/// for its key fails.
pub struct ProjectResolver {
    environment: Option<String>,
    cache: RwLock<HashMap<String, Arc<ProjectConfig>>>,
}

impl ProjectResolver {
    /// Create a resolver. `environment` selects the environment-specific layer.
    pub fn new(environment: Option<String>) -> Self {
        Self {
            environment: environment.filter(|e| !e.is_empty()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the project for `options`.
    pub async fn find_project(
        &self,
        options: &FindProjectOptions,
    ) -> ComposeDbResult<Arc<ProjectConfig>> {
        if let Some(name) = &options.project_name
            && !options.has_file_context()
        {
            tracing::debug!(project = %name, "Using stub project without descriptor");
            return Ok(Arc::new(ProjectConfig::stub(name.clone())));
        }

        let key = cache_key(options)?;

        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        match self.resolve(options).await {
            Ok(project) => {
                let project = Arc::new(project);
                self.cache.write().insert(key, Arc::clone(&project));
                Ok(project)
            }
            Err(e) => {
                if self.cache.write().remove(&key).is_some() {
                    tracing::warn!(key = %key, "Dropped cached project after failed resolution");
                }
                Err(e)
            }
        }
    }

    /// Number of cached projects.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Cached entry for `key`, provided its descriptor is still on disk.
    ///
    /// A vanished descriptor falls through to re-resolution, which then fails
    /// and evicts the entry.
    async fn cached(&self, key: &str) -> Option<Arc<ProjectConfig>> {
        let cached = self.cache.read().get(key).cloned()?;
        if cached.descriptor_path.is_empty()
            || tokio::fs::try_exists(&cached.descriptor_path)
                .await
                .unwrap_or(false)
        {
            return Some(cached);
        }
        None
    }

    async fn resolve(&self, options: &FindProjectOptions) -> ComposeDbResult<ProjectConfig> {
        let layers = self.discover_layers(options).await?;

        let mut project = if layers.len() == 1 {
            let content = read_descriptor(&layers[0]).await?;
            parse_descriptor(&content, &layers[0])?
        } else {
            let mut documents = Vec::with_capacity(layers.len());
            for layer in &layers {
                let content = read_descriptor(layer).await?;
                documents.push(parse_document(&content, layer)?);
            }
            into_project(&merge_documents(documents), &layers[0])?
        };

        if let Some(name) = &options.project_name {
            project.name = name.clone();
        }

        tracing::info!(
            project = %project.name,
            layers = layers.len(),
            services = project.services.len(),
            "Resolved compose project"
        );
        Ok(project)
    }

    /// Ordered descriptor layers for `options`; the first is the canonical one.
    async fn discover_layers(&self, options: &FindProjectOptions) -> ComposeDbResult<Vec<PathBuf>> {
        let working_dir = effective_working_dir(options)?;

        if let Some(explicit) = &options.descriptor_path {
            let path = if explicit.is_absolute() {
                explicit.clone()
            } else {
                working_dir.join(explicit)
            };
            if !exists(&path).await {
                return Err(ComposeDbError::NotFound(format!(
                    "descriptor file {} does not exist",
                    path.display()
                )));
            }
            let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
            return Ok(vec![path]);
        }

        let (dir, base) = find_base_descriptor(&working_dir).await?.ok_or_else(|| {
            ComposeDbError::NotFound(format!(
                "no compose file found in {} or any parent directory",
                working_dir.display()
            ))
        })?;

        let mut layers = vec![base];

        if let Some(env) = &self.environment
            && let Some(layer) = first_existing(&dir, layer_names(env).as_slice()).await
        {
            layers.push(layer);
        }

        if let Some(layer) = first_existing(&dir, layer_names("override").as_slice()).await {
            layers.push(layer);
        }

        Ok(layers)
    }
}

impl Default for ProjectResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Walk upward from `start` looking for a base descriptor.
///
/// Visited directories are tracked by canonical path so symlink loops end
/// the search instead of spinning.
async fn find_base_descriptor(start: &Path) -> ComposeDbResult<Option<(PathBuf, PathBuf)>> {
    let mut visited = HashSet::new();
    let mut current = Some(start.to_path_buf());

    while let Some(dir) = current {
        let canonical = tokio::fs::canonicalize(&dir)
            .await
            .unwrap_or_else(|_| dir.clone());
        if !visited.insert(canonical.clone()) {
            tracing::debug!(dir = %canonical.display(), "Directory already visited, stopping search");
            break;
        }

        if let Some(base) = first_existing(&canonical, &BASE_DESCRIPTORS[..]).await {
            return Ok(Some((canonical, base)));
        }

        current = canonical.parent().map(Path::to_path_buf);
    }

    Ok(None)
}

/// `docker-compose.<suffix>.yml` and its variants, in lookup order.
fn layer_names(suffix: &str) -> Vec<String> {
    DESCRIPTOR_STEMS
        .iter()
        .flat_map(|stem| {
            DESCRIPTOR_EXTENSIONS
                .iter()
                .map(move |ext| format!("{}.{}.{}", stem, suffix, ext))
        })
        .collect()
}

async fn first_existing<S: AsRef<str>>(dir: &Path, names: &[S]) -> Option<PathBuf> {
    for name in names {
        let candidate = dir.join(name.as_ref());
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|m| m.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn read_descriptor(path: &Path) -> ComposeDbResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        ComposeDbError::NotFound(format!("cannot read descriptor {}: {}", path.display(), e))
    })
}

fn effective_working_dir(options: &FindProjectOptions) -> ComposeDbResult<PathBuf> {
    match &options.working_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

fn cache_key(options: &FindProjectOptions) -> ComposeDbResult<String> {
    if let Some(path) = &options.descriptor_path {
        let path = match &options.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        };
        return Ok(format!("file:{}", path.display()));
    }
    Ok(format!("dir:{}", effective_working_dir(options)?.display()))
}
