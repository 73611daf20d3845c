//! Descriptor parsing.
//!
//! Turns raw compose YAML into [`serde_yaml::Value`] documents (the unit the
//! merger works on) and converts a merged document into a [`ProjectConfig`].

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::{BuildConfig, ProjectConfig, ServiceConfig, ServiceType};
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

const DEFAULT_PROJECT_NAME: &str = "default";

/// Parse one descriptor into a typed project.
pub fn parse_descriptor(content: &str, descriptor_path: &Path) -> ComposeDbResult<ProjectConfig> {
    let document = parse_document(content, descriptor_path)?;
    into_project(&document, descriptor_path)
}

/// Parse one descriptor into a raw document, rejecting documents without `services`.
pub fn parse_document(content: &str, descriptor_path: &Path) -> ComposeDbResult<Value> {
    let document: Value =
        serde_yaml::from_str(content).map_err(|e| malformed(descriptor_path, e.to_string()))?;

    let has_services = document
        .as_mapping()
        .is_some_and(|m| m.contains_key("services"));
    if !has_services {
        return Err(malformed(descriptor_path, "missing 'services' key"));
    }

    Ok(document)
}

/// Convert a raw (possibly merged) document into a [`ProjectConfig`].
///
/// `descriptor_path` supplies the project's canonical path and, when the
/// document carries no `name`, the project name (its directory's base name).
pub fn into_project(document: &Value, descriptor_path: &Path) -> ComposeDbResult<ProjectConfig> {
    let root = document
        .as_mapping()
        .ok_or_else(|| malformed(descriptor_path, "document root is not a mapping"))?;

    let services = match root.get("services") {
        None => return Err(malformed(descriptor_path, "missing 'services' key")),
        Some(Value::Null) => BTreeMap::new(),
        Some(Value::Mapping(services)) => parse_services(services, descriptor_path)?,
        Some(_) => return Err(malformed(descriptor_path, "'services' is not a mapping")),
    };

    let project_dir = descriptor_path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ProjectConfig {
        name: project_name(root, descriptor_path),
        descriptor_path: descriptor_path.to_string_lossy().into_owned(),
        project_dir,
        services,
    })
}

fn parse_services(
    services: &Mapping,
    descriptor_path: &Path,
) -> ComposeDbResult<BTreeMap<String, ServiceConfig>> {
    let mut parsed = BTreeMap::new();

    for (key, body) in services {
        let name = key
            .as_str()
            .ok_or_else(|| malformed(descriptor_path, "service name is not a string"))?
            .to_string();

        let service = match body {
            Value::Null => parse_service(name.clone(), &Mapping::new()),
            Value::Mapping(body) => parse_service(name.clone(), body),
            _ => {
                return Err(malformed(
                    descriptor_path,
                    format!("service '{}' is not a mapping", name),
                ));
            }
        };
        parsed.insert(name, service);
    }

    Ok(parsed)
}

fn parse_service(name: String, body: &Mapping) -> ServiceConfig {
    let image = body.get("image").map(scalar_to_string);

    let ports = match body.get("ports") {
        Some(Value::Sequence(entries)) => entries.iter().map(normalize_port).collect(),
        _ => Vec::new(),
    };

    let environment = body
        .get("environment")
        .map(normalize_environment)
        .unwrap_or_default();

    ServiceConfig {
        service_type: ServiceType::from_image(image.as_deref()),
        build: body.get("build").and_then(parse_build),
        working_dir: body.get("working_dir").map(scalar_to_string),
        name,
        image,
        ports,
        environment,
    }
}

fn parse_build(build: &Value) -> Option<BuildConfig> {
    match build {
        Value::String(context) => Some(BuildConfig {
            context: context.clone(),
            dockerfile: None,
        }),
        Value::Mapping(m) => Some(BuildConfig {
            context: m
                .get("context")
                .map(scalar_to_string)
                .unwrap_or_else(|| ".".to_string()),
            dockerfile: m.get("dockerfile").map(scalar_to_string),
        }),
        _ => None,
    }
}

/// Normalize a `ports` entry to "published:target".
///
/// Strings pass through; `{published, target}` mappings are joined; anything
/// else is stringified as-is.
pub fn normalize_port(entry: &Value) -> String {
    if let Value::Mapping(m) = entry
        && let (Some(published), Some(target)) = (m.get("published"), m.get("target"))
    {
        return format!(
            "{}:{}",
            scalar_to_string(published),
            scalar_to_string(target)
        );
    }
    scalar_to_string(entry)
}

/// Normalize `environment` from either `["KEY=VALUE", ...]` or a mapping.
///
/// In the list form only the first `=` separates key from value. A bare
/// `KEY` entry maps to an empty value.
pub fn normalize_environment(environment: &Value) -> BTreeMap<String, String> {
    match environment {
        Value::Sequence(entries) => entries
            .iter()
            .map(scalar_to_string)
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (entry, String::new()),
            })
            .collect(),
        Value::Mapping(m) => m
            .iter()
            .map(|(k, v)| (scalar_to_string(k), scalar_to_string(v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn project_name(root: &Mapping, descriptor_path: &Path) -> String {
    if let Some(Value::String(name)) = root.get("name")
        && !name.is_empty()
    {
        return name.clone();
    }

    descriptor_path
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> ComposeDbError {
    ComposeDbError::MalformedDescriptor {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}
