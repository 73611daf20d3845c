//! Service environment loading from the project directory.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::project::ServiceConfig;
use composedb_shared::errors::ComposeDbResult;

const DOTENV_FILE: &str = ".env";

/// Supplies a service's environment when the live container cannot.
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    async fn load_env(
        &self,
        project_dir: &str,
        service: &ServiceConfig,
    ) -> ComposeDbResult<BTreeMap<String, String>>;
}

/// Combines the project's `.env` file with the service's declared environment.
///
/// Declared values win over `.env` values. `${VAR}` references in declared
/// values resolve from the process environment first, then from the `.env`
/// file; unknown references become empty.
#[derive(Debug, Clone, Default)]
pub struct DotEnvProvider;

#[async_trait]
impl EnvironmentProvider for DotEnvProvider {
    async fn load_env(
        &self,
        project_dir: &str,
        service: &ServiceConfig,
    ) -> ComposeDbResult<BTreeMap<String, String>> {
        let mut env = if project_dir.is_empty() {
            BTreeMap::new()
        } else {
            read_dotenv(&Path::new(project_dir).join(DOTENV_FILE))
        };

        let declared = substitute_declared(&service.environment, &env);
        env.extend(declared);

        Ok(env)
    }
}

/// Parse a `.env` file without touching the process environment.
///
/// A missing file yields an empty map; malformed lines are skipped.
fn read_dotenv(path: &Path) -> BTreeMap<String, String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let mut env = BTreeMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                env.insert(key, value);
            }
            Err(e) => tracing::warn!("Skipping entry in {}: {}", path.display(), e),
        }
    }
    env
}

/// Run each declared value through dotenvy's substitution, seeded with the
/// `.env` entries. Values dotenvy cannot parse are kept as declared.
fn substitute_declared(
    declared: &BTreeMap<String, String>,
    dotenv: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let seed: String = dotenv
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, quoted(value, true)))
        .collect();

    declared
        .iter()
        .map(|(key, value)| {
            let line = format!("{}={}\n", key, quoted(value, false));
            let resolved = dotenvy::from_read_iter(seed.as_bytes().chain(line.as_bytes()))
                .last()
                .and_then(Result::ok)
                .filter(|(parsed, _)| parsed == key)
                .map(|(_, resolved)| resolved)
                .unwrap_or_else(|| value.clone());
            (key.clone(), resolved)
        })
        .collect()
}

/// Double-quote `value` for dotenvy. `$` stays live unless `literal_dollar`.
fn quoted(value: &str, literal_dollar: bool) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '$' if literal_dollar => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
