//! Configuration loading for ComposeDB CLI.
//!
//! Handles loading configuration from the JSON file in the home directory.

use composedb::ComposeDbOptions;
use std::path::Path;
use tracing::warn;

const CONFIG_FILE_JSON: &str = "config.json";

/// Load ComposeDbOptions from the configuration file in the given home directory.
///
/// Returns options with defaults if no config file is found or it cannot be
/// parsed. `home_dir` always reflects the directory passed in.
pub fn load_config(home_dir: &Path) -> ComposeDbOptions {
    let options = try_load_json(home_dir).unwrap_or_default();

    ComposeDbOptions {
        home_dir: home_dir.to_path_buf(),
        ..options
    }
}

fn try_load_json(home_dir: &Path) -> Option<ComposeDbOptions> {
    let config_path = home_dir.join(CONFIG_FILE_JSON);
    if !config_path.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            );
            return None;
        }
    };

    match serde_json::from_str::<ComposeDbOptions>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let config_content = r#"{"backup_dir": "/var/backups", "snapshot_poll_attempts": 5}"#;
        fs::write(&config_path, config_content).unwrap();

        let options = load_config(temp_dir.path());
        assert_eq!(options.backup_dir, "/var/backups");
        assert_eq!(options.snapshot_poll_attempts, 5);
        assert_eq!(options.compose_command, vec!["docker", "compose"]);
    }

    #[test]
    fn test_load_config_with_home_dir() {
        let temp_dir = TempDir::new().unwrap();
        let options = load_config(temp_dir.path());
        assert_eq!(options.home_dir, temp_dir.path());
        assert_eq!(options.backup_dir, "/backups");
    }

    #[test]
    fn test_home_dir_in_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.json"),
            r#"{"home_dir": "/elsewhere"}"#,
        )
        .unwrap();

        let options = load_config(temp_dir.path());
        assert_eq!(options.home_dir, temp_dir.path());
    }

    #[test]
    fn test_invalid_json_warns_and_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let config_content = r#"{"backup_dir": "/var/bac"#; // Truncated JSON
        fs::write(&config_path, config_content).unwrap();

        let options = load_config(temp_dir.path());
        assert_eq!(options.backup_dir, "/backups");
    }
}
