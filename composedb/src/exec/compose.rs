//! `docker compose` backed executor.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CommandExecutor, ExecOptions, ServiceLocation};
use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

/// Executes commands through the compose CLI (`docker compose` by default).
///
/// Environment values are handed to the compose process itself and only the
/// variable names are forwarded with `-e NAME`, so secrets stay off argv.
#[derive(Debug, Clone)]
pub struct ComposeExecutor {
    program: String,
    base_args: Vec<String>,
}

impl ComposeExecutor {
    /// Create from a command prefix such as `["docker", "compose"]`.
    pub fn new(compose_command: Vec<String>) -> ComposeDbResult<Self> {
        let mut parts = compose_command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ComposeDbError::Config("compose command is empty".to_string()))?;

        Ok(Self {
            program,
            base_args: parts.collect(),
        })
    }

    /// Arguments selecting the project, shared by every subcommand.
    fn project_args(&self, location: &ServiceLocation) -> Vec<String> {
        let mut args = self.base_args.clone();
        if !location.project.is_empty() {
            args.extend(["-p".to_string(), location.project.clone()]);
        }
        if !location.descriptor_path.is_empty() {
            args.extend(["-f".to_string(), location.descriptor_path.clone()]);
        }
        if !location.project_dir.is_empty() {
            args.extend([
                "--project-directory".to_string(),
                location.project_dir.clone(),
            ]);
        }
        args
    }

    pub(crate) fn exec_args(
        &self,
        location: &ServiceLocation,
        command: &[String],
        options: &ExecOptions,
    ) -> Vec<String> {
        let mut args = self.project_args(location);

        if options.one_off {
            args.extend(["run", "--rm", "--no-deps", "-T"].map(String::from));
        } else {
            args.extend(["exec", "-T"].map(String::from));
        }
        for key in options.env.keys() {
            args.extend(["-e".to_string(), key.clone()]);
        }
        if let Some(user) = &options.user {
            args.extend(["-u".to_string(), user.clone()]);
        }
        if let Some(workdir) = &options.workdir {
            args.extend(["-w".to_string(), workdir.clone()]);
        }

        args.push(location.service.clone());
        args.extend(command.iter().cloned());
        args
    }

    async fn run(&self, args: &[String], env: &BTreeMap<String, String>) -> ComposeDbResult<String> {
        tracing::debug!(program = %self.program, ?args, "Running compose command");

        let output = Command::new(&self.program)
            .args(args)
            .envs(env)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ComposeDbError::ExecutionFailed(format!("failed to spawn {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ComposeDbError::ExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ComposeExecutor {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            base_args: vec!["compose".to_string()],
        }
    }
}

#[async_trait]
impl CommandExecutor for ComposeExecutor {
    async fn execute(
        &self,
        location: &ServiceLocation,
        command: &[String],
        options: &ExecOptions,
    ) -> ComposeDbResult<String> {
        let args = self.exec_args(location, command, options);
        self.run(&args, &options.env).await
    }

    async fn stop_service(&self, location: &ServiceLocation) -> ComposeDbResult<()> {
        let mut args = self.project_args(location);
        args.extend(["stop".to_string(), location.service.clone()]);
        self.run(&args, &BTreeMap::new()).await?;
        tracing::info!(service = %location.service, "Stopped service");
        Ok(())
    }

    async fn start_service(&self, location: &ServiceLocation) -> ComposeDbResult<()> {
        let mut args = self.project_args(location);
        args.extend(["start".to_string(), location.service.clone()]);
        self.run(&args, &BTreeMap::new()).await?;
        tracing::info!(service = %location.service, "Started service");
        Ok(())
    }

    async fn get_service_environment(
        &self,
        location: &ServiceLocation,
    ) -> ComposeDbResult<Option<BTreeMap<String, String>>> {
        let command = ["env".to_string()];
        match self.execute(location, &command, &ExecOptions::default()).await {
            Ok(output) => Ok(Some(parse_env_output(&output))),
            Err(e) => {
                tracing::debug!(
                    service = %location.service,
                    error = %e,
                    "Live container environment unavailable"
                );
                Ok(None)
            }
        }
    }
}

/// Parse `env` output (`KEY=VALUE` per line).
fn parse_env_output(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
