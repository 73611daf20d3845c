//! Shared fixtures for CLI integration tests.
//!
//! Each context owns a throwaway home directory and project directory. The
//! home config points the compose command at a binary that does not exist,
//! so live container lookups fail fast and nothing touches a real engine.

#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

pub const MISSING_COMPOSE_BINARY: &str = "composedb-test-no-such-compose";

pub struct TestContext {
    pub cmd: Command,
    pub home: TempDir,
    pub project: TempDir,
}

impl TestContext {
    /// Fresh command running inside the project directory with this context's home.
    pub fn new_cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("composedb"));
        cmd.env("COMPOSEDB_HOME", self.home.path())
            .env_remove("COMPOSEDB_ENV")
            .env_remove("RUST_LOG")
            .current_dir(self.project.path());
        cmd
    }

    pub fn write(&self, name: &str, content: &str) {
        write_file(&self.project.path().join(name), content);
    }
}

pub fn composedb() -> TestContext {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    write_file(
        &home.path().join("config.json"),
        &format!(r#"{{"compose_command": ["{}", "compose"]}}"#, MISSING_COMPOSE_BINARY),
    );

    let mut ctx = TestContext {
        cmd: Command::new(assert_cmd::cargo::cargo_bin!("composedb")),
        home,
        project,
    };
    ctx.cmd = ctx.new_cmd();
    ctx
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
