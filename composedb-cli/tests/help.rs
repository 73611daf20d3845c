//! Every subcommand is listed in `composedb --help` and accepts `--help`.

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;

fn composedb_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("composedb"))
}

#[rstest]
#[case("project")]
#[case("query")]
#[case("backup")]
#[case("restore")]
#[case("status")]
#[case("connection")]
fn test_subcommand_listed_and_documented(#[case] name: &str) {
    composedb_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(name));

    composedb_cmd()
        .args([name, "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--project-directory"));
}

#[test]
fn test_missing_subcommand_fails() {
    composedb_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
