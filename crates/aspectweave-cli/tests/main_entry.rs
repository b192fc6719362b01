//! Integration tests for the `aspectweave` binary entry point.
//!
//! Runs the binary against a manifest in a temporary directory, with `true`
//! standing in for the weaver and the runtime probe.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

const MANIFEST: &str = r#"
name = "app"
plugins = ["com.android.application"]
variants = ["debug"]

[android]
boot_classpath = ["/sdk/android.jar"]

[[unit]]
name = "compileDebugJavaWithJavac"
destination = "build/debug/classes"

[[unit]]
name = "compileReleaseJavaWithJavac"
destination = "build/release/classes"
"#;

fn manifest_dir() -> anyhow::Result<TempDir> {
    let directory = TempDir::new()?;
    fs::write(directory.path().join("aspectweave.toml"), MANIFEST)?;
    Ok(directory)
}

#[test]
fn run_weaves_and_verifies() -> anyhow::Result<()> {
    let directory = manifest_dir()?;
    let mut command = cargo_bin_cmd!("aspectweave");
    command
        .arg("--weaver-program")
        .arg("true")
        .arg("--probe-program=true")
        .arg("--manifest")
        .arg(directory.path().join("aspectweave.toml"))
        .arg("run")
        .arg("configureAspectJForDebug")
        .arg("compileDebugJavaWithJavac")
        .arg("aspectJSetupVerify");
    command.assert().success().stdout(
        contains("compileDebugJavaWithJavac: completed")
            .and(contains("configureAspectJForDebug: completed"))
            .and(contains("aspectJSetupVerify: completed")),
    );
    Ok(())
}

#[test]
fn default_run_skips_variant_and_verify_tasks() -> anyhow::Result<()> {
    let directory = manifest_dir()?;
    let mut command = cargo_bin_cmd!("aspectweave");
    command
        .arg("--weaver-program=true")
        .arg("--manifest")
        .arg(directory.path().join("aspectweave.toml"))
        .arg("run");
    command.assert().success().stdout(
        contains("compileReleaseJavaWithJavac: completed")
            .and(contains("configureAspectJForDebug").not())
            .and(contains("aspectJSetupVerify").not()),
    );
    Ok(())
}

#[test]
fn escalated_weave_failures_fail_the_process() -> anyhow::Result<()> {
    let directory = manifest_dir()?;
    let mut command = cargo_bin_cmd!("aspectweave");
    command
        .arg("--weaver-program=false")
        .arg("--fail-on-fatal")
        .arg("--manifest")
        .arg(directory.path().join("aspectweave.toml"))
        .arg("run")
        .arg("compileReleaseJavaWithJavac");
    command
        .assert()
        .failure()
        .stdout(contains("compileReleaseJavaWithJavac: failed"))
        .stderr(contains("fatal diagnostic"));
    Ok(())
}

#[test]
fn missing_manifest_exits_with_failure() -> anyhow::Result<()> {
    let directory = TempDir::new()?;
    let mut command = cargo_bin_cmd!("aspectweave");
    command
        .arg("--manifest")
        .arg(directory.path().join("absent.toml"))
        .arg("tasks");
    command
        .assert()
        .failure()
        .stderr(contains("failed to read manifest"));
    Ok(())
}
