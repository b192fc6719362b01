use super::*;

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

const ANDROID_MANIFEST: &str = r#"
name = "app"
plugins = ["com.android.library"]

[android]
boot_classpath = ["/sdk/android.jar"]

[[unit]]
name = "compileDebugJavaWithJavac"
destination = "build/debug/classes"
classpath = ["libs/aspects.jar"]

[[unit]]
name = "compileReleaseJavaWithJavac"
destination = "build/release/classes"
"#;

struct Workspace {
    directory: TempDir,
}

impl Workspace {
    fn manifest(&self) -> OsString {
        self.directory.path().join("aspectweave.toml").into_os_string()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let directory = TempDir::new().expect("temp dir");
    fs::write(directory.path().join("aspectweave.toml"), ANDROID_MANIFEST).expect("manifest");
    Workspace { directory }
}

fn config_with(weaver: &str, fail_on_fatal: bool) -> Config {
    Config {
        weaver_program: weaver.to_owned(),
        probe_program: String::from("true"),
        fail_on_fatal,
        ..Config::default()
    }
}

struct Captured {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(config: Config, args: &[OsString]) -> Captured {
    let mut stdout: Vec<u8> = Vec::new();
    let mut stderr: Vec<u8> = Vec::new();
    let loader = StaticConfigLoader::new(config);
    let exit = run_with_loader(
        args.iter().cloned(),
        &mut stdout,
        &mut stderr,
        &loader,
    );
    Captured {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

fn command(workspace: &Workspace, tail: &[&str]) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("aspectweave"),
        OsString::from("--manifest"),
        workspace.manifest(),
    ];
    args.extend(tail.iter().map(OsString::from));
    args
}

#[rstest]
fn run_executes_every_compile_task_by_default(workspace: Workspace) {
    let captured = invoke(config_with("true", false), &command(&workspace, &["run"]));
    assert_eq!(captured.exit, ExitCode::SUCCESS, "stderr: {}", captured.stderr);
    assert!(captured.stdout.contains("aspectJConfigure: completed"));
    assert!(captured.stdout.contains("compileDebugJavaWithJavac: completed"));
    assert!(captured.stdout.contains("compileReleaseJavaWithJavac: completed"));
    assert!(!captured.stdout.contains("aspectJSetupVerify"));
}

#[rstest]
fn default_run_does_not_need_javap(workspace: Workspace) {
    let config = Config {
        probe_program: String::from("aspectweave-test-missing-javap"),
        ..config_with("true", false)
    };
    let captured = invoke(config.clone(), &command(&workspace, &["run"]));
    assert_eq!(captured.exit, ExitCode::SUCCESS, "stderr: {}", captured.stderr);

    let verify = invoke(config, &command(&workspace, &["run", "aspectJSetupVerify"]));
    assert_eq!(verify.exit, ExitCode::FAILURE);
    assert!(verify.stdout.contains("aspectJSetupVerify: failed"));
}

#[rstest]
fn failing_weaver_is_lenient_by_default(workspace: Workspace) {
    let args = command(&workspace, &["run", "compileDebugJavaWithJavac"]);
    let captured = invoke(config_with("false", false), &args);
    assert_eq!(captured.exit, ExitCode::SUCCESS, "stderr: {}", captured.stderr);
}

#[rstest]
fn failing_weaver_fails_the_build_when_escalated(workspace: Workspace) {
    let args = command(&workspace, &["run", "compileDebugJavaWithJavac"]);
    let captured = invoke(config_with("false", true), &args);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stdout.contains("compileDebugJavaWithJavac: failed"));
    assert!(
        captured.stderr.contains("fatal diagnostic"),
        "stderr: {}",
        captured.stderr
    );
}

#[rstest]
fn tasks_lists_wired_dependencies(workspace: Workspace) {
    let captured = invoke(config_with("true", false), &command(&workspace, &["tasks"]));
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert!(
        captured
            .stdout
            .contains("preBuild (depends on aspectJConfigure)"),
        "stdout: {}",
        captured.stdout
    );
    assert!(
        captured
            .stdout
            .contains("compileDebugJavaWithJavac (depends on preBuild, aspectJWeaving)")
    );
}

#[rstest]
fn args_prints_the_weaver_command_line(workspace: Workspace) {
    let args = command(&workspace, &["args", "compileDebugJavaWithJavac"]);
    let captured = invoke(config_with("true", false), &args);
    assert_eq!(captured.exit, ExitCode::SUCCESS, "stderr: {}", captured.stderr);
    assert!(captured.stdout.starts_with("-showWeaveInfo -11"));
    assert!(captured.stdout.contains("-d build/debug/classes"));
    assert!(captured.stdout.contains("-bootclasspath /sdk/android.jar"));
}

#[rstest]
fn args_rejects_unknown_units(workspace: Workspace) {
    let args = command(&workspace, &["args", "compileTestJava"]);
    let captured = invoke(config_with("true", false), &args);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.contains("'compileTestJava' is not declared"));
}

#[rstest]
fn unknown_targets_are_reported(workspace: Workspace) {
    let args = command(&workspace, &["run", "assembleDebug"]);
    let captured = invoke(config_with("true", false), &args);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.contains("task 'assembleDebug' not found"));
}

#[rstest]
fn invalid_language_levels_are_rejected(workspace: Workspace) {
    let config = Config {
        language_level: String::from("1 8"),
        ..config_with("true", false)
    };
    let captured = invoke(config, &command(&workspace, &["tasks"]));
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.contains("language level"));
}

#[test]
fn missing_command_is_a_usage_error() {
    let captured = invoke(
        config_with("true", false),
        &[OsString::from("aspectweave")],
    );
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.contains("Usage"));
}

#[test]
fn help_goes_to_stdout() {
    let captured = invoke(
        config_with("true", false),
        &[OsString::from("aspectweave"), OsString::from("--help")],
    );
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert!(captured.stdout.contains("--manifest"));
}
