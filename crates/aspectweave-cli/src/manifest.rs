//! Project manifest: the host build described as TOML.
//!
//! A manifest names the project, the plugins applied to it, its extensions
//! and dependency configurations, the compilation units with their compile
//! tasks, and the build variants to configure. A minimal Android manifest:
//!
//! ```toml
//! name = "app"
//! plugins = ["com.android.application"]
//! variants = ["debug"]
//!
//! [android]
//! boot_classpath = ["/opt/android-sdk/platforms/android-34/android.jar"]
//!
//! [dependencies]
//! implementation = ["androidx.core:core:1.13.1"]
//!
//! [[unit]]
//! name = "compileDebugJavaWithJavac"
//! destination = "build/intermediates/javac/debug/classes"
//! classpath = ["libs/aspects.jar"]
//! command = ["javac", "-d", "build/intermediates/javac/debug/classes", "src/Main.java"]
//! ```
//!
//! Declaring variants registers a `configureAspectJFor<Variant>` task per
//! entry. A variant task runs only when named and adds no dependency edges.
//! When it runs alongside `aspectJWeaving`, each compile task is still woven
//! once.

use std::collections::BTreeMap;
use std::io;
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;

use aspectweave::paths::join_paths;
use aspectweave::plugin::PRE_BUILD_TASK;
use aspectweave::project::{
    ANDROID_APPLICATION_PLUGIN, ANDROID_EXTENSION, ANDROID_LIBRARY_PLUGIN, AndroidExtension,
    CompilationUnit, Dependency, DependencyParseError, Extension, Project,
};
use aspectweave::{GraphError, TaskAction, TaskContext, TaskError, TaskGraph};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const MANIFEST_TARGET: &str = "aspectweave_cli::manifest";

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub(crate) enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: Arc<io::Error>,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: Box<toml::de::Error>,
    },
    #[error("invalid dependency in configuration '{configuration}': {source}")]
    Dependency {
        configuration: String,
        source: DependencyParseError,
    },
}

/// Host build description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Manifest {
    name: String,
    #[serde(default)]
    plugins: Vec<String>,
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    android: Option<AndroidExtension>,
    #[serde(default)]
    extensions: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "unit")]
    units: Vec<UnitManifest>,
}

/// One compilation unit and the command compiling it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitManifest {
    name: String,
    destination: Utf8PathBuf,
    #[serde(default)]
    classpath: Vec<Utf8PathBuf>,
    #[serde(default)]
    command: Vec<String>,
}

impl UnitManifest {
    fn to_unit(&self) -> CompilationUnit {
        CompilationUnit::new(
            self.name.as_str(),
            self.destination.clone(),
            join_paths(&self.classpath),
        )
    }
}

impl FromStr for Manifest {
    type Err = toml::de::Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        toml::from_str(text)
    }
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    pub(crate) fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let manifest = text.parse::<Self>().map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        info!(
            target: MANIFEST_TARGET,
            path = %path,
            project = manifest.name.as_str(),
            units = manifest.units.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Build variants to configure.
    pub(crate) fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Compilation unit produced by the named compile task.
    pub(crate) fn unit(&self, name: &str) -> Option<CompilationUnit> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .map(UnitManifest::to_unit)
    }

    /// Builds the evaluated project model.
    pub(crate) fn project(&self) -> Result<Project, ManifestError> {
        let mut project = Project::new(self.name.as_str());
        for plugin in &self.plugins {
            project = match plugin.as_str() {
                ANDROID_APPLICATION_PLUGIN | ANDROID_LIBRARY_PLUGIN => {
                    project.with_android_plugin(plugin.as_str())
                }
                other => project.with_plugin(other),
            };
        }
        for (name, type_name) in &self.extensions {
            project = project.with_extension(
                name.as_str(),
                Extension::Other {
                    type_name: type_name.clone(),
                },
            );
        }
        if let Some(android) = &self.android {
            project = project.with_extension(ANDROID_EXTENSION, Extension::Android(android.clone()));
        }
        for (configuration, coordinates) in &self.dependencies {
            project = project.with_configuration(configuration.as_str());
            for coordinate in coordinates {
                let dependency = coordinate.parse::<Dependency>().map_err(|source| {
                    ManifestError::Dependency {
                        configuration: configuration.clone(),
                        source,
                    }
                })?;
                project.add_dependency(configuration, dependency);
            }
        }
        Ok(project)
    }

    /// Registers the host tasks: `preBuild` and one compile task per unit,
    /// each depending on `preBuild`.
    pub(crate) fn host_graph(&self) -> Result<TaskGraph, GraphError> {
        let mut graph = TaskGraph::new();
        graph.register(PRE_BUILD_TASK, PreBuildAction)?;
        for unit in &self.units {
            graph.register_compile(
                unit.to_unit(),
                CompileAction {
                    command: unit.command.clone(),
                },
            )?;
            graph.depends_on(&unit.name, PRE_BUILD_TASK)?;
        }
        Ok(graph)
    }
}

struct PreBuildAction;

impl TaskAction for PreBuildAction {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        debug!(target: MANIFEST_TARGET, task = context.task(), "host pre-build");
        Ok(())
    }
}

/// Failures of a unit's compile command.
#[derive(Debug, Error)]
enum CompileError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: Arc<io::Error>,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    Status {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Runs the unit's compile command, if any.
struct CompileAction {
    command: Vec<String>,
}

impl TaskAction for CompileAction {
    fn execute(&self, context: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let task = context.task();
        let Some((program, arguments)) = self.command.split_first() else {
            debug!(target: MANIFEST_TARGET, task, "no compile command; classes are prebuilt");
            return Ok(());
        };
        debug!(target: MANIFEST_TARGET, task, program = program.as_str(), "compiling");
        let output = Command::new(program)
            .args(arguments)
            .output()
            .map_err(|source| {
                TaskError::action(
                    task,
                    CompileError::Spawn {
                        program: program.clone(),
                        source: Arc::new(source),
                    },
                )
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(TaskError::action(
            task,
            CompileError::Status {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use aspectweave::TaskState;
    use aspectweave::project::{ANDROID_COMPONENTS_EXTENSION, ExtensionError};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn android_manifest() -> Manifest {
        r#"
            name = "app"
            plugins = ["com.android.application"]
            variants = ["debug"]

            [android]
            boot_classpath = ["/sdk/android.jar", "/sdk/optional.jar"]

            [extensions]
            kotlin = "KotlinAndroidProjectExtension"

            [dependencies]
            implementation = ["androidx.core:core:1.13.1", "androidx.core:core:1.13.1"]
            testImplementation = []

            [[unit]]
            name = "compileDebugJavaWithJavac"
            destination = "build/debug/classes"
            classpath = ["libs/a.jar", "libs/b.jar"]

            [[unit]]
            name = "compileReleaseJavaWithJavac"
            destination = "build/release/classes"
        "#
        .parse()
        .expect("manifest parses")
    }

    #[rstest]
    fn android_plugins_bring_the_components_extension(android_manifest: Manifest) {
        let project = android_manifest.project().expect("project builds");
        assert!(project.android_components().is_ok());

        let plain: Manifest = "name = \"lib\"\nplugins = [\"java-library\"]\n"
            .parse()
            .expect("manifest parses");
        let error = plain
            .project()
            .expect("project builds")
            .android_components()
            .expect_err("no android plugin");
        assert_eq!(
            error,
            ExtensionError::Missing {
                name: String::from(ANDROID_COMPONENTS_EXTENSION)
            }
        );
    }

    #[rstest]
    fn project_carries_plugins_and_extensions(android_manifest: Manifest) {
        let project = android_manifest.project().expect("project builds");
        assert_eq!(project.name(), "app");
        assert!(project.has_plugin(ANDROID_APPLICATION_PLUGIN));
        let android = project.android_extension().expect("android extension");
        assert_eq!(
            android.boot_classpath().expect("resolved"),
            &[
                Utf8PathBuf::from("/sdk/android.jar"),
                Utf8PathBuf::from("/sdk/optional.jar")
            ]
        );
        assert_eq!(
            project.find_extension("kotlin"),
            Some(&Extension::Other {
                type_name: String::from("KotlinAndroidProjectExtension")
            })
        );
    }

    #[rstest]
    fn duplicate_coordinates_are_declared_once(android_manifest: Manifest) {
        let project = android_manifest.project().expect("project builds");
        assert_eq!(project.configuration("implementation").map(<[_]>::len), Some(1));
        assert_eq!(project.configuration("testImplementation"), Some(&[][..]));
    }

    #[rstest]
    fn units_join_their_classpath(android_manifest: Manifest) {
        let unit = android_manifest
            .unit("compileDebugJavaWithJavac")
            .expect("unit declared");
        assert_eq!(unit.destination().as_str(), "build/debug/classes");
        assert_eq!(
            unit.classpath(),
            format!("libs/a.jar{}libs/b.jar", aspectweave::paths::PATH_SEPARATOR)
        );
        assert!(android_manifest.unit("compileTestJava").is_none());
    }

    #[rstest]
    fn compile_tasks_depend_on_pre_build(android_manifest: Manifest) {
        let graph = android_manifest.host_graph().expect("graph builds");
        assert_eq!(graph.compile_tasks().count(), 2);
        let node = graph
            .find("compileReleaseJavaWithJavac")
            .expect("compile task registered");
        assert_eq!(node.dependencies(), &[String::from(PRE_BUILD_TASK)]);
        assert_eq!(android_manifest.variants(), &[String::from("debug")]);
    }

    #[test]
    fn android_table_without_jars_is_unavailable() {
        let manifest: Manifest = "name = \"app\"\n[android]\n".parse().expect("parses");
        let project = manifest.project().expect("project builds");
        let android = project.android_extension().expect("registered");
        assert!(matches!(
            android.boot_classpath(),
            Err(ExtensionError::Unavailable { .. })
        ));
    }

    #[test]
    fn other_extension_named_android_is_a_type_mismatch() {
        let manifest: Manifest = "name = \"app\"\n[extensions]\nandroid = \"BaseExtension\"\n"
            .parse()
            .expect("parses");
        let project = manifest.project().expect("project builds");
        assert!(matches!(
            project.android_extension(),
            Err(ExtensionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let manifest: Manifest = "name = \"app\"\n[dependencies]\nimplementation = [\"aspectjrt\"]\n"
            .parse()
            .expect("parses");
        let error = manifest.project().expect_err("coordinate is malformed");
        assert!(matches!(
            error,
            ManifestError::Dependency { ref configuration, .. } if configuration == "implementation"
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = "name = \"app\"\nflavour = \"free\"\n".parse::<Manifest>();
        assert!(result.is_err());
    }

    #[test]
    fn missing_files_report_their_path() {
        let directory = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(directory.path().join("absent.toml"))
            .expect("utf-8 path");
        let error = Manifest::load(&path).expect_err("file is absent");
        assert!(error.to_string().contains("absent.toml"));
    }

    #[rstest]
    #[case(r#"["sh", "-c", "exit 0"]"#, TaskState::Completed)]
    #[case(r#"["sh", "-c", "echo broken >&2; exit 3"]"#, TaskState::Failed)]
    #[case(r#"["/nonexistent/javac"]"#, TaskState::Failed)]
    fn compile_commands_decide_the_task_state(#[case] command: &str, #[case] expected: TaskState) {
        let text = format!(
            "name = \"lib\"\n[[unit]]\nname = \"compileJava\"\ndestination = \"out\"\ncommand = {command}\n"
        );
        let manifest: Manifest = text.parse().expect("parses");
        let mut project = manifest.project().expect("project builds");
        let report = manifest
            .host_graph()
            .expect("graph builds")
            .freeze()
            .execute(&["compileJava"], &mut project)
            .expect("schedulable");
        assert_eq!(report.state_of("compileJava"), Some(expected));
    }

    #[test]
    fn failed_commands_report_their_stderr() {
        let text = "name = \"lib\"\n[[unit]]\nname = \"compileJava\"\ndestination = \"out\"\n\
                    command = [\"sh\", \"-c\", \"echo broken >&2; exit 3\"]\n";
        let manifest: Manifest = text.parse().expect("parses");
        let mut project = manifest.project().expect("project builds");
        let report = manifest
            .host_graph()
            .expect("graph builds")
            .freeze()
            .execute(&["compileJava"], &mut project)
            .expect("schedulable");
        let failure = report.failure().expect("task failed").to_string();
        assert!(failure.contains("broken"), "unexpected failure: {failure}");
    }
}
