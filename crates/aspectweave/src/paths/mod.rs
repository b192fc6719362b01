//! Resolution of the path inputs handed to the weaver.
//!
//! Output directory and classpath come straight from the compilation unit;
//! the aspect path defaults to the classpath. The bootclasspath is read from
//! the `android` extension and falls back to an environment-provided string
//! when the extension cannot supply it. Resolution never fails: every lookup
//! problem degrades to the fallback and is logged.

use std::env;

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use crate::project::{CompilationUnit, Project};

const PATHS_TARGET: &str = "aspectweave::paths";

/// Separator used to join classpath entries on this platform.
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';

/// Separator used to join classpath entries on this platform.
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Read access to environment variables.
#[cfg_attr(test, mockall::automock)]
pub trait Environment {
    /// Returns the value of `key` when set and valid Unicode.
    fn var(&self, key: &str) -> Option<String>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// [`Environment`] backed by the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Joins entries with [`PATH_SEPARATOR`], in order, without a trailing
/// separator.
#[must_use]
pub fn join_paths(entries: &[Utf8PathBuf]) -> String {
    let mut joined = String::new();
    for (position, entry) in entries.iter().enumerate() {
        if position > 0 {
            joined.push(PATH_SEPARATOR);
        }
        joined.push_str(entry.as_str());
    }
    joined
}

/// Paths resolved for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    output_dir: Utf8PathBuf,
    aspect_path: String,
    classpath: String,
    boot_classpath: String,
}

impl ResolvedPaths {
    /// Assembles resolved paths directly.
    #[must_use]
    pub fn new(
        output_dir: impl Into<Utf8PathBuf>,
        aspect_path: impl Into<String>,
        classpath: impl Into<String>,
        boot_classpath: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            aspect_path: aspect_path.into(),
            classpath: classpath.into(),
            boot_classpath: boot_classpath.into(),
        }
    }

    /// Directory that is both the weave input and the weave destination.
    #[must_use]
    pub const fn output_dir(&self) -> &Utf8PathBuf {
        &self.output_dir
    }

    /// Locations searched for aspects.
    #[must_use]
    pub const fn aspect_path(&self) -> &str {
        self.aspect_path.as_str()
    }

    /// Classpath of the compilation unit.
    #[must_use]
    pub const fn classpath(&self) -> &str {
        self.classpath.as_str()
    }

    /// Platform library path, possibly empty.
    #[must_use]
    pub const fn boot_classpath(&self) -> &str {
        self.boot_classpath.as_str()
    }
}

/// Resolves [`ResolvedPaths`] from project state.
#[derive(Debug, Clone)]
pub struct PathResolver<V = ProcessEnvironment> {
    environment: V,
    boot_classpath_env: String,
}

impl PathResolver<ProcessEnvironment> {
    /// Creates a resolver reading the fallback from the process environment.
    #[must_use]
    pub fn from_process(boot_classpath_env: impl Into<String>) -> Self {
        Self::new(ProcessEnvironment, boot_classpath_env)
    }
}

impl<V: Environment> PathResolver<V> {
    /// Creates a resolver reading the bootclasspath fallback from
    /// `boot_classpath_env` in `environment`.
    #[must_use]
    pub fn new(environment: V, boot_classpath_env: impl Into<String>) -> Self {
        Self {
            environment,
            boot_classpath_env: boot_classpath_env.into(),
        }
    }

    /// Resolves all paths for `unit`.
    #[must_use]
    pub fn resolve(&self, project: &Project, unit: &CompilationUnit) -> ResolvedPaths {
        let classpath = unit.classpath().to_owned();
        ResolvedPaths {
            output_dir: unit.destination().to_path_buf(),
            aspect_path: classpath.clone(),
            classpath,
            boot_classpath: self.boot_classpath(project),
        }
    }

    /// Resolves the platform bootclasspath.
    ///
    /// The jars exposed by the `android` extension win; otherwise the
    /// configured environment variable is used, then the empty string.
    #[must_use]
    pub fn boot_classpath(&self, project: &Project) -> String {
        let lookup = project
            .android_extension()
            .and_then(|android| android.boot_classpath().map(join_paths));
        lookup.map_or_else(
            |error| {
                warn!(
                    target: PATHS_TARGET,
                    %error,
                    variable = %self.boot_classpath_env,
                    "android boot classpath unavailable; using environment fallback"
                );
                self.environment
                    .var(&self.boot_classpath_env)
                    .unwrap_or_default()
            },
            |joined| {
                debug!(target: PATHS_TARGET, boot_classpath = %joined, "using android boot classpath");
                joined
            },
        )
    }
}
