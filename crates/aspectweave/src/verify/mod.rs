//! Precondition checks for weaving at runtime.
//!
//! Two independent checks are reported and never fail the build: whether the
//! runtime library is declared in the `implementation` configuration, and
//! whether the runtime's core class can be loaded. Only an unexpected probe
//! failure propagates.

use std::fmt;
use std::io;
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::project::{Dependency, IMPLEMENTATION_CONFIGURATION, Project};

const VERIFY_TARGET: &str = "aspectweave::verify";

/// Group of the weaving runtime library.
pub const RUNTIME_GROUP: &str = "org.aspectj";
/// Artifact name of the weaving runtime library.
pub const RUNTIME_NAME: &str = "aspectjrt";
/// Version of the runtime library added by the configure step.
pub const RUNTIME_VERSION: &str = "1.9.22";
/// Class whose presence proves the runtime is loadable.
pub const RUNTIME_CLASS: &str = "org.aspectj.lang.JoinPoint";

/// The runtime coordinate `org.aspectj:aspectjrt:1.9.22`.
#[must_use]
pub fn runtime_dependency() -> Dependency {
    Dependency::new(
        RUNTIME_GROUP,
        RUNTIME_NAME,
        Some(RUNTIME_VERSION.to_owned()),
    )
}

/// Outcome of the two checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationReport {
    dependency_declared: bool,
    runtime_loadable: bool,
}

impl VerificationReport {
    /// Creates a report from the two check results.
    #[must_use]
    pub const fn new(dependency_declared: bool, runtime_loadable: bool) -> Self {
        Self {
            dependency_declared,
            runtime_loadable,
        }
    }

    /// Whether a dependency named exactly `aspectjrt` is declared.
    #[must_use]
    pub const fn dependency_declared(&self) -> bool {
        self.dependency_declared
    }

    /// Whether the runtime class could be loaded.
    #[must_use]
    pub const fn runtime_loadable(&self) -> bool {
        self.runtime_loadable
    }

    /// Whether both checks passed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.dependency_declared && self.runtime_loadable
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "dependency declared: {}, runtime class loadable: {}",
            self.dependency_declared, self.runtime_loadable
        )
    }
}

/// Whether the `implementation` configuration declares the runtime.
///
/// Only the artifact name is compared and it must match exactly.
#[must_use]
pub fn dependency_declared(project: &Project) -> bool {
    project
        .configuration(IMPLEMENTATION_CONFIGURATION)
        .is_some_and(|dependencies| {
            dependencies
                .iter()
                .any(|dependency| dependency.name() == RUNTIME_NAME)
        })
}

/// Errors raised by a class probe.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// The class is not on the probed classpath.
    #[error("class '{class}' not found")]
    ClassNotFound {
        /// Fully qualified class name.
        class: String,
    },
    /// The probe ran but failed for another reason.
    #[error("probing class '{class}' failed: {message}")]
    Unexpected {
        /// Fully qualified class name.
        class: String,
        /// Diagnostic reported by the probe.
        message: String,
    },
    /// The probe program could not be started.
    #[error("failed to start class probe '{program}': {source}")]
    Spawn {
        /// Probe program.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Checks whether a class can be loaded.
#[cfg_attr(test, mockall::automock)]
pub trait ClassProbe {
    /// Loads `class` or explains why it cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::ClassNotFound`] when the class is absent and
    /// another variant for any other failure.
    fn load(&self, class: &str) -> Result<(), ProbeError>;
}

/// [`ClassProbe`] running the JDK's `javap` against a classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavapProbe {
    program: String,
    leading: Vec<String>,
    classpath: Option<String>,
}

impl JavapProbe {
    /// Creates a probe running `program`, optionally with `-cp classpath`.
    #[must_use]
    pub fn new(program: impl Into<String>, classpath: Option<String>) -> Self {
        Self {
            program: program.into(),
            leading: Vec::new(),
            classpath,
        }
    }

    /// Sets arguments passed to the program before any probe argument.
    #[must_use]
    pub fn with_leading_args(mut self, leading: Vec<String>) -> Self {
        self.leading = leading;
        self
    }
}

impl ClassProbe for JavapProbe {
    fn load(&self, class: &str) -> Result<(), ProbeError> {
        let mut command = Command::new(&self.program);
        command.args(&self.leading);
        if let Some(classpath) = &self.classpath {
            command.arg("-cp").arg(classpath);
        }
        let output = command
            .arg(class)
            .output()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source: Arc::new(source),
            })?;
        if output.status.success() {
            return Ok(());
        }
        let report = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if report.to_ascii_lowercase().contains("class not found") {
            return Err(ProbeError::ClassNotFound {
                class: class.to_owned(),
            });
        }
        Err(ProbeError::Unexpected {
            class: class.to_owned(),
            message: report.trim().to_owned(),
        })
    }
}

/// Runs both checks and logs their outcome.
///
/// # Errors
///
/// Returns the probe's error unless it is [`ProbeError::ClassNotFound`],
/// which is reported as an unloadable runtime.
pub fn verify(
    project: &Project,
    probe: &(impl ClassProbe + ?Sized),
) -> Result<VerificationReport, ProbeError> {
    let declared = dependency_declared(project);
    if declared {
        info!(target: VERIFY_TARGET, project = project.name(), "aspectjrt dependency is declared");
    } else {
        warn!(target: VERIFY_TARGET, project = project.name(), "aspectjrt dependency is not declared");
    }

    let loadable = match probe.load(RUNTIME_CLASS) {
        Ok(()) => true,
        Err(ProbeError::ClassNotFound { class }) => {
            debug!(target: VERIFY_TARGET, class = %class, "runtime class not found");
            false
        }
        Err(error) => return Err(error),
    };
    if loadable {
        info!(target: VERIFY_TARGET, class = RUNTIME_CLASS, "aspectj runtime classes are available");
    } else {
        warn!(target: VERIFY_TARGET, class = RUNTIME_CLASS, "aspectj runtime classes are not available");
    }

    Ok(VerificationReport::new(declared, loadable))
}
