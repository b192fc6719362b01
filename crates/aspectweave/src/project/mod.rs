//! Read-mostly view of the host project the weaving steps operate on.
//!
//! The host build system owns the real project. This module models the parts
//! the orchestration reads: applied plugin identifiers, named extensions,
//! named dependency configurations and the compilation units produced by the
//! host's compile tasks. Extension lookup is a capability query: absence is an
//! expected outcome and is reported through [`ExtensionError`] rather than a
//! panic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plugin identifier marking an Android application project.
pub const ANDROID_APPLICATION_PLUGIN: &str = "com.android.application";

/// Plugin identifier marking an Android library project.
pub const ANDROID_LIBRARY_PLUGIN: &str = "com.android.library";

/// Name of the extension carrying Android platform state.
pub const ANDROID_EXTENSION: &str = "android";

/// Name of the variant API extension registered by the Android plugins.
pub const ANDROID_COMPONENTS_EXTENSION: &str = "androidComponents";

const ANDROID_COMPONENTS_TYPE: &str = "AndroidComponentsExtension";

/// Dependency configuration holding compile-and-runtime dependencies.
pub const IMPLEMENTATION_CONFIGURATION: &str = "implementation";

/// One host compile step whose outputs are woven in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    name: String,
    destination: Utf8PathBuf,
    classpath: String,
}

impl CompilationUnit {
    /// Creates a unit from its task name, class output directory and
    /// classpath string.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        destination: impl Into<Utf8PathBuf>,
        classpath: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            classpath: classpath.into(),
        }
    }

    /// Name of the compile task producing this unit.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Directory holding the compiled classes.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        self.destination.as_path()
    }

    /// Classpath used to compile the unit, already joined with the platform
    /// separator.
    #[must_use]
    pub const fn classpath(&self) -> &str {
        self.classpath.as_str()
    }
}

/// A declared dependency coordinate such as `org.aspectj:aspectjrt:1.9.22`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    group: String,
    name: String,
    version: Option<String>,
}

impl Dependency {
    /// Creates a coordinate.
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version,
        }
    }

    /// Group part of the coordinate.
    #[must_use]
    pub const fn group(&self) -> &str {
        self.group.as_str()
    }

    /// Artifact name part of the coordinate.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Version, when declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(formatter, "{}:{}:{version}", self.group, self.name),
            None => write!(formatter, "{}:{}", self.group, self.name),
        }
    }
}

/// Errors produced when parsing a dependency coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyParseError {
    /// The coordinate did not have two or three colon-separated parts.
    #[error("dependency '{0}' must have the form group:name[:version]")]
    Malformed(String),
    /// One of the parts was empty.
    #[error("dependency '{0}' has an empty component")]
    EmptyComponent(String),
}

impl FromStr for Dependency {
    type Err = DependencyParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.trim().split(':').collect();
        let (group, name, version) = match parts.as_slice() {
            [group, name] => (*group, *name, None),
            [group, name, version] => (*group, *name, Some(*version)),
            _ => return Err(DependencyParseError::Malformed(input.to_owned())),
        };
        if group.is_empty() || name.is_empty() || version.is_some_and(str::is_empty) {
            return Err(DependencyParseError::EmptyComponent(input.to_owned()));
        }
        Ok(Self::new(group, name, version.map(str::to_owned)))
    }
}

/// Android platform state exposed by the `android` extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidExtension {
    boot_classpath: Option<Vec<Utf8PathBuf>>,
}

impl AndroidExtension {
    /// Creates an extension exposing the given platform jars.
    #[must_use]
    pub const fn with_boot_classpath(boot_classpath: Vec<Utf8PathBuf>) -> Self {
        Self {
            boot_classpath: Some(boot_classpath),
        }
    }

    /// Creates an extension whose platform jars are not yet known.
    #[must_use]
    pub const fn unresolved() -> Self {
        Self {
            boot_classpath: None,
        }
    }

    /// Platform jars in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Unavailable`] when the platform jars have not
    /// been resolved by the host.
    pub fn boot_classpath(&self) -> Result<&[Utf8PathBuf], ExtensionError> {
        self.boot_classpath
            .as_deref()
            .ok_or_else(|| ExtensionError::Unavailable {
                name: ANDROID_EXTENSION.to_owned(),
                property: String::from("bootClasspath"),
            })
    }
}

/// Extension objects a project may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extension {
    /// Android platform configuration.
    Android(AndroidExtension),
    /// Any other extension, identified by its type name.
    Other {
        /// Type name reported by the host.
        type_name: String,
    },
}

impl Extension {
    const fn type_name(&self) -> &str {
        match self {
            Self::Android(_) => "AndroidExtension",
            Self::Other { type_name } => type_name.as_str(),
        }
    }
}

/// Errors raised by typed extension lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// No extension is registered under the name.
    #[error("extension '{name}' is not registered")]
    Missing {
        /// Extension name that was queried.
        name: String,
    },
    /// An extension exists under the name but has another type.
    #[error("extension '{name}' has type {found}, expected {expected}")]
    TypeMismatch {
        /// Extension name that was queried.
        name: String,
        /// Type the caller asked for.
        expected: String,
        /// Type that was found.
        found: String,
    },
    /// The extension exists but does not expose the requested property.
    #[error("extension '{name}' does not expose '{property}'")]
    Unavailable {
        /// Extension name that was queried.
        name: String,
        /// Property that could not be read.
        property: String,
    },
}

/// The host project as seen by the weaving steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    name: String,
    plugins: BTreeSet<String>,
    extensions: BTreeMap<String, Extension>,
    configurations: BTreeMap<String, Vec<Dependency>>,
}

impl Project {
    /// Creates an empty project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Marks a plugin as applied.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugins.insert(plugin.into());
        self
    }

    /// Applies an Android plugin the way the host does: the marker is added
    /// and the `androidComponents` extension is registered unless present.
    #[must_use]
    pub fn with_android_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugins.insert(plugin.into());
        self.extensions
            .entry(ANDROID_COMPONENTS_EXTENSION.to_owned())
            .or_insert_with(|| Extension::Other {
                type_name: ANDROID_COMPONENTS_TYPE.to_owned(),
            });
        self
    }

    /// Registers an extension under a name.
    #[must_use]
    pub fn with_extension(mut self, name: impl Into<String>, extension: Extension) -> Self {
        self.extensions.insert(name.into(), extension);
        self
    }

    /// Declares a dependency in a configuration, creating the configuration
    /// when needed.
    #[must_use]
    pub fn with_dependency(mut self, configuration: &str, dependency: Dependency) -> Self {
        self.add_dependency(configuration, dependency);
        self
    }

    /// Declares an empty configuration.
    #[must_use]
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configurations.entry(configuration.into()).or_default();
        self
    }

    /// Project name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether the plugin identifier has been applied.
    #[must_use]
    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.plugins.contains(plugin)
    }

    /// Whether either Android integration marker is present.
    #[must_use]
    pub fn has_android_marker(&self) -> bool {
        self.has_plugin(ANDROID_APPLICATION_PLUGIN) || self.has_plugin(ANDROID_LIBRARY_PLUGIN)
    }

    /// Looks up an extension by name.
    #[must_use]
    pub fn find_extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.get(name)
    }

    /// Looks up the `androidComponents` extension. Any type is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Missing`] when it is not registered.
    pub fn android_components(&self) -> Result<&Extension, ExtensionError> {
        self.find_extension(ANDROID_COMPONENTS_EXTENSION)
            .ok_or_else(|| ExtensionError::Missing {
                name: ANDROID_COMPONENTS_EXTENSION.to_owned(),
            })
    }

    /// Looks up the `android` extension with its expected type.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Missing`] when no extension is registered
    /// under the name and [`ExtensionError::TypeMismatch`] when the registered
    /// extension is of another type.
    pub fn android_extension(&self) -> Result<&AndroidExtension, ExtensionError> {
        match self.find_extension(ANDROID_EXTENSION) {
            Some(Extension::Android(android)) => Ok(android),
            Some(other) => Err(ExtensionError::TypeMismatch {
                name: ANDROID_EXTENSION.to_owned(),
                expected: String::from("AndroidExtension"),
                found: other.type_name().to_owned(),
            }),
            None => Err(ExtensionError::Missing {
                name: ANDROID_EXTENSION.to_owned(),
            }),
        }
    }

    /// Dependencies declared in a configuration, or `None` when the
    /// configuration does not exist.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&[Dependency]> {
        self.configurations.get(name).map(Vec::as_slice)
    }

    /// Adds a dependency to a configuration.
    ///
    /// Returns `false` when the same coordinate was already declared.
    pub fn add_dependency(&mut self, configuration: &str, dependency: Dependency) -> bool {
        let declared = self
            .configurations
            .entry(configuration.to_owned())
            .or_default();
        if declared.contains(&dependency) {
            return false;
        }
        declared.push(dependency);
        true
    }
}
