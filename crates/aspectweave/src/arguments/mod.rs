//! Positional argument vector for one weaver invocation.
//!
//! The weaver expects each flag to be immediately followed by its value and
//! the groups to appear in a fixed order. [`WeaveArguments`] is built fresh
//! per compilation unit and handed to the invoker by value.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::paths::ResolvedPaths;

/// Flag asking the weaver to report each applied weave.
pub const SHOW_WEAVE_INFO: &str = "-showWeaveInfo";
/// Flag naming the compiled classes to weave.
pub const INPATH: &str = "-inpath";
/// Flag naming where aspects are looked up.
pub const ASPECTPATH: &str = "-aspectpath";
/// Flag naming the weave destination.
pub const DESTINATION: &str = "-d";
/// Flag naming the compile classpath.
pub const CLASSPATH: &str = "-classpath";
/// Flag naming the platform library path.
pub const BOOTCLASSPATH: &str = "-bootclasspath";

/// Java language level passed as a single `-<level>` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLevel(String);

impl LanguageLevel {
    /// The level without the leading dash, e.g. `11` or `1.8`.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The flag token, e.g. `-11`.
    #[must_use]
    pub fn flag(&self) -> String {
        format!("-{}", self.0)
    }
}

impl FromStr for LanguageLevel {
    type Err = ArgumentError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let level = input.trim().trim_start_matches('-');
        if level.is_empty() || level.chars().any(char::is_whitespace) {
            return Err(ArgumentError::InvalidLanguageLevel(input.to_owned()));
        }
        Ok(Self(level.to_owned()))
    }
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Errors raised while assembling weave arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// The output directory doubles as the weave input and cannot be empty.
    #[error("the output directory of the compilation unit is empty")]
    MissingOutputDirectory,
    /// The language level is not a single token.
    #[error("invalid language level '{0}'")]
    InvalidLanguageLevel(String),
}

/// Ordered weaver arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveArguments(Vec<String>);

impl WeaveArguments {
    /// Builds the argument vector in the weaver's fixed group order.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::MissingOutputDirectory`] when the output
    /// directory is empty. No other input is validated.
    pub fn build(paths: &ResolvedPaths, level: &LanguageLevel) -> Result<Self, ArgumentError> {
        let output = paths.output_dir().as_str();
        if output.is_empty() {
            return Err(ArgumentError::MissingOutputDirectory);
        }
        Ok(Self(vec![
            SHOW_WEAVE_INFO.to_owned(),
            level.flag(),
            INPATH.to_owned(),
            output.to_owned(),
            ASPECTPATH.to_owned(),
            paths.aspect_path().to_owned(),
            DESTINATION.to_owned(),
            output.to_owned(),
            CLASSPATH.to_owned(),
            paths.classpath().to_owned(),
            BOOTCLASSPATH.to_owned(),
            paths.boot_classpath().to_owned(),
        ]))
    }

    /// Arguments in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consumes the arguments.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Value following `flag`, if the flag is present.
    #[must_use]
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.0
            .iter()
            .position(|argument| argument == flag)
            .and_then(|position| self.0.get(position + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for WeaveArguments {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0.join(" "))
    }
}
