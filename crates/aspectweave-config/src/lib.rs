//! Layered configuration shared by the `aspectweave` binary and library.
//!
//! Values are merged from defaults, an optional configuration file, the
//! `ASPECTWEAVE_*` environment and command-line flags, in that order of
//! increasing precedence. Loading is delegated to `ortho_config`.

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_BOOT_CLASSPATH_ENV, DEFAULT_LANGUAGE_LEVEL, DEFAULT_LOG_FILTER, DEFAULT_PROBE_PROGRAM,
    DEFAULT_WEAVER_PROGRAM, default_boot_classpath_env, default_language_level,
    default_log_filter, default_log_filter_string, default_log_format, default_probe_program,
    default_weaver_program,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for a weaving run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ASPECTWEAVE")]
pub struct Config {
    /// `tracing` filter expression applied to emitted events.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Executable of the aspect weaver.
    #[serde(default = "defaults::default_weaver_program")]
    #[ortho_config(default = defaults::default_weaver_program())]
    pub weaver_program: String,
    /// Language level handed to the weaver.
    #[serde(default = "defaults::default_language_level")]
    #[ortho_config(default = defaults::default_language_level())]
    pub language_level: String,
    /// Fails the owning compile task when the weaver reports fatal
    /// diagnostics or cannot be invoked.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub fail_on_fatal: bool,
    /// Environment variable read as the fallback bootclasspath.
    #[serde(default = "defaults::default_boot_classpath_env")]
    #[ortho_config(default = defaults::default_boot_classpath_env())]
    pub boot_classpath_env: String,
    /// Program used to probe runtime class availability.
    #[serde(default = "defaults::default_probe_program")]
    #[ortho_config(default = defaults::default_probe_program())]
    pub probe_program: String,
    /// Classpath handed to the runtime class probe.
    #[serde(default)]
    #[ortho_config(default = String::new())]
    pub probe_classpath: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            weaver_program: default_weaver_program(),
            language_level: default_language_level(),
            fail_on_fatal: false,
            boot_classpath_env: default_boot_classpath_env(),
            probe_program: default_probe_program(),
            probe_classpath: String::new(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Weaver executable.
    #[must_use]
    pub const fn weaver_program(&self) -> &str {
        self.weaver_program.as_str()
    }

    /// Language level token without the leading dash.
    #[must_use]
    pub const fn language_level(&self) -> &str {
        self.language_level.as_str()
    }

    /// Whether fatal weave diagnostics fail the owning task.
    #[must_use]
    pub const fn fail_on_fatal(&self) -> bool {
        self.fail_on_fatal
    }

    /// Environment variable holding the fallback bootclasspath.
    #[must_use]
    pub const fn boot_classpath_env(&self) -> &str {
        self.boot_classpath_env.as_str()
    }

    /// Runtime class probe program.
    #[must_use]
    pub const fn probe_program(&self) -> &str {
        self.probe_program.as_str()
    }

    /// Classpath searched by the runtime class probe, if any.
    #[must_use]
    pub fn probe_classpath(&self) -> Option<&str> {
        Some(self.probe_classpath.as_str()).filter(|classpath| !classpath.is_empty())
    }
}
