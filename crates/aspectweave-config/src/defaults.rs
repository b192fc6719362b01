/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Weaver executable invoked when no override is configured.
pub const DEFAULT_WEAVER_PROGRAM: &str = "ajc";

/// Language level passed to the weaver as `-<level>`.
pub const DEFAULT_LANGUAGE_LEVEL: &str = "11";

/// Environment variable consulted when the platform bootclasspath cannot be
/// read from the project.
pub const DEFAULT_BOOT_CLASSPATH_ENV: &str = "ASPECTWEAVE_BOOT_CLASSPATH";

/// Program used to probe whether a runtime class can be loaded.
pub const DEFAULT_PROBE_PROGRAM: &str = "javap";

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Owned weaver program name.
#[must_use]
pub fn default_weaver_program() -> String {
    DEFAULT_WEAVER_PROGRAM.to_owned()
}

/// Owned language level.
#[must_use]
pub fn default_language_level() -> String {
    DEFAULT_LANGUAGE_LEVEL.to_owned()
}

/// Owned bootclasspath environment variable name.
#[must_use]
pub fn default_boot_classpath_env() -> String {
    DEFAULT_BOOT_CLASSPATH_ENV.to_owned()
}

/// Owned probe program name.
#[must_use]
pub fn default_probe_program() -> String {
    DEFAULT_PROBE_PROGRAM.to_owned()
}
