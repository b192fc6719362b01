//! Configuration loading helpers for the CLI.
//!
//! Leading configuration flags are handed to `ortho_config`; everything from
//! the first other token onwards is parsed by `clap` as the command line.

use std::ffi::{OsStr, OsString};

use aspectweave_config::Config;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

/// Configuration flags that take a value.
///
/// MAINTENANCE: keep in sync with the fields of
/// [`aspectweave_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--weaver-program",
    "--language-level",
    "--boot-classpath-env",
    "--probe-program",
    "--probe-classpath",
];

/// Boolean configuration flags, which never consume a value.
pub(crate) const CONFIG_CLI_SWITCHES: &[&str] = &["--fail-on-fatal"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// Configuration flags must appear before the command line. Flags after
    /// the first other token are parsed as command arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        if !argument_text.starts_with("--") {
            return FlagAction::Skip;
        }

        let (flag, has_inline_value) = argument_text
            .split_once('=')
            .map_or((&*argument_text, false), |(flag, _)| (flag, true));

        if CONFIG_CLI_SWITCHES.contains(&flag) {
            return FlagAction::Include { needs_value: false };
        }
        if CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }

        FlagAction::Skip
    }
}

#[derive(Debug)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

/// Separates leading configuration flags from the command line.
///
/// The program name is kept as the first configuration argument.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered = vec![program.clone()];
    let mut consumed = 0usize;
    let mut pending_value = false;

    for argument in rest {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            consumed += 1;
            continue;
        }

        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                pending_value = needs_value;
                consumed += 1;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start: consumed + 1,
    }
}

/// Program name followed by the command tokens left after the split.
pub(crate) fn prepare_cli_arguments(
    args: &[OsString],
    split: &ConfigArgumentSplit,
) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--log-filter", FlagAction::Include { needs_value: true })]
    #[case("--fail-on-fatal", FlagAction::Include { needs_value: false })]
    #[case("run", FlagAction::Skip)]
    #[case("--manifest", FlagAction::Skip)]
    #[case("--unknown", FlagAction::Skip)]
    fn flags_are_classified(#[case] argument: &str, #[case] expected: FlagAction) {
        let action = OrthoConfigLoader::process_config_flag(OsStr::new(argument));
        assert_eq!(action, expected);
    }

    #[test]
    fn leading_flags_are_split_from_the_command() {
        let args = os_args(&[
            "aspectweave",
            "--weaver-program",
            "ajc",
            "--fail-on-fatal",
            "--log-format=json",
            "--manifest",
            "build.toml",
            "run",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&[
                "aspectweave",
                "--weaver-program",
                "ajc",
                "--fail-on-fatal",
                "--log-format=json",
            ])
        );
        assert_eq!(
            prepare_cli_arguments(&args, &split),
            os_args(&["aspectweave", "--manifest", "build.toml", "run"])
        );
    }

    #[test]
    fn flags_after_the_command_stay_with_the_command() {
        let args = os_args(&["aspectweave", "run", "--log-filter", "debug"]);
        let split = split_config_arguments(&args);
        assert_eq!(split.config_arguments, os_args(&["aspectweave"]));
        assert_eq!(prepare_cli_arguments(&args, &split), args);
    }

    #[test]
    fn empty_arguments_split_into_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(prepare_cli_arguments(&[], &split).is_empty());
    }
}
