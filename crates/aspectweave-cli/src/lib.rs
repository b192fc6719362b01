//! Command-line runtime for the `aspectweave` build runner.
//!
//! The runner loads layered configuration, reads the project manifest,
//! registers the host tasks, wires the weaving plugin into them and then
//! executes or inspects the resulting build. Configuration loading and IO
//! streams can be substituted so the runtime is exercised from tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use aspectweave_config::Config;
use clap::Parser;

mod cli;
mod config;
mod errors;
mod manifest;
mod session;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, prepare_cli_arguments, split_config_arguments};
use errors::AppError;
use manifest::Manifest;
use session::Session;

/// Bundles the IO streams provided to the CLI runtime.
struct IoStreams<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let result = Cli::try_parse_from(cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|loaded| (cli, loaded))
            })
            .and_then(|(cli, loaded)| {
                telemetry::initialise(&loaded)?;
                self.execute(&cli, &loaded)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let _written = write!(self.io.stdout, "{}", error.render());
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _written = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, cli: &Cli, loaded: &Config) -> Result<ExitCode, AppError> {
        let manifest = Manifest::load(&cli.manifest)?;
        let session = Session::prepare(loaded, &manifest)?;
        match &cli.command {
            CliCommand::Run { tasks } => self.run_tasks(session, tasks),
            CliCommand::Tasks => self.list_tasks(&session),
            CliCommand::Args { unit } => self.print_arguments(&session, &manifest, unit),
        }
    }

    fn report_wiring(&mut self, session: &Session) -> Result<(), AppError> {
        for warning in session.wiring.warnings() {
            writeln!(self.io.stderr, "warning: {warning}")?;
        }
        Ok(())
    }

    fn run_tasks(&mut self, session: Session, tasks: &[String]) -> Result<ExitCode, AppError> {
        self.report_wiring(&session)?;
        let targets = if tasks.is_empty() {
            default_targets(&session)
        } else {
            tasks.to_vec()
        };
        let target_names: Vec<&str> = targets.iter().map(String::as_str).collect();
        let Session {
            mut project, graph, ..
        } = session;
        let report = graph.freeze().execute(&target_names, &mut project)?;
        for outcome in report.outcomes() {
            writeln!(self.io.stdout, "{}: {}", outcome.name(), outcome.state())?;
        }
        match report.failure() {
            Some(failure) => {
                writeln!(self.io.stderr, "{failure}")?;
                Ok(ExitCode::FAILURE)
            }
            None => Ok(ExitCode::SUCCESS),
        }
    }

    fn list_tasks(&mut self, session: &Session) -> Result<ExitCode, AppError> {
        self.report_wiring(session)?;
        for node in session.graph.tasks() {
            if node.dependencies().is_empty() {
                writeln!(self.io.stdout, "{}", node.name())?;
            } else {
                writeln!(
                    self.io.stdout,
                    "{} (depends on {})",
                    node.name(),
                    node.dependencies().join(", ")
                )?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn print_arguments(
        &mut self,
        session: &Session,
        manifest: &Manifest,
        unit: &str,
    ) -> Result<ExitCode, AppError> {
        let compilation_unit = manifest
            .unit(unit)
            .ok_or_else(|| AppError::UnknownUnit(unit.to_owned()))?;
        let arguments = session
            .plugin
            .pipeline()
            .arguments_for(&session.project, &compilation_unit)
            .map_err(AppError::Arguments)?;
        writeln!(self.io.stdout, "{arguments}")?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Every compile task. The runtime check needs a JDK probe and only runs
/// when named.
fn default_targets(session: &Session) -> Vec<String> {
    session
        .graph
        .compile_tasks()
        .map(|node| node.name().to_owned())
        .collect()
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let io = IoStreams { stdout, stderr };
    CliRunner::new(io, loader).run(args)
}

#[cfg(test)]
mod tests;
