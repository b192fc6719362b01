//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use aspectweave::{ArgumentError, GraphError, PluginError};
use thiserror::Error;

use crate::manifest::ManifestError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("configured language level is invalid: {0}")]
    LanguageLevel(ArgumentError),
    #[error("the weaver program must not be empty")]
    EmptyWeaverProgram,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("compilation unit '{0}' is not declared in the manifest")]
    UnknownUnit(String),
    #[error("failed to build weave arguments: {0}")]
    Arguments(ArgumentError),
    #[error("failed to write output: {0}")]
    WriteOutput(Arc<io::Error>),
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::WriteOutput(Arc::new(error))
    }
}
