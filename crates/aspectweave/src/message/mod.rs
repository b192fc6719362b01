//! Structured diagnostics reported by the weaver.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

mod parse;

pub use self::parse::{parse_output, parse_stream};

/// Severity of a weaver message.
///
/// Ordered from most to least severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeaveSeverity {
    /// The weaver gave up.
    Abort,
    /// A compile or weave error.
    Error,
    /// An internal failure of the weaver.
    Fail,
    /// Something suspicious that did not stop weaving.
    Warning,
    /// Informational output, including weave reports.
    Info,
    /// Diagnostic detail.
    Debug,
}

impl WeaveSeverity {
    /// Whether the severity marks the weave as failed.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Abort | Self::Error | Self::Fail)
    }
}

/// Failure trace attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveCause {
    lines: Vec<String>,
}

impl WeaveCause {
    /// Creates a trace from its lines.
    #[must_use]
    pub const fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Lines of the trace in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

impl fmt::Display for WeaveCause {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.lines.join("\n"))
    }
}

/// One diagnostic from a weaver invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveMessage {
    severity: WeaveSeverity,
    text: String,
    cause: Option<WeaveCause>,
}

impl WeaveMessage {
    /// Creates a message without a cause.
    #[must_use]
    pub fn new(severity: WeaveSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            cause: None,
        }
    }

    /// Attaches a failure cause.
    #[must_use]
    pub fn with_cause(mut self, cause: WeaveCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Severity of the message.
    #[must_use]
    pub const fn severity(&self) -> WeaveSeverity {
        self.severity
    }

    /// Message text.
    #[must_use]
    pub const fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Attached failure cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&WeaveCause> {
        self.cause.as_ref()
    }

    /// Whether the message marks the weave as failed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.severity.is_fatal()
    }

    fn append_cause(&mut self, line: &str) {
        self.cause.get_or_insert_with(WeaveCause::default).push(line);
    }
}

impl fmt::Display for WeaveMessage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {}", self.severity, self.text)
    }
}
