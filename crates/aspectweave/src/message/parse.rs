//! Line-oriented parser for the weaver's textual diagnostics.

use std::process::ExitStatus;

use super::{WeaveMessage, WeaveSeverity};

const CONTINUATION_PREFIXES: [&str; 3] = ["at ", "Caused by:", "..."];
const WEAVE_INFO_PREFIX: &str = "weaveinfo";

/// Parses one output stream into messages.
///
/// Lines carrying a bracketed kind tag such as `[error]` start a message of
/// that severity. Indented lines and stack-trace lines extend the cause of
/// the previous message, as do untagged lines following a fatal message,
/// such as the echoed source line of a compile error. Everything else is
/// informational.
#[must_use]
pub fn parse_stream(output: &str) -> Vec<WeaveMessage> {
    let mut messages: Vec<WeaveMessage> = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let joins_previous = messages.last().is_some_and(|previous| {
            is_continuation(line) || (previous.is_fatal() && is_untagged_detail(trimmed))
        });
        if joins_previous {
            if let Some(previous) = messages.last_mut() {
                previous.append_cause(trimmed);
            }
        } else {
            messages.push(classify(trimmed));
        }
    }
    messages
}

/// Parses both streams of a finished weaver process.
///
/// Standard output messages precede standard error messages. A non-zero
/// exit without any fatal message yields a trailing `FAIL` message naming
/// the status.
#[must_use]
pub fn parse_output(stdout: &str, stderr: &str, status: ExitStatus) -> Vec<WeaveMessage> {
    let mut messages = parse_stream(stdout);
    messages.extend(parse_stream(stderr));
    if !status.success() && !messages.iter().any(WeaveMessage::is_fatal) {
        messages.push(WeaveMessage::new(
            WeaveSeverity::Fail,
            format!("weaver exited unsuccessfully ({status})"),
        ));
    }
    messages
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(char::is_whitespace)
        || CONTINUATION_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
}

fn is_untagged_detail(line: &str) -> bool {
    !line.starts_with(WEAVE_INFO_PREFIX) && tagged(line).is_none()
}

fn classify(line: &str) -> WeaveMessage {
    // Untagged lines, `weaveinfo` reports included, are informational.
    tagged(line).map_or_else(
        || WeaveMessage::new(WeaveSeverity::Info, line),
        |(severity, text)| WeaveMessage::new(severity, text),
    )
}

/// Finds the first `[kind]` tag naming a severity and strips it.
fn tagged(line: &str) -> Option<(WeaveSeverity, String)> {
    let mut rest = line;
    let mut consumed = 0;
    while let Some(open) = rest.find('[') {
        let after_open = rest.get(open + 1..)?;
        let close = after_open.find(']')?;
        let tag = after_open.get(..close)?;
        let start = consumed + open;
        let end = start + close + 2;
        if let Ok(severity) = tag.trim().parse::<WeaveSeverity>() {
            let before = line.get(..start).unwrap_or_default();
            let after = line.get(end..).unwrap_or_default();
            let text = format!("{} {}", before.trim(), after.trim());
            return Some((severity, text.trim().to_owned()));
        }
        consumed = start + 1;
        rest = line.get(consumed..)?;
    }
    None
}
