//! Unit tests for weaver invocation.

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::arguments::LanguageLevel;
use crate::message::WeaveSeverity;
use crate::paths::ResolvedPaths;

#[fixture]
fn arguments() -> WeaveArguments {
    let level: LanguageLevel = "11".parse().expect("level");
    WeaveArguments::build(&ResolvedPaths::new("out", "a.jar", "a.jar", ""), &level)
        .expect("arguments")
}

/// Writes a shell script standing in for the weaver and returns an invoker
/// running it through `sh`.
fn scripted(directory: &TempDir, body: &str) -> AjcInvoker {
    let script = directory.path().join("ajc.sh");
    fs::write(&script, body).expect("write script");
    AjcInvoker::new("sh").with_leading_args(vec![script.display().to_string()])
}

#[rstest]
fn collects_messages_from_both_streams(arguments: WeaveArguments) {
    let directory = TempDir::new().expect("temp dir");
    let invoker = scripted(
        &directory,
        "echo '[warning] advice defined in Log has not been applied'\n\
         echo 'weaveinfo Join point advised' \n\
         echo '[error] cannot find type Foo' >&2\n\
         echo '    at Foo.bar(Foo.java:1)' >&2\n\
         exit 1\n",
    );
    let messages = invoker.invoke(arguments).expect("invoke");
    let severities: Vec<WeaveSeverity> = messages.iter().map(WeaveMessage::severity).collect();
    assert_eq!(
        severities,
        vec![WeaveSeverity::Warning, WeaveSeverity::Info, WeaveSeverity::Error]
    );
    assert!(messages.last().and_then(WeaveMessage::cause).is_some());
}

#[rstest]
fn receives_arguments_in_order(arguments: WeaveArguments) {
    let directory = TempDir::new().expect("temp dir");
    let invoker = scripted(&directory, "echo \"$1 $2 $3 $4\"\n");
    let messages = invoker.invoke(arguments).expect("invoke");
    assert_eq!(
        messages.first().map(WeaveMessage::text),
        Some("-showWeaveInfo -11 -inpath out")
    );
}

#[rstest]
fn unsuccessful_exit_without_diagnostics_fails(arguments: WeaveArguments) {
    let directory = TempDir::new().expect("temp dir");
    let invoker = scripted(&directory, "exit 3\n");
    let messages = invoker.invoke(arguments).expect("invoke");
    assert_eq!(messages.len(), 1);
    assert!(messages.iter().all(WeaveMessage::is_fatal));
}

#[rstest]
fn undecodable_output_still_yields_diagnostics(arguments: WeaveArguments) {
    let directory = TempDir::new().expect("temp dir");
    let invoker = scripted(
        &directory,
        "printf '[error] cannot read caf\\351.class\\n' >&2\nexit 1\n",
    );
    let messages = invoker.invoke(arguments).expect("invoke");
    assert_eq!(messages.len(), 1);
    let message = messages.first().expect("message");
    assert!(message.is_fatal());
    assert!(message.text().contains('\u{fffd}'), "text: {}", message.text());
}

#[rstest]
fn missing_program_is_a_spawn_error(arguments: WeaveArguments) {
    let invoker = AjcInvoker::new("aspectweave-test-missing-weaver");
    let error = invoker.invoke(arguments).expect_err("spawn should fail");
    assert!(matches!(error, InvokeError::Spawn { .. }));
}

#[rstest]
#[case("ajc", "ajc", 0)]
#[case("java -cp tools.jar org.aspectj.tools.ajc.Main", "java", 3)]
fn command_lines_split_on_whitespace(
    #[case] line: &str,
    #[case] program: &str,
    #[case] leading: usize,
) {
    let invoker = AjcInvoker::from_command_line(line).expect("command line");
    assert_eq!(invoker.program(), program);
    assert_eq!(invoker.leading_args().len(), leading);
}

#[test]
fn blank_command_line_is_rejected() {
    assert!(AjcInvoker::from_command_line("  ").is_none());
}

#[rstest]
fn mocks_stand_in_for_the_weaver(arguments: WeaveArguments) {
    let mut invoker = MockWeaveInvoker::new();
    invoker
        .expect_invoke()
        .withf(|arguments| arguments.value_of("-d") == Some("out"))
        .times(1)
        .returning(|_| Ok(vec![WeaveMessage::new(WeaveSeverity::Info, "ok")]));
    let messages = invoker.invoke(arguments).expect("invoke");
    assert_eq!(messages.len(), 1);
}
