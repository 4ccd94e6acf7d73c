// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! These tests run the `teamcity-go-test-dup` binary, which is exactly the same as
//! teamcity-go-test. Using a duplicate means the binary under test is never the one that's
//! currently running (or being rebuilt), which matters on Windows.
//!
//! Instead of a real Go test binary, tests point `--test` at `fake-go-test`, which prints what
//! `go test -v` would for a handful of canned tests.

use camino_tempfile::Utf8TempDir;
use chrono::DateTime;
use integration_tests::go_test_cli::{TeamcityGoTestCli, TeamcityGoTestOutput};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use teamcity_metadata::TeamcityExitCode;
use teamcity_runner::{
    parse::{DATA_RACE_MESSAGE, FAILED_MESSAGE},
    service_message::{ServiceMessage, TIMESTAMP_FORMAT},
};
use test_case::test_case;

const FAKE_GO_TEST: &str = env!("CARGO_BIN_EXE_fake-go-test");

fn cli() -> TeamcityGoTestCli {
    TeamcityGoTestCli::new(env!("CARGO_BIN_EXE_teamcity-go-test-dup"))
}

fn message_types(block: &[ServiceMessage]) -> Vec<&str> {
    block.iter().map(|message| message.message_type()).collect()
}

fn find<'a>(block: &'a [ServiceMessage], message_type: &str) -> &'a ServiceMessage {
    block
        .iter()
        .find(|message| message.message_type() == message_type)
        .unwrap_or_else(|| panic!("no {message_type} in {block:?}"))
}

fn started_names(output: &TeamcityGoTestOutput) -> Vec<String> {
    output
        .service_messages()
        .iter()
        .filter(|message| message.message_type() == "testStarted")
        .filter_map(|message| message.attribute("name").map(str::to_owned))
        .collect()
}

#[test]
fn test_verdicts() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST, "--parallelism", "3"])
        .test_names([
            "TestPass",
            "TestFail",
            "TestSkip",
            "TestPanic",
            "TestRace",
            "TestMissing",
        ])
        .output();

    let blocks = output.blocks();
    assert_eq!(blocks.len(), 6, "every test is reported:\n{output}");

    let pass = &blocks["TestPass"];
    assert_eq!(
        message_types(pass),
        ["testStarted", "testStdOut", "testFinished"]
    );
    assert_eq!(pass[0].attribute("captureStandardOutput"), Some("true"));
    assert_eq!(find(pass, "testFinished").attribute("duration"), Some("20"));
    let out = find(pass, "testStdOut").attribute("out").unwrap();
    assert!(out.contains("fake_test.go:10: all good"), "out: {out}");

    let fail = &blocks["TestFail"];
    assert_eq!(
        message_types(fail),
        ["testStarted", "testStdOut", "testFailed", "testFinished"]
    );
    let failed = find(fail, "testFailed");
    assert_eq!(failed.attribute("message"), Some(FAILED_MESSAGE));
    assert_eq!(
        failed.attribute("details"),
        Some("    fake_test.go:20: expected 'a', got \"b\" [index 1]"),
    );
    assert_eq!(find(fail, "testFinished").attribute("duration"), Some("10"));

    let skip = &blocks["TestSkip"];
    assert_eq!(
        message_types(skip),
        ["testStarted", "testStdOut", "testIgnored", "testFinished"]
    );
    assert_eq!(
        find(skip, "testIgnored").attribute("message"),
        Some("fake_test.go:30: needs a database"),
    );
    assert_eq!(find(skip, "testFinished").attribute("duration"), Some("0"));

    let panic = &blocks["TestPanic"];
    let failed = find(panic, "testFailed");
    let message = failed.attribute("message").unwrap();
    assert!(message.starts_with("test exited with"), "message: {message}");
    let details = failed.attribute("details").unwrap();
    assert!(
        details.contains("panic: something went wrong"),
        "details: {details}"
    );

    let race = &blocks["TestRace"];
    let failed = find(race, "testFailed");
    assert_eq!(failed.attribute("message"), Some(DATA_RACE_MESSAGE));
    let details = failed.attribute("details").unwrap();
    assert!(details.contains("WARNING: DATA RACE"), "details: {details}");
    assert_eq!(find(race, "testFinished").attribute("duration"), Some("30"));

    let missing = &blocks["TestMissing"];
    assert_eq!(
        find(missing, "testFailed").attribute("message"),
        Some("test produced no result"),
    );
}

#[test]
fn test_timestamps() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST])
        .test_names(["TestPass"])
        .output();

    let blocks = output.blocks();
    let block = &blocks["TestPass"];
    for message in block {
        let timestamp = message.attribute("timestamp").unwrap();
        DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .unwrap_or_else(|error| panic!("invalid timestamp {timestamp:?}: {error}"));
    }

    let timestamp = |message_type: &str| {
        let timestamp = find(block, message_type).attribute("timestamp").unwrap();
        DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).unwrap()
    };
    // The finish timestamp is the start timestamp plus the reported duration.
    let elapsed = timestamp("testFinished") - timestamp("testStarted");
    assert_eq!(elapsed.num_milliseconds(), 20);
}

#[test_case(1 ; "one worker")]
#[test_case(4 ; "one worker per test")]
#[test_case(9 ; "more workers than tests")]
fn test_parallelism(parallelism: usize) {
    let names = ["TestSlowA", "TestPassB", "TestSlowC", "TestFailD"];
    let parallelism_arg = parallelism.to_string();
    let output = cli()
        .args([
            "--test",
            FAKE_GO_TEST,
            "--parallelism",
            parallelism_arg.as_str(),
        ])
        .test_names(names)
        .output();

    let blocks = output.blocks();
    let reported: BTreeSet<_> = blocks.keys().map(String::as_str).collect();
    assert_eq!(reported, names.into_iter().collect::<BTreeSet<_>>());

    if parallelism == 1 {
        assert_eq!(started_names(&output), names, "input order is kept");
    }
}

#[test]
fn test_go_style_flags() {
    let output = cli()
        .args([
            "-test",
            FAKE_GO_TEST,
            "-parallelism=2",
            "-timeout",
            "5s",
        ])
        .test_names(["TestArgs", "TestTimeout"])
        .output();

    let blocks = output.blocks();
    let out = find(&blocks["TestArgs"], "testStdOut")
        .attribute("out")
        .unwrap();
    assert!(
        out.contains("args: -test.v -test.run ^TestArgs$ -test.timeout 5s\n"),
        "out: {out}"
    );

    let failed = find(&blocks["TestTimeout"], "testFailed");
    let details = failed.attribute("details").unwrap();
    assert!(
        details.contains("panic: test timed out after 5s"),
        "details: {details}"
    );
}

#[test]
fn test_no_timeout() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST])
        .test_names(["TestArgs", "TestTimeout"])
        .output();

    let blocks = output.blocks();
    let out = find(&blocks["TestArgs"], "testStdOut")
        .attribute("out")
        .unwrap();
    assert!(
        out.contains("args: -test.v -test.run ^TestArgs$\n"),
        "out: {out}"
    );
    assert_eq!(
        message_types(&blocks["TestTimeout"]),
        ["testStarted", "testStdOut", "testFinished"]
    );
}

#[test]
fn test_env_config() {
    let output = cli()
        .env("TEAMCITY_GO_TEST_BINARY", FAKE_GO_TEST)
        .env("TEAMCITY_GO_TEST_PARALLELISM", "2")
        .env("TEAMCITY_GO_TEST_TIMEOUT", "1m")
        .test_names(["TestArgs", "TestPass"])
        .output();

    let blocks = output.blocks();
    assert_eq!(blocks.len(), 2);
    let out = find(&blocks["TestArgs"], "testStdOut")
        .attribute("out")
        .unwrap();
    assert!(out.contains("-test.timeout 1m\n"), "out: {out}");
}

#[test]
fn test_blank_and_padded_lines() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST])
        .stdin("\n  TestPass  \n\n\tTestSkip\r\n   \n")
        .output();

    let blocks = output.blocks();
    let reported: Vec<_> = blocks.keys().map(String::as_str).collect();
    assert_eq!(reported, ["TestPass", "TestSkip"]);
}

#[test]
fn test_empty_input() {
    let output = cli().args(["--test", FAKE_GO_TEST]).output();

    assert_eq!(output.exit_status.code(), Some(TeamcityExitCode::OK));
    assert_eq!(output.stdout_as_str(), "");
}

#[test]
fn test_duplicate_names() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST, "--parallelism", "2"])
        .test_names(["TestPass", "TestPass"])
        .output();

    assert_eq!(started_names(&output), ["TestPass", "TestPass"]);
}

#[test]
fn test_missing_test_binary() {
    let output = cli().unchecked(true).test_names(["TestPass"]).output();

    assert_eq!(
        output.exit_status.code(),
        Some(TeamcityExitCode::SETUP_ERROR),
        "{output}"
    );
    assert_eq!(output.stdout_as_str(), "");
    let stderr = output.stderr_as_str();
    assert!(stderr.contains("test binary not specified"), "{output}");
    assert!(stderr.contains("Usage: teamcity-go-test"), "{output}");
    assert!(
        stderr.contains("Test names must be listed one per line on stdin."),
        "{output}"
    );
}

#[test]
fn test_nonexistent_test_binary() {
    let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
    let path = dir.path().join("missing.test");
    let output = cli()
        .args(["--test", path.as_str()])
        .unchecked(true)
        .test_names(["TestPass"])
        .output();

    assert_eq!(
        output.exit_status.code(),
        Some(TeamcityExitCode::SETUP_ERROR),
        "{output}"
    );
    assert_eq!(output.stdout_as_str(), "");
    assert!(
        output
            .stderr_as_str()
            .contains(&format!("Cannot find binary: {path}")),
        "{output}"
    );
}

#[test]
fn test_directory_as_test_binary() {
    let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
    let output = cli()
        .args(["--test", dir.path().as_str()])
        .unchecked(true)
        .test_names(["TestPass"])
        .output();

    assert_eq!(
        output.exit_status.code(),
        Some(TeamcityExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(output.stderr_as_str().contains("is a directory"), "{output}");
}

#[test]
fn test_zero_parallelism() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST, "--parallelism", "0"])
        .unchecked(true)
        .test_names(["TestPass"])
        .output();

    assert_eq!(
        output.exit_status.code(),
        Some(TeamcityExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("parallelism must be at least 1"),
        "{output}"
    );
}

#[test]
fn test_unknown_flag() {
    let output = cli()
        .args(["--test", FAKE_GO_TEST, "--no-such-flag"])
        .unchecked(true)
        .output();

    assert_eq!(output.exit_status.code(), Some(2), "{output}");
    assert_eq!(output.stdout_as_str(), "");
}
