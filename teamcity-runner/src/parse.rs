// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of Go's verbose test output.
//!
//! A Go test binary run with `-test.v` prints markers around each test:
//!
//! ```text
//! === RUN   TestParseConfig
//!     config_test.go:42: expected "a", got "b"
//! --- FAIL: TestParseConfig (0.02s)
//! FAIL
//! ```
//!
//! The parser looks for the `=== RUN` marker and the terminal `--- PASS`, `--- FAIL` or
//! `--- SKIP` marker for one exact test name, and ignores everything else. Subtest markers such
//! as `--- PASS: TestParseConfig/empty` never match.

use crate::{
    errors::DisplayErrorChain,
    record::{TestName, Verdict},
    test_output::ChildExecutionOutput,
};
use bstr::ByteSlice;
use std::time::Duration;

/// Printed by the Go race detector for every race it finds.
const DATA_RACE_MARKER: &str = "WARNING: DATA RACE";

/// The message used for tests that failed because of a data race.
pub const DATA_RACE_MESSAGE: &str = "Race detected!";

/// The message used for tests that reported `--- FAIL`.
pub const FAILED_MESSAGE: &str = "Test failed";

/// The verdict and diagnostics parsed from a single test process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedOutcome {
    /// The verdict for the test.
    pub verdict: Verdict,

    /// The duration reported by the test binary, if any.
    pub duration: Option<Duration>,

    /// A short description of the failure or skip reason.
    pub message: Option<String>,

    /// Diagnostic detail for failed and errored tests.
    pub details: String,

    /// The combined stdout and stderr of the process.
    pub output: String,

    /// Whether the Go race detector reported a data race.
    pub data_race: bool,
}

/// Parses the output of a test process run for `name`.
pub fn parse_output(name: &TestName, output: &ChildExecutionOutput) -> ParsedOutcome {
    let (stdout, stderr, exit_status) = match output {
        ChildExecutionOutput::Output {
            stdout,
            stderr,
            exit_status,
        } => (stdout, stderr, *exit_status),
        ChildExecutionOutput::StartError(error) => {
            return ParsedOutcome {
                verdict: Verdict::Errored,
                duration: None,
                message: Some(error.to_string()),
                details: DisplayErrorChain::new(error).to_string(),
                output: String::new(),
                data_race: false,
            };
        }
    };

    let mut parser = MarkerParser::new(name.as_str());
    for line in stdout.lines().chain(stderr.lines()) {
        if parser.is_done() {
            break;
        }
        parser.feed(&line.to_str_lossy());
    }

    let combined = output.combined_lossy();
    // The race detector writes its reports to stderr, but test logs may echo them to stdout.
    let data_race =
        stdout.contains_str(DATA_RACE_MARKER) || stderr.contains_str(DATA_RACE_MARKER);

    let Some(result) = parser.finish() else {
        let message = if exit_status.success() {
            "test produced no result".to_owned()
        } else {
            format!("test exited with {exit_status}")
        };
        return ParsedOutcome {
            verdict: Verdict::Errored,
            duration: None,
            message: Some(message),
            details: combined.clone(),
            output: combined,
            data_race,
        };
    };

    let mut outcome = match result.status {
        MarkerStatus::Pass => ParsedOutcome {
            verdict: Verdict::Passed,
            duration: result.duration,
            message: None,
            details: String::new(),
            output: combined,
            data_race,
        },
        MarkerStatus::Fail => ParsedOutcome {
            verdict: Verdict::Failed,
            duration: result.duration,
            message: Some(FAILED_MESSAGE.to_owned()),
            details: result.detail.join("\n"),
            output: combined,
            data_race,
        },
        MarkerStatus::Skip => {
            let reason: Vec<_> = result
                .detail
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .collect();
            ParsedOutcome {
                verdict: Verdict::Skipped,
                duration: result.duration,
                message: (!reason.is_empty()).then(|| reason.join("\n")),
                details: String::new(),
                output: combined,
                data_race,
            }
        }
    };

    if data_race {
        match outcome.verdict {
            Verdict::Passed => {
                outcome.verdict = Verdict::Failed;
                outcome.message = Some(DATA_RACE_MESSAGE.to_owned());
                outcome.details = outcome.output.clone();
            }
            Verdict::Failed => {
                outcome.message = Some(DATA_RACE_MESSAGE.to_owned());
            }
            Verdict::Skipped | Verdict::Errored => {}
        }
    }

    outcome
}

#[derive(Debug)]
enum ParseState {
    AwaitingRun,
    InTest { detail: Vec<String> },
    Done(MarkerResult),
}

#[derive(Debug)]
struct MarkerResult {
    status: MarkerStatus,
    duration: Option<Duration>,
    detail: Vec<String>,
}

/// A line-oriented state machine tracking the markers for one test.
#[derive(Debug)]
struct MarkerParser<'a> {
    name: &'a str,
    state: ParseState,
}

impl<'a> MarkerParser<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            state: ParseState::AwaitingRun,
        }
    }

    fn is_done(&self) -> bool {
        matches!(self.state, ParseState::Done(_))
    }

    fn feed(&mut self, line: &str) {
        let marker = Marker::parse(line, self.name);
        self.state = match (std::mem::replace(&mut self.state, ParseState::AwaitingRun), marker) {
            (ParseState::AwaitingRun, Some(Marker::Run)) => {
                ParseState::InTest { detail: Vec::new() }
            }
            (ParseState::AwaitingRun, Some(Marker::Finished { status, duration })) => {
                ParseState::Done(MarkerResult {
                    status,
                    duration,
                    detail: Vec::new(),
                })
            }
            (ParseState::AwaitingRun, None) => ParseState::AwaitingRun,
            (ParseState::InTest { detail }, Some(Marker::Finished { status, duration })) => {
                ParseState::Done(MarkerResult {
                    status,
                    duration,
                    detail,
                })
            }
            // A repeated RUN marker for the same test is kept as detail.
            (ParseState::InTest { mut detail }, Some(Marker::Run) | None) => {
                detail.push(line.to_owned());
                ParseState::InTest { detail }
            }
            (ParseState::Done(result), _) => ParseState::Done(result),
        };
    }

    fn finish(self) -> Option<MarkerResult> {
        match self.state {
            ParseState::Done(result) => Some(result),
            ParseState::AwaitingRun | ParseState::InTest { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum MarkerStatus {
    Pass,
    Fail,
    Skip,
}

#[derive(Debug, Eq, PartialEq)]
enum Marker {
    Run,
    Finished {
        status: MarkerStatus,
        duration: Option<Duration>,
    },
}

impl Marker {
    /// Parses a marker line for the test `name`, returning `None` for any other line.
    fn parse(line: &str, name: &str) -> Option<Self> {
        let line = line.trim_start();

        if let Some(rest) = line.strip_prefix("=== RUN ") {
            return (rest.trim() == name).then_some(Marker::Run);
        }

        let rest = line.strip_prefix("--- ")?;
        let (status, rest) = if let Some(rest) = rest.strip_prefix("PASS: ") {
            (MarkerStatus::Pass, rest)
        } else if let Some(rest) = rest.strip_prefix("FAIL: ") {
            (MarkerStatus::Fail, rest)
        } else if let Some(rest) = rest.strip_prefix("SKIP: ") {
            (MarkerStatus::Skip, rest)
        } else {
            return None;
        };

        let rest = rest.strip_prefix(name)?;
        if rest.is_empty() {
            return Some(Marker::Finished {
                status,
                duration: None,
            });
        }
        if !rest.starts_with(char::is_whitespace) {
            // A longer test name or a subtest.
            return None;
        }

        let rest = rest.trim();
        let duration = rest
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(parse_go_duration);
        Some(Marker::Finished { status, duration })
    }
}

/// Parses a duration printed by Go's testing package, such as `0.02s`.
fn parse_go_duration(input: &str) -> Option<Duration> {
    let secs = input.strip_suffix('s')?;
    let (whole, frac) = secs.split_once('.').unwrap_or((secs, ""));
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole: u64 = whole.parse().ok()?;
    // Nanosecond precision is plenty; extra digits are dropped.
    let mut nanos = 0u32;
    for (index, digit) in frac.bytes().take(9).enumerate() {
        nanos += u32::from(digit - b'0') * 10u32.pow(8 - index as u32);
    }

    Some(Duration::new(whole, nanos))
}
