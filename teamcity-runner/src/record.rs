// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test state: names, verdicts and finished records.
//!
//! A test goes through two stages. A [`PendingTest`] is created by a worker right before the
//! test process is spawned, and is owned by that worker. Once the process exits, the pending
//! test is consumed together with the parsed outcome to produce an immutable [`TestRecord`],
//! which is what gets formatted into service messages.

use crate::{parse::ParsedOutcome, time::StopwatchStart};
use chrono::{DateTime, Local};
use std::{fmt, time::Duration};

/// The name of a single Go test, such as `TestParseConfig`.
///
/// A `TestName` is never empty and never has leading or trailing whitespace.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestName(String);

impl TestName {
    /// Creates a new test name, trimming surrounding whitespace.
    ///
    /// Returns `None` if the name is empty after trimming.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        (!name.is_empty()).then(|| Self(name.to_owned()))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the pattern passed to `-test.run` to select exactly this test.
    ///
    /// The name is used verbatim, anchored at both ends so that tests whose names merely contain
    /// this one are not run.
    pub fn run_pattern(&self) -> String {
        format!("^{}$", self.0)
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The classified outcome of a single test.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Verdict {
    /// The test ran and passed.
    Passed,

    /// The test ran and failed.
    Failed,

    /// The test was skipped with `t.Skip`.
    Skipped,

    /// The test process did not produce a recognizable result: it crashed, timed out, could not
    /// be spawned, or the name filter matched no test.
    Errored,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => f.pad("PASS"),
            Verdict::Failed => f.pad("FAIL"),
            Verdict::Skipped => f.pad("SKIP"),
            Verdict::Errored => f.pad("ERROR"),
        }
    }
}

/// A test that has been dequeued by a worker and is about to run.
#[derive(Debug)]
pub struct PendingTest {
    name: TestName,
    stopwatch: StopwatchStart,
}

impl PendingTest {
    /// Starts the clock for a test.
    pub(crate) fn start(name: TestName) -> Self {
        Self {
            name,
            stopwatch: crate::time::stopwatch(),
        }
    }

    /// Returns the name of this test.
    pub fn name(&self) -> &TestName {
        &self.name
    }

    /// Returns the time at which this test was started.
    pub fn started(&self) -> DateTime<Local> {
        self.stopwatch.start_time()
    }

    /// Finishes this test with the outcome parsed from its output.
    ///
    /// If the outcome doesn't carry a duration reported by the test binary, the elapsed time
    /// measured by the stopwatch is used instead.
    pub(crate) fn finish(self, outcome: ParsedOutcome) -> TestRecord {
        let snapshot = self.stopwatch.snapshot();
        TestRecord {
            name: self.name,
            started: snapshot.start_time,
            verdict: outcome.verdict,
            duration: outcome.duration.unwrap_or(snapshot.duration),
            message: outcome.message,
            details: outcome.details,
            output: outcome.output,
            data_race: outcome.data_race,
        }
    }
}

/// A finished test, ready to be formatted as service messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestRecord {
    /// The name of the test.
    pub name: TestName,

    /// The time at which the test process was started.
    pub started: DateTime<Local>,

    /// The verdict for this test.
    pub verdict: Verdict,

    /// How long the test took to run.
    pub duration: Duration,

    /// A short, single-line description of the failure or skip reason, if any.
    pub message: Option<String>,

    /// Diagnostic detail for failed and errored tests.
    pub details: String,

    /// The combined stdout and stderr of the test process.
    pub output: String,

    /// Whether the Go race detector reported a data race.
    pub data_race: bool,
}

impl TestRecord {
    /// Returns the time at which the test finished, computed from the start time and duration.
    pub fn finished(&self) -> DateTime<Local> {
        self.started + self.duration
    }
}
