// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `teamcity-go-test` failures.
///
/// Test failures are reported through service messages, not through the exit code: a run where
/// every test failed still exits with [`OK`](Self::OK). The codes here only cover problems with
/// the invocation itself.
///
/// Unknown/unexpected failures will always result in exit code 1. Command-line usage errors
/// detected by the argument parser exit with code 2.
pub enum TeamcityExitCode {}

impl TeamcityExitCode {
    /// No errors occurred and all tests were run.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up the invocation: a missing or nonexistent test
    /// binary, or an invalid parallelism value.
    pub const SETUP_ERROR: i32 = 96;

    /// Reading test names from standard input failed.
    pub const INPUT_READ_ERROR: i32 = 97;

    /// The test runner could not be created.
    pub const TEST_RUNNER_BUILD_FAILED: i32 = 98;

    /// A worker stopped unexpectedly, so some tests may not have been reported.
    pub const INCOMPLETE_RUN: i32 = 106;

    /// Writing service messages to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
