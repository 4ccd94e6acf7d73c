// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use std::error::Error;
use teamcity_metadata::TeamcityExitCode;
use teamcity_runner::errors::*;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders. Errors are meant to be printed with
// display_to_stderr, which also prints their causes.

/// An error that is expected to happen in normal use, such as a bad invocation.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("test binary not specified")]
    MissingTestBinary { usage: String },
    #[error("configuration error")]
    ConfigError {
        #[from]
        err: ConfigError,
    },
    #[error("input read error")]
    InputReadError {
        #[from]
        err: InputReadError,
    },
    #[error("test runner build error")]
    TestRunnerBuildError {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("test runner execute errors")]
    TestRunnerExecuteErrors {
        #[from]
        err: TestRunnerExecuteErrors,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::MissingTestBinary { .. } | Self::ConfigError { .. } => {
                TeamcityExitCode::SETUP_ERROR
            }
            Self::InputReadError { .. } => TeamcityExitCode::INPUT_READ_ERROR,
            Self::TestRunnerBuildError { .. } => TeamcityExitCode::TEST_RUNNER_BUILD_FAILED,
            Self::TestRunnerExecuteErrors { err } => {
                if err.join_errors.is_empty() {
                    TeamcityExitCode::WRITE_OUTPUT_ERROR
                } else {
                    TeamcityExitCode::INCOMPLETE_RUN
                }
            }
        }
    }

    /// Displays this error to stderr, along with the errors that caused it.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::MissingTestBinary { usage } => {
                error!(
                    "test binary not specified: pass it with {}\n\n{usage}",
                    "--test <PATH>".style(styles.bold)
                );
                None
            }
            Self::ConfigError { err } => match err {
                ConfigError::BinaryNotFound { path, error } => {
                    error!("Cannot find binary: {}", path.style(styles.bold));
                    Some(error as &dyn Error)
                }
                ConfigError::BinaryIsDirectory { path } => {
                    error!("test binary {} is a directory", path.style(styles.bold));
                    None
                }
                other => {
                    error!("{other}");
                    other.source()
                }
            },
            Self::InputReadError { err } => {
                error!("failed to read test names from standard input");
                err.source()
            }
            Self::TestRunnerBuildError { err } => {
                error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::TestRunnerExecuteErrors { err } => {
                if let Some(write_error) = &err.write_error {
                    error!("failed to write service messages to standard output");
                    if let Some(source) = write_error.source() {
                        error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {source}");
                    }
                }
                if !err.join_errors.is_empty() {
                    error!(
                        "{} worker {} panicked, so some tests may not have been reported",
                        err.join_errors.len(),
                        if err.join_errors.len() == 1 { "task" } else { "tasks" },
                    );
                    for join_error in &err.join_errors {
                        error!(target: NO_HEADING_TARGET, "  - {join_error}");
                    }
                }
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {err}");
            next_error = err.source();
        }
    }
}
