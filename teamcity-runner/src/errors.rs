// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by teamcity-runner.

use camino::Utf8PathBuf;
use std::{error::Error, fmt, io, sync::Arc};
use thiserror::Error;
use tokio::task::JoinError;

/// An error that occurred while validating a [`RunConfig`](crate::config::RunConfig).
///
/// These errors are detected before any test is started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The test binary could not be found.
    #[error("cannot find binary: {path}")]
    BinaryNotFound {
        /// The path that was provided.
        path: Utf8PathBuf,

        /// The error returned while looking up the path.
        #[source]
        error: io::Error,
    },

    /// The test binary path exists but is a directory.
    #[error("test binary `{path}` is a directory")]
    BinaryIsDirectory {
        /// The path that was provided.
        path: Utf8PathBuf,
    },

    /// The parallelism was zero.
    #[error("parallelism must be at least 1")]
    InvalidParallelism,
}

/// An error that occurred while reading test names from the input stream.
#[derive(Debug, Error)]
#[error("error reading test names from input")]
pub struct InputReadError {
    #[source]
    error: io::Error,
}

impl InputReadError {
    pub(crate) fn new(error: io::Error) -> Self {
        Self { error }
    }
}

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}

/// An error that occurred while writing service messages to the output sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An I/O error occurred while writing or flushing output.
    #[error("error writing service messages to output")]
    Io(#[source] io::Error),
}

/// Errors that occurred while a [`TestRunner`](crate::runner::TestRunner) was executing tests.
///
/// Every test that was queued was still waited on before this error is returned.
#[derive(Debug)]
pub struct TestRunnerExecuteErrors {
    /// The first error returned while writing to the output sink, if any.
    pub write_error: Option<WriteEventError>,

    /// Worker tasks that panicked.
    pub join_errors: Vec<JoinError>,
}

impl fmt::Display for TestRunnerExecuteErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(write_error) = &self.write_error {
            write!(f, "{}", DisplayErrorChain::new(write_error))?;
            if !self.join_errors.is_empty() {
                write!(f, "; ")?;
            }
        }

        if !self.join_errors.is_empty() {
            write!(f, "{} worker tasks panicked: ", self.join_errors.len())?;
            for (index, join_error) in self.join_errors.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{join_error}")?;
            }
        }

        Ok(())
    }
}

impl Error for TestRunnerExecuteErrors {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.write_error {
            Some(error) => Some(error),
            None => self.join_errors.first().map(|error| error as &dyn Error),
        }
    }
}

/// An error that occurred while starting or waiting on a test process.
///
/// These errors are not fatal to the run: the test is reported as errored instead.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ChildStartError {
    /// The test process could not be spawned.
    #[error("error spawning test process")]
    Spawn(#[source] Arc<io::Error>),

    /// Waiting for the test process to exit failed.
    #[error("error waiting for test process to exit")]
    Wait(#[source] Arc<io::Error>),
}

/// An error that occurred while parsing a service message line.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ServiceMessageParseError {
    /// The line did not start with `##teamcity[` or end with `]`.
    #[error("line is not a service message: {line:?}")]
    NotAServiceMessage {
        /// The line that was parsed.
        line: String,
    },

    /// The message type was missing.
    #[error("service message has no message type")]
    MissingMessageType,

    /// An attribute did not have the form `key='value'`.
    #[error("malformed attribute at byte offset {offset}")]
    MalformedAttribute {
        /// The offset of the attribute within the message body.
        offset: usize,
    },

    /// An attribute value was not terminated by a closing quote.
    #[error("value for attribute `{key}` is not terminated")]
    UnterminatedValue {
        /// The attribute key.
        key: String,
    },

    /// An unknown escape sequence was found.
    #[error("unknown escape sequence `|{escape}`")]
    InvalidEscape {
        /// The character following the `|`.
        escape: char,
    },
}

/// Displays an error along with the chain of errors that caused it.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(error) = source {
            write!(f, "\n  caused by: {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
