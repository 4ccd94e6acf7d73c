// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run configuration.

use crate::errors::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use std::num::NonZeroUsize;

/// A validated configuration for a test run.
///
/// Everything in a `RunConfig` is checked before any test is started, so that configuration
/// problems are reported once instead of once per test.
#[derive(Clone, Debug)]
pub struct RunConfig {
    test_binary: Utf8PathBuf,
    parallelism: NonZeroUsize,
    timeout: Option<String>,
}

impl RunConfig {
    /// Creates and validates a new run configuration.
    ///
    /// * `test_binary` must point to an existing file.
    /// * `parallelism` is the number of tests run at the same time, and must be at least 1.
    /// * `timeout` is passed through to the test binary's `-test.timeout` flag. An empty timeout
    ///   is the same as no timeout.
    pub fn new(
        test_binary: impl Into<Utf8PathBuf>,
        parallelism: usize,
        timeout: Option<String>,
    ) -> Result<Self, ConfigError> {
        let test_binary = test_binary.into();
        let metadata =
            test_binary
                .metadata()
                .map_err(|error| ConfigError::BinaryNotFound {
                    path: test_binary.clone(),
                    error,
                })?;
        if metadata.is_dir() {
            return Err(ConfigError::BinaryIsDirectory { path: test_binary });
        }

        let parallelism = NonZeroUsize::new(parallelism).ok_or(ConfigError::InvalidParallelism)?;
        let timeout = timeout.filter(|timeout| !timeout.is_empty());

        Ok(Self {
            test_binary,
            parallelism,
            timeout,
        })
    }

    /// Returns the path to the Go test binary.
    pub fn test_binary(&self) -> &Utf8Path {
        &self.test_binary
    }

    /// Returns the number of tests to run at the same time.
    pub fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    /// Returns the timeout passed to the test binary, if any.
    pub fn timeout(&self) -> Option<&str> {
        self.timeout.as_deref()
    }
}
