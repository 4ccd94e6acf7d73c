// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Captured output of a test process.

use crate::errors::ChildStartError;
use bstr::ByteSlice;
use bytes::Bytes;
use std::process::ExitStatus;

/// The result of running a single test process.
#[derive(Clone, Debug)]
pub enum ChildExecutionOutput {
    /// The process was started and ran to completion.
    Output {
        /// Everything the process wrote to standard output.
        stdout: Bytes,
        /// Everything the process wrote to standard error.
        stderr: Bytes,
        /// How the process exited.
        exit_status: ExitStatus,
    },

    /// The process could not be started, or waiting for it failed.
    StartError(ChildStartError),
}

impl ChildExecutionOutput {
    /// Returns the captured standard output, or an empty slice if the process didn't start.
    pub fn stdout(&self) -> &[u8] {
        match self {
            ChildExecutionOutput::Output { stdout, .. } => &stdout[..],
            ChildExecutionOutput::StartError(_) => &[],
        }
    }

    /// Returns the captured standard error, or an empty slice if the process didn't start.
    pub fn stderr(&self) -> &[u8] {
        match self {
            ChildExecutionOutput::Output { stderr, .. } => &stderr[..],
            ChildExecutionOutput::StartError(_) => &[],
        }
    }

    /// Returns stdout followed by stderr as a lossy UTF-8 string.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD. A newline is inserted between the two
    /// streams if stdout doesn't already end with one.
    pub fn combined_lossy(&self) -> String {
        let stdout = self.stdout();
        let stderr = self.stderr();

        let mut combined = String::with_capacity(stdout.len() + stderr.len() + 1);
        combined.push_str(&stdout.to_str_lossy());
        if !stdout.is_empty() && !stderr.is_empty() && !stdout.ends_with(b"\n") {
            combined.push('\n');
        }
        combined.push_str(&stderr.to_str_lossy());
        combined
    }
}

/// Builds an exit status for the given exit code.
#[cfg(all(test, unix))]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

/// Builds an exit status for the given exit code.
#[cfg(all(test, windows))]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}
