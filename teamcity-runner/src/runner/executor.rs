// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The executor for tests.
//!
//! The executor runs a single test in its own process and captures its output. It never fails:
//! errors starting the process are returned as part of the output, so that they are reported
//! for the test instead of ending the run.

use crate::{
    config::RunConfig, errors::ChildStartError, record::TestName,
    test_output::ChildExecutionOutput,
};
use camino::Utf8PathBuf;
use std::{process::Stdio, sync::Arc};
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug)]
pub(super) struct ExecutorContext {
    test_binary: Utf8PathBuf,
    timeout: Option<String>,
}

impl ExecutorContext {
    pub(super) fn new(config: &RunConfig) -> Self {
        Self {
            test_binary: config.test_binary().to_owned(),
            timeout: config.timeout().map(str::to_owned),
        }
    }

    /// Returns the arguments that select exactly one test in a Go test binary.
    fn args(&self, name: &TestName) -> Vec<String> {
        let mut args = vec![
            "-test.v".to_owned(),
            "-test.run".to_owned(),
            name.run_pattern(),
        ];
        if let Some(timeout) = &self.timeout {
            args.push("-test.timeout".to_owned());
            args.push(timeout.clone());
        }
        args
    }

    /// Runs a single test to completion.
    #[instrument(level = "debug", skip_all, fields(test = %name))]
    pub(super) async fn run_test(&self, name: &TestName) -> ChildExecutionOutput {
        let args = self.args(name);
        let command_line = shell_words::join(
            std::iter::once(self.test_binary.as_str()).chain(args.iter().map(String::as_str)),
        );
        debug!("running: {command_line}");

        let mut cmd = Command::new(self.test_binary.as_std_path());
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(error) => {
                return ChildExecutionOutput::StartError(ChildStartError::Spawn(Arc::new(error)));
            }
        };

        match child.wait_with_output().await {
            Ok(output) => {
                debug!(status = %output.status, "test process exited");
                ChildExecutionOutput::Output {
                    stdout: output.stdout.into(),
                    stderr: output.stderr.into(),
                    exit_status: output.status,
                }
            }
            Err(error) => ChildExecutionOutput::StartError(ChildStartError::Wait(Arc::new(error))),
        }
    }
}
