// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    ffi::OsString,
    fmt,
    io::Write,
    process::{Command, ExitStatus, Stdio},
};
use teamcity_runner::service_message::ServiceMessage;

/// Environment variables read by teamcity-go-test. They're cleared so that the environment
/// running the tests doesn't leak into them.
const CLEARED_ENV_VARS: &[&str] = &[
    "TEAMCITY_GO_TEST_BINARY",
    "TEAMCITY_GO_TEST_PARALLELISM",
    "TEAMCITY_GO_TEST_TIMEOUT",
    "TEAMCITY_GO_TEST_VERBOSE",
    "TEAMCITY_GO_TEST_COLOR",
    "TEAMCITY_GO_TEST_LOG",
];

#[derive(Clone, Debug)]
pub struct TeamcityGoTestCli {
    bin: Utf8PathBuf,
    args: Vec<String>,
    envs: HashMap<OsString, OsString>,
    stdin: Vec<u8>,
    unchecked: bool,
}

impl TeamcityGoTestCli {
    pub fn new(bin: impl Into<Utf8PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            args: Vec::new(),
            envs: HashMap::new(),
            stdin: Vec::new(),
            unchecked: false,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&mut self, arg: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(arg.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, k: impl Into<OsString>, v: impl Into<OsString>) -> &mut Self {
        self.envs.insert(k.into(), v.into());
        self
    }

    /// Sets the test names written to standard input, one per line.
    pub fn test_names<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.stdin.clear();
        for name in names {
            self.stdin.extend_from_slice(name.as_bytes());
            self.stdin.push(b'\n');
        }
        self
    }

    /// Sets the raw contents of standard input.
    pub fn stdin(&mut self, stdin: impl Into<Vec<u8>>) -> &mut Self {
        self.stdin = stdin.into();
        self
    }

    pub fn unchecked(&mut self, unchecked: bool) -> &mut Self {
        self.unchecked = unchecked;
        self
    }

    pub fn output(&self) -> TeamcityGoTestOutput {
        let mut command = Command::new(&self.bin);
        command.args(&self.args);
        for var in CLEARED_ENV_VARS {
            command.env_remove(var);
        }
        command.env("TEAMCITY_GO_TEST_COLOR", "never");
        command.envs(&self.envs);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().expect("failed to spawn");
        {
            // All of standard input is read before any test starts, so writing it in one go
            // can't deadlock. Setup errors exit before reading it, so a broken pipe is fine.
            let mut stdin = child.stdin.take().expect("stdin is piped");
            let _ = stdin.write_all(&self.stdin);
        }
        let output = child.wait_with_output().expect("failed to execute");

        let ret = TeamcityGoTestOutput {
            command,
            exit_status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !self.unchecked && !output.status.success() {
            panic!("command failed:\n\n{ret}");
        }

        ret
    }
}

pub struct TeamcityGoTestOutput {
    pub command: Command,
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl TeamcityGoTestOutput {
    pub fn stdout_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Parses every line of stdout as a service message, panicking on anything else.
    pub fn service_messages(&self) -> Vec<ServiceMessage> {
        self.stdout_as_str()
            .lines()
            .map(|line| {
                ServiceMessage::parse(line)
                    .unwrap_or_else(|error| panic!("invalid line {line:?}: {error}\n\n{self}"))
            })
            .collect()
    }

    /// Splits stdout into per-test blocks, keyed by test name.
    ///
    /// Panics if blocks are interleaved, or if a test is reported more than once.
    pub fn blocks(&self) -> BTreeMap<String, Vec<ServiceMessage>> {
        let mut blocks = BTreeMap::new();
        let mut current: Option<(String, Vec<ServiceMessage>)> = None;

        for message in self.service_messages() {
            let name = message
                .attribute("name")
                .unwrap_or_else(|| panic!("message without a name: {message:?}"))
                .to_owned();

            match message.message_type() {
                "testStarted" => {
                    assert!(current.is_none(), "block started inside a block:\n{self}");
                    current = Some((name, vec![message]));
                }
                "testFinished" => {
                    let (block_name, mut messages) = current
                        .take()
                        .unwrap_or_else(|| panic!("block finished before start:\n{self}"));
                    assert_eq!(block_name, name, "interleaved blocks:\n{self}");
                    messages.push(message);
                    let prev = blocks.insert(name, messages);
                    assert!(prev.is_none(), "test reported more than once:\n{self}");
                }
                _ => {
                    let (block_name, messages) = current
                        .as_mut()
                        .unwrap_or_else(|| panic!("message outside a block:\n{self}"));
                    assert_eq!(*block_name, name, "interleaved blocks:\n{self}");
                    messages.push(message);
                }
            }
        }

        assert!(current.is_none(), "unterminated block:\n{self}");
        blocks
    }
}

impl fmt::Display for TeamcityGoTestOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command: {:?}\nexit code: {:?}\n\
                   --- stdout ---\n{}\n\n--- stderr ---\n{}\n\n",
            self.command,
            self.exit_status.code(),
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

// Make Debug output the same as Display output, so `.unwrap()` and `.expect()` are nicer.
impl fmt::Debug for TeamcityGoTestOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
