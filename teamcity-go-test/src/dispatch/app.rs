// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser};
use std::io::BufRead;
use teamcity_metadata::TeamcityExitCode;
use teamcity_runner::{config::RunConfig, input::read_test_names, runner::TestRunnerBuilder};
use tracing::debug;

/// Run each test in a Go test binary in its own process, and report results as TeamCity
/// service messages.
///
/// Test names are read from standard input, one per line. Go-style single-dash flags such as
/// `-test` and `-parallelism` are also accepted.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
    after_help = STDIN_HELP,
)]
pub struct TeamcityGoTestApp {
    /// Path to the compiled Go test binary (built with `go test -c`)
    #[arg(long, value_name = "PATH", env = "TEAMCITY_GO_TEST_BINARY")]
    test: Option<Utf8PathBuf>,

    /// Number of tests to run at the same time
    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        env = "TEAMCITY_GO_TEST_PARALLELISM"
    )]
    parallelism: usize,

    /// Timeout for each test, passed to the binary as `-test.timeout` (for example `30s`)
    #[arg(long, value_name = "DURATION", env = "TEAMCITY_GO_TEST_TIMEOUT")]
    timeout: Option<String>,

    #[command(flatten)]
    output: OutputOpts,
}

const STDIN_HELP: &str = "Test names must be listed one per line on stdin.";

impl TeamcityGoTestApp {
    /// Initializes logging and returns the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, reading test names from `input`.
    ///
    /// Returns the exit code. The exit code doesn't depend on whether tests passed: results are
    /// only reported through service messages.
    pub fn exec(self, input: impl BufRead, output_writer: &mut OutputWriter) -> Result<i32> {
        let Some(test_binary) = self.test else {
            return Err(ExpectedError::MissingTestBinary {
                usage: Self::usage(),
            });
        };

        // Validate the configuration before reading any input.
        let config = RunConfig::new(test_binary, self.parallelism, self.timeout)?;
        let test_binary = config.test_binary().to_owned();
        let parallelism = config.parallelism();
        let test_names = read_test_names(input)?;

        let runner = TestRunnerBuilder::new(config).build(test_names)?;
        debug!(
            "read {} test names, running {test_binary} with parallelism {parallelism}",
            runner.run_count(),
        );
        let run_stats = runner.execute(output_writer.stdout_writer())?;
        debug!(
            success = run_stats.is_success(),
            passed = run_stats.passed,
            failed = run_stats.failed,
            skipped = run_stats.skipped,
            errored = run_stats.errored,
            "finished {} of {} tests",
            run_stats.finished_count,
            run_stats.initial_run_count,
        );

        Ok(TeamcityExitCode::OK)
    }

    fn usage() -> String {
        let usage = Self::command().render_usage();
        format!("{usage}\n\n{STDIN_HELP}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_go_style_args;
    use camino::Utf8Path;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> TeamcityGoTestApp {
        let args = std::iter::once("teamcity-go-test").chain(args.iter().copied());
        TeamcityGoTestApp::try_parse_from(normalize_go_style_args(args)).unwrap()
    }

    fn empty_binary(dir: &Utf8TempDir) -> String {
        let path = dir.path().join("pkg.test");
        std::fs::write(&path, b"").unwrap();
        path.into_string()
    }

    #[test]
    fn verify_app() {
        TeamcityGoTestApp::command().debug_assert();
    }

    #[test]
    fn parse_go_style_args() {
        let app = parse(&["-test", "pkg.test", "-parallelism=4", "-timeout", "1m"]);

        assert_eq!(app.test.as_deref(), Some(Utf8Path::new("pkg.test")));
        assert_eq!(app.parallelism, 4);
        assert_eq!(app.timeout.as_deref(), Some("1m"));
    }

    #[test]
    fn parse_defaults() {
        let app = parse(&["--test", "pkg.test"]);

        assert_eq!(app.parallelism, 1);
        assert_eq!(app.timeout, None);
        assert!(!app.output.verbose);
    }

    #[test]
    fn missing_test_binary() {
        let app = parse(&[]);
        let error = app
            .exec(&b"TestFoo\n"[..], &mut OutputWriter::default())
            .unwrap_err();

        assert_eq!(error.process_exit_code(), TeamcityExitCode::SETUP_ERROR);
        match error {
            ExpectedError::MissingTestBinary { usage } => {
                assert!(usage.starts_with("Usage: teamcity-go-test"), "usage: {usage}");
                assert!(usage.ends_with(STDIN_HELP), "usage: {usage}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nonexistent_test_binary() {
        let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
        let path = dir.path().join("missing.test");
        let app = parse(&["--test", path.as_str()]);
        let error = app
            .exec(&b"TestFoo\n"[..], &mut OutputWriter::default())
            .unwrap_err();

        assert_eq!(error.process_exit_code(), TeamcityExitCode::SETUP_ERROR);
    }

    #[test]
    fn zero_parallelism() {
        let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
        let binary = empty_binary(&dir);
        let app = parse(&["--test", &binary, "--parallelism", "0"]);
        let error = app
            .exec(&b""[..], &mut OutputWriter::default())
            .unwrap_err();

        assert_eq!(error.process_exit_code(), TeamcityExitCode::SETUP_ERROR);
    }

    #[test]
    fn no_test_names() {
        let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
        let binary = empty_binary(&dir);
        let app = parse(&["--test", &binary]);

        let mut output = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(&b"\n  \n"[..], &mut output).unwrap();

        assert_eq!(code, TeamcityExitCode::OK);
        let OutputWriter::Test { stdout } = output else {
            panic!("output is captured");
        };
        assert_eq!(stdout, b"");
    }

    #[test]
    fn unrunnable_binary_reports_every_test() {
        let dir = Utf8TempDir::with_prefix("teamcity-go-test-").unwrap();
        let binary = empty_binary(&dir);
        let app = parse(&["--test", &binary, "--parallelism", "2"]);

        let input = indoc! {"
            TestOne

              TestTwo
            TestThree
        "};
        let mut output = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(input.as_bytes(), &mut output).unwrap();

        // Failing tests don't change the exit code.
        assert_eq!(code, TeamcityExitCode::OK);
        let OutputWriter::Test { stdout } = output else {
            panic!("output is captured");
        };
        let stdout = String::from_utf8(stdout).unwrap();
        for name in ["TestOne", "TestTwo", "TestThree"] {
            assert_eq!(
                stdout
                    .matches(&format!("##teamcity[testFailed name='{name}'"))
                    .count(),
                1,
                "one failure for {name}:\n{stdout}"
            );
        }
        assert_eq!(stdout.lines().count(), 9, "three lines per test:\n{stdout}");
    }
}
