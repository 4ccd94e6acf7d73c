// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A stand-in for a compiled Go test binary (`go test -c`).
//!
//! It accepts the flags teamcity-go-test passes (`-test.v`, `-test.run ^Name$` and
//! `-test.timeout`) and prints what `go test -v` would print for the selected test. The behavior
//! is picked by the prefix of the test name:
//!
//! - `TestPass`: passes after logging a line.
//! - `TestFail`: fails with a message containing quotes.
//! - `TestSkip`: is skipped with a reason.
//! - `TestPanic`: panics, so no result marker is printed.
//! - `TestRace`: passes, but the race detector reports a data race.
//! - `TestTimeout`: times out if `-test.timeout` was passed, otherwise passes.
//! - `TestSlow`: passes after sleeping for a while.
//! - `TestArgs`: passes after logging the arguments it was called with.
//!
//! Any other name matches no tests, like a Go binary given an unknown pattern.

use std::{env, process::exit, thread, time::Duration};

const SLOW_TEST_SLEEP: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct GoTestArgs {
    verbose: bool,
    run: Option<String>,
    timeout: Option<String>,
}

impl GoTestArgs {
    fn parse(args: &[String]) -> Self {
        let mut parsed = Self {
            verbose: false,
            run: None,
            timeout: None,
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-test.v" => parsed.verbose = true,
                "-test.run" => parsed.run = Some(expect_value(arg, iter.next())),
                "-test.timeout" => parsed.timeout = Some(expect_value(arg, iter.next())),
                other => {
                    eprintln!("flag provided but not defined: {other}");
                    exit(2);
                }
            }
        }

        parsed
    }
}

fn expect_value(flag: &str, value: Option<&String>) -> String {
    match value {
        Some(value) => value.clone(),
        None => {
            eprintln!("flag needs an argument: {flag}");
            exit(2);
        }
    }
}

fn main() {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    let args = GoTestArgs::parse(&raw_args);

    if !args.verbose {
        eprintln!("fake-go-test: -test.v is required");
        exit(2);
    }

    // Only exact-match patterns are supported.
    let Some(name) = args
        .run
        .as_deref()
        .and_then(|pattern| pattern.strip_prefix('^'))
        .and_then(|pattern| pattern.strip_suffix('$'))
    else {
        eprintln!("fake-go-test: expected -test.run ^Name$, got {:?}", args.run);
        exit(2);
    };

    if name.starts_with("TestPass") {
        println!("=== RUN   {name}");
        println!("    fake_test.go:10: all good");
        println!("--- PASS: {name} (0.02s)");
        println!("PASS");
    } else if name.starts_with("TestFail") {
        println!("=== RUN   {name}");
        println!("    fake_test.go:20: expected 'a', got \"b\" [index 1]");
        println!("--- FAIL: {name} (0.01s)");
        println!("FAIL");
        exit(1);
    } else if name.starts_with("TestSkip") {
        println!("=== RUN   {name}");
        println!("    fake_test.go:30: needs a database");
        println!("--- SKIP: {name} (0.00s)");
        println!("PASS");
    } else if name.starts_with("TestPanic") {
        println!("=== RUN   {name}");
        eprintln!("panic: something went wrong");
        eprintln!();
        eprintln!("goroutine 7 [running]:");
        exit(2);
    } else if name.starts_with("TestRace") {
        println!("=== RUN   {name}");
        eprintln!("==================");
        eprintln!("WARNING: DATA RACE");
        eprintln!("Write at 0x00c000122018 by goroutine 8:");
        eprintln!("==================");
        println!("--- PASS: {name} (0.03s)");
        println!("PASS");
        eprintln!("Found 1 data race(s)");
        exit(66);
    } else if name.starts_with("TestTimeout") {
        println!("=== RUN   {name}");
        if let Some(timeout) = &args.timeout {
            eprintln!("panic: test timed out after {timeout}");
            eprintln!("running tests:");
            eprintln!("\t{name} ({timeout})");
            exit(2);
        }
        println!("--- PASS: {name} (0.00s)");
        println!("PASS");
    } else if name.starts_with("TestSlow") {
        println!("=== RUN   {name}");
        thread::sleep(SLOW_TEST_SLEEP);
        println!("--- PASS: {name} (0.10s)");
        println!("PASS");
    } else if name.starts_with("TestArgs") {
        println!("=== RUN   {name}");
        println!("    fake_test.go:40: args: {}", raw_args.join(" "));
        println!("--- PASS: {name} (0.00s)");
        println!("PASS");
    } else {
        println!("testing: warning: no tests to run");
        println!("PASS");
    }
}
