// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `teamcity-go-test`.
//!
//! The basic flow of a run is:
//!
//! 1. Test names are read from an input stream with [`input::read_test_names`].
//! 2. A [`config::RunConfig`] describing the Go test binary is validated.
//! 3. A [`runner::TestRunner`] executes every test in its own process across a fixed-size pool of
//!    workers. Each worker parses the output of its process into a [`record::TestRecord`] and
//!    formats it as a block of TeamCity [service messages](service_message).
//! 4. The runner writes each block to a single output sink as it arrives.

pub mod config;
pub mod errors;
pub mod input;
pub mod parse;
pub mod record;
pub mod runner;
pub mod service_message;
pub mod test_output;
mod time;
pub mod write_str;
