// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable metadata for `teamcity-go-test`.
//!
//! Currently this is the set of documented process exit codes, so that CI scripts wrapping
//! `teamcity-go-test` can tell setup problems apart from test failures.

mod exit_codes;

pub use exit_codes::*;
