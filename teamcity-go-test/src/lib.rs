// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run the tests in a compiled Go test binary one process at a time, and report the results as
//! TeamCity service messages.
//!
//! Test names are read from standard input, one per line:
//!
//! ```text
//! go test -c -o pkg.test ./pkg
//! ./pkg.test -test.list '.*' | teamcity-go-test --test ./pkg.test --parallelism 4
//! ```
//!
//! Service messages are written to standard output. Logs and errors go to standard error.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
