// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and execution.

mod app;
mod go_args;
mod imp;

pub use app::TeamcityGoTestApp;
pub use go_args::normalize_go_style_args;
pub use imp::main_impl;
