// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{TeamcityGoTestApp, normalize_go_style_args};
use clap::Parser;

/// Main entry point for the `teamcity-go-test` executable.
pub fn main_impl() -> ! {
    let args = normalize_go_style_args(std::env::args_os());

    let opts = match TeamcityGoTestApp::try_parse_from(args) {
        Ok(opts) => opts,
        // This prints help and version output too, with the matching exit code.
        Err(err) => err.exit(),
    };

    let output = opts.init_output();
    match opts.exec(std::io::stdin().lock(), &mut crate::OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
