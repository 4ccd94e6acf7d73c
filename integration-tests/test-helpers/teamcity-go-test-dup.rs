// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! This is a duplicate of teamcity-go-test's main.rs, so integration tests don't depend on the
//! binary that may be running them. See tests/integration/main.rs for more.

use color_eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    teamcity_go_test::main_impl()
}
