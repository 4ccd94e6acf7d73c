// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for running teamcity-go-test from integration tests.

pub mod go_test_cli;
