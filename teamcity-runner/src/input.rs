// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading test names from an input stream.

use crate::{errors::InputReadError, record::TestName};
use bstr::{ByteSlice, io::BufReadExt};
use std::io::BufRead;

/// Reads test names from `reader`, one per line.
///
/// Lines are trimmed of surrounding whitespace and blank lines are skipped. Input that isn't
/// valid UTF-8 is decoded lossily. The order of the input is preserved, and duplicate names are
/// kept.
pub fn read_test_names(reader: impl BufRead) -> Result<Vec<TestName>, InputReadError> {
    let mut names = Vec::new();
    for line in reader.byte_lines() {
        let line = line.map_err(InputReadError::new)?;
        if let Some(name) = TestName::new(line.to_str_lossy()) {
            names.push(name);
        }
    }
    Ok(names)
}
