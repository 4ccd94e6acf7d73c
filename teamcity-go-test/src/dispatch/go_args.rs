// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ffi::OsString;

/// Long flags that are also accepted with a single dash, the way Go's `flag` package spells them.
const GO_STYLE_FLAGS: &[&str] = &["test", "parallelism", "timeout"];

/// Rewrites Go-style single-dash long flags into their double-dash forms.
///
/// Existing CI scripts invoke the tool as `teamcity-go-test -test ./pkg.test -parallelism 4`.
/// Left alone, the argument parser would read `-test` as a cluster of short flags. Both
/// `-flag value` and `-flag=value` are rewritten. The first argument (the program name) and
/// arguments that aren't valid UTF-8 are passed through unchanged.
pub fn normalize_go_style_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();

    for arg in args {
        let rewritten = arg.to_str().and_then(|arg| {
            let flag = arg.strip_prefix('-').filter(|rest| !rest.starts_with('-'))?;
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            GO_STYLE_FLAGS.contains(&name).then(|| format!("-{arg}"))
        });
        normalized.push(rewritten.map_or(arg, OsString::from));
    }

    normalized
}
