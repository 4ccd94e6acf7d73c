// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TeamCity service messages.
//!
//! A service message is a single line of the form:
//!
//! ```text
//! ##teamcity[messageName key='value' key2='value2']
//! ```
//!
//! Every finished test is rendered as a block of such lines by [`format_record`]. Values are
//! escaped with TeamCity's rules, where `|` is the escape character.
//!
//! [`ServiceMessage::parse`] reads service messages back. It is not used while running tests, but
//! it is handy for checking the output of this crate.

use crate::{
    errors::ServiceMessageParseError,
    record::{TestRecord, Verdict},
};
use chrono::{DateTime, TimeZone};
use std::fmt;
use swrite::{SWrite, swrite};

/// The prefix of every service message.
pub const SERVICE_MESSAGE_PREFIX: &str = "##teamcity[";

/// The timestamp format expected by TeamCity: `yyyy-MM-dd'T'HH:mm:ss.SSSZ`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Formats a finished test as a block of service messages.
///
/// The block always starts with `testStarted` and ends with `testFinished`, and every line is
/// terminated by a newline. The output is deterministic for a given record: the finish timestamp
/// is computed from the start time and the duration.
pub fn format_record(record: &TestRecord) -> String {
    let name = record.name.as_str();
    let started = format_timestamp(&record.started);
    let finished = format_timestamp(&record.finished());

    let mut out = String::new();
    write_message(
        &mut out,
        "testStarted",
        &[
            ("name", name),
            ("captureStandardOutput", "true"),
            ("timestamp", started.as_str()),
        ],
    );

    if !record.output.is_empty() {
        write_message(
            &mut out,
            "testStdOut",
            &[
                ("name", name),
                ("out", record.output.as_str()),
                ("timestamp", finished.as_str()),
            ],
        );
    }

    let message = record.message.as_deref().unwrap_or_default();
    match record.verdict {
        Verdict::Passed => {}
        Verdict::Failed | Verdict::Errored => {
            write_message(
                &mut out,
                "testFailed",
                &[
                    ("name", name),
                    ("message", message),
                    ("details", record.details.as_str()),
                    ("timestamp", finished.as_str()),
                ],
            );
        }
        Verdict::Skipped => {
            write_message(
                &mut out,
                "testIgnored",
                &[
                    ("name", name),
                    ("message", message),
                    ("timestamp", finished.as_str()),
                ],
            );
        }
    }

    let duration_ms = record.duration.as_millis().to_string();
    write_message(
        &mut out,
        "testFinished",
        &[
            ("name", name),
            ("duration", duration_ms.as_str()),
            ("timestamp", finished.as_str()),
        ],
    );

    out
}

/// Formats a timestamp the way TeamCity expects.
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Escapes a value for use inside a service message attribute.
pub fn escape(value: &str) -> String {
    EscapedValue(value).to_string()
}

fn write_message(out: &mut String, message_type: &str, attributes: &[(&str, &str)]) {
    swrite!(out, "{SERVICE_MESSAGE_PREFIX}{message_type}");
    for (key, value) in attributes {
        swrite!(out, " {key}='{}'", EscapedValue(value));
    }
    out.push_str("]\n");
}

struct EscapedValue<'s>(&'s str);

impl fmt::Display for EscapedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        let mut start = 0;

        for (i, c) in s.char_indices() {
            let escaped = match c {
                '|' => "||",
                '\'' => "|'",
                '\n' => "|n",
                '\r' => "|r",
                '[' => "|[",
                ']' => "|]",
                '\u{0085}' => "|x",
                '\u{2028}' => "|l",
                '\u{2029}' => "|p",
                _ => continue,
            };

            if start < i {
                f.write_str(&s[start..i])?;
            }
            f.write_str(escaped)?;
            start = i + c.len_utf8();
        }

        if start < s.len() {
            f.write_str(&s[start..])?;
        }

        Ok(())
    }
}

/// A parsed service message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceMessage {
    message_type: String,
    attributes: Vec<(String, String)>,
}

impl ServiceMessage {
    /// Parses a single service message line, unescaping attribute values.
    ///
    /// Trailing whitespace (including the line terminator) is ignored.
    pub fn parse(line: &str) -> Result<Self, ServiceMessageParseError> {
        let line = line.trim_end();
        let body = line
            .strip_prefix(SERVICE_MESSAGE_PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| ServiceMessageParseError::NotAServiceMessage {
                line: line.to_owned(),
            })?;

        let type_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let message_type = &body[..type_end];
        if message_type.is_empty() {
            return Err(ServiceMessageParseError::MissingMessageType);
        }

        let mut attributes = Vec::new();
        let mut offset = type_end;
        loop {
            let rest = &body[offset..];
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                break;
            }
            offset += rest.len() - trimmed.len();

            let (key, value_and_rest) = trimmed
                .split_once("='")
                .filter(|(key, _)| {
                    !key.is_empty()
                        && key
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                })
                .ok_or(ServiceMessageParseError::MalformedAttribute { offset })?;

            let (value, consumed) = unescape_value(key, value_and_rest)?;
            attributes.push((key.to_owned(), value));
            offset += key.len() + 2 + consumed;
        }

        Ok(Self {
            message_type: message_type.to_owned(),
            attributes,
        })
    }

    /// Returns the message type, such as `testStarted`.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Returns the unescaped value of the given attribute, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all attributes in the order they appeared.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Unescapes a quoted value, returning the value and the number of bytes consumed including the
/// closing quote.
fn unescape_value(key: &str, input: &str) -> Result<(String, usize), ServiceMessageParseError> {
    let mut value = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => return Ok((value, i + 1)),
            '|' => {
                let Some((_, escape)) = chars.next() else {
                    break;
                };
                let unescaped = match escape {
                    '|' => '|',
                    '\'' => '\'',
                    'n' => '\n',
                    'r' => '\r',
                    '[' => '[',
                    ']' => ']',
                    'x' => '\u{0085}',
                    'l' => '\u{2028}',
                    'p' => '\u{2029}',
                    _ => return Err(ServiceMessageParseError::InvalidEscape { escape }),
                };
                value.push(unescaped);
            }
            c => value.push(c),
        }
    }

    Err(ServiceMessageParseError::UnterminatedValue {
        key: key.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TestName;
    use chrono::{Local, Utc};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use test_strategy::proptest;

    fn record(verdict: Verdict, message: Option<&str>, details: &str, output: &str) -> TestRecord {
        TestRecord {
            name: TestName::new("TestFoo").unwrap(),
            started: DateTime::from_timestamp(1_700_000_000, 0)
                .unwrap()
                .with_timezone(&Local),
            verdict,
            duration: Duration::from_millis(20),
            message: message.map(str::to_owned),
            details: details.to_owned(),
            output: output.to_owned(),
            data_race: false,
        }
    }

    fn parse_block(block: &str) -> Vec<ServiceMessage> {
        block
            .lines()
            .map(|line| ServiceMessage::parse(line).unwrap())
            .collect()
    }

    #[test]
    fn format_passed() {
        let record = record(Verdict::Passed, None, "", "");
        let started = format_timestamp(&record.started);
        let finished = format_timestamp(&record.finished());

        assert_eq!(
            format_record(&record),
            format!(
                "##teamcity[testStarted name='TestFoo' captureStandardOutput='true' timestamp='{started}']\n\
                 ##teamcity[testFinished name='TestFoo' duration='20' timestamp='{finished}']\n"
            )
        );
    }

    #[test]
    fn format_failed_escapes_details() {
        let record = record(
            Verdict::Failed,
            Some("Test failed"),
            "    foo_test.go:12: expected 'a', got [b]\n    | pipe",
            "=== RUN   TestFoo\n",
        );
        let block = format_record(&record);

        assert_eq!(block.lines().count(), 4, "block:\n{block}");
        assert!(
            block.contains(
                "details='    foo_test.go:12: expected |'a|', got |[b|]|n    || pipe'"
            ),
            "details are escaped:\n{block}"
        );

        let messages = parse_block(&block);
        let types: Vec<_> = messages.iter().map(|m| m.message_type()).collect();
        assert_eq!(
            types,
            ["testStarted", "testStdOut", "testFailed", "testFinished"]
        );
        assert_eq!(messages[1].attribute("out"), Some("=== RUN   TestFoo\n"));
        assert_eq!(messages[2].attribute("message"), Some("Test failed"));
        assert_eq!(messages[2].attribute("details"), Some(record.details.as_str()));
    }

    #[test]
    fn format_errored_uses_test_failed() {
        let record = record(
            Verdict::Errored,
            Some("test exited with exit status: 2"),
            "panic: boom",
            "panic: boom",
        );
        let messages = parse_block(&format_record(&record));

        assert_eq!(messages[2].message_type(), "testFailed");
        assert_eq!(
            messages[2].attribute("message"),
            Some("test exited with exit status: 2")
        );
    }

    #[test]
    fn format_skipped_uses_test_ignored() {
        let record = record(Verdict::Skipped, Some("needs a database"), "", "");
        let messages = parse_block(&format_record(&record));

        let types: Vec<_> = messages.iter().map(|m| m.message_type()).collect();
        assert_eq!(types, ["testStarted", "testIgnored", "testFinished"]);
        assert_eq!(messages[1].attribute("message"), Some("needs a database"));
    }

    #[test]
    fn round_trip_recovers_name_and_duration() {
        let record = record(Verdict::Passed, None, "", "ok\n");
        let messages = parse_block(&format_record(&record));

        for message in &messages {
            assert_eq!(message.attribute("name"), Some("TestFoo"));
        }
        let finished = messages.last().unwrap();
        assert_eq!(finished.message_type(), "testFinished");
        assert_eq!(finished.attribute("duration"), Some("20"));
        assert_eq!(
            finished.attribute("timestamp"),
            Some(format_timestamp(&record.finished()).as_str())
        );
    }

    #[test]
    fn timestamp_format() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(
            format_timestamp::<Utc>(&timestamp),
            "2023-11-14T22:13:20.123+0000"
        );
    }

    #[test]
    fn escape_all_special_characters() {
        assert_eq!(
            escape("|'\n\r[]\u{0085}\u{2028}\u{2029}"),
            "|||'|n|r|[|]|x|l|p"
        );
        assert_eq!(escape("plain text"), "plain text");
        assert_eq!(escape("ünïcode|"), "ünïcode||");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            ServiceMessage::parse("PASS"),
            Err(ServiceMessageParseError::NotAServiceMessage {
                line: "PASS".to_owned()
            })
        );
        assert_eq!(
            ServiceMessage::parse("##teamcity[]"),
            Err(ServiceMessageParseError::MissingMessageType)
        );
        assert_eq!(
            ServiceMessage::parse("##teamcity[testStarted name]"),
            Err(ServiceMessageParseError::MalformedAttribute { offset: 12 })
        );
        assert_eq!(
            ServiceMessage::parse("##teamcity[testStarted name='foo]"),
            Err(ServiceMessageParseError::UnterminatedValue {
                key: "name".to_owned()
            })
        );
        assert_eq!(
            ServiceMessage::parse("##teamcity[testStarted name='|q']"),
            Err(ServiceMessageParseError::InvalidEscape { escape: 'q' })
        );
    }

    #[test]
    fn parse_attributes_in_order() {
        let message =
            ServiceMessage::parse("##teamcity[testFinished name='a|'b'  duration='5']\n").unwrap();

        assert_eq!(message.message_type(), "testFinished");
        assert_eq!(
            message.attributes().collect::<Vec<_>>(),
            [("name", "a'b"), ("duration", "5")]
        );
        assert_eq!(message.attribute("missing"), None);
    }

    #[proptest]
    fn escape_round_trips(value: String) {
        let line = format!("##teamcity[message text='{}']", escape(&value));
        let message = ServiceMessage::parse(&line).unwrap();
        assert_eq!(message.attribute("text"), Some(value.as_str()));
    }
}
