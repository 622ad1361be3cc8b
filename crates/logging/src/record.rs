//! Rendering of individual log records.

use std::fmt;

/// One rendered log line: `[timestamp ]LABEL message[ (exit status N)]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogRecord<'a> {
    label: &'a str,
    timestamp: Option<String>,
    exit_status: Option<i32>,
    message: String,
}

impl<'a> LogRecord<'a> {
    /// Creates a record whose message is `parts` joined with spaces.
    pub fn new<S: AsRef<str>>(label: &'a str, parts: &[S]) -> Self {
        let message = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            label,
            timestamp: None,
            exit_status: None,
            message,
        }
    }

    /// Sets the timestamp prefix.
    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the exit status suffix.
    pub fn with_exit_status(mut self, status: Option<i32>) -> Self {
        self.exit_status = status;
        self
    }

    /// Joined message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(timestamp) = &self.timestamp {
            write!(f, "{timestamp} ")?;
        }
        f.write_str(self.label)?;
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        if let Some(status) = self.exit_status {
            write!(f, " (exit status {status})")?;
        }
        Ok(())
    }
}

/// Splits a leading exit status off the arguments of an ERROR, QUIT or FATAL
/// record.
///
/// An empty first argument means status 1. A first argument that is an
/// optionally negative decimal integer is the status. Otherwise the status is
/// 1 and every argument stays part of the message.
///
/// ```
/// use logging::split_exit_status;
///
/// assert_eq!(split_exit_status(&["42", "build failed"]), (42, &["build failed"][..]));
/// assert_eq!(split_exit_status(&["", "boom"]), (1, &["boom"][..]));
/// assert_eq!(split_exit_status(&["boom"]), (1, &["boom"][..]));
/// ```
pub fn split_exit_status<S: AsRef<str>>(args: &[S]) -> (i32, &[S]) {
    let Some((first, rest)) = args.split_first() else {
        return (1, args);
    };
    let first = first.as_ref();
    if first.is_empty() {
        return (1, rest);
    }
    match parse_status(first) {
        Some(status) => (status, rest),
        None => (1, args),
    }
}

fn parse_status(text: &str) -> Option<i32> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
