//! Stack traces written after FATAL records.

use std::backtrace::{Backtrace, BacktraceStatus};

/// Produces the stack trace lines written after a FATAL record.
pub trait TraceProducer {
    /// Returns formatted frame lines, innermost first, omitting the first
    /// `skip` frames.
    fn produce_trace(&self, skip: usize) -> Vec<String>;
}

impl<F> TraceProducer for F
where
    F: Fn(usize) -> Vec<String>,
{
    fn produce_trace(&self, skip: usize) -> Vec<String> {
        self(skip)
    }
}

/// Trace producer walking the native call stack with [`std::backtrace`].
///
/// Frames belonging to the backtrace machinery and to this crate are omitted
/// so the trace starts at the code that requested the FATAL record.
#[derive(Clone, Copy, Debug, Default)]
pub struct BacktraceProducer;

const UNAVAILABLE: &str = "  (stack trace unavailable)";

impl TraceProducer for BacktraceProducer {
    fn produce_trace(&self, skip: usize) -> Vec<String> {
        let backtrace = Backtrace::force_capture();
        if backtrace.status() != BacktraceStatus::Captured {
            return vec![UNAVAILABLE.to_owned()];
        }

        let frames: Vec<String> = parse_frames(&backtrace.to_string())
            .into_iter()
            .filter(|frame| !is_internal(&frame.symbol))
            .skip(skip)
            .map(|frame| frame.render())
            .collect();
        if frames.is_empty() {
            vec![UNAVAILABLE.to_owned()]
        } else {
            frames
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct Frame {
    symbol: String,
    location: Option<String>,
}

impl Frame {
    fn render(&self) -> String {
        match &self.location {
            Some(location) => format!("  at {} ({location})", self.symbol),
            None => format!("  at {}", self.symbol),
        }
    }
}

/// Parses the `Display` output of [`Backtrace`]: numbered symbol lines, each
/// optionally followed by an indented `at file:line:column` line.
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.location.is_none() {
                    frame.location = Some(location.trim().to_owned());
                }
            }
            continue;
        }
        if let Some((number, symbol)) = trimmed.split_once(": ") {
            if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame {
                    symbol: symbol.trim().to_owned(),
                    location: None,
                });
            }
        }
    }
    frames
}

fn is_internal(symbol: &str) -> bool {
    const PREFIXES: [&str; 6] = [
        "std::backtrace",
        "<std::backtrace",
        "std::backtrace_rs",
        "logging::",
        "<logging::",
        "<F as logging::",
    ];
    PREFIXES.iter().any(|prefix| symbol.starts_with(prefix))
}
