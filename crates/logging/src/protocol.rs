//! crates/logging/src/protocol.rs
//!
//! # Overview
//!
//! Line protocol through which a nested framework process tells the enclosing
//! command executor how it ended. The child writes one sentinel line to its
//! standard error as its final output:
//!
//! ```text
//! @runlog.command exit:3
//! @runlog.command fatal:1
//! ```
//!
//! `exit` carries an ordinary termination status. `fatal` means the failure
//! was already reported as a QUIT or FATAL record, so the parent must
//! propagate the status without reporting it again.
//!
//! # Invariants
//!
//! - A sentinel line matches `^@runlog.command (exit|fatal):([0-9]+)$`. One
//!   trailing carriage return is tolerated; statuses that overflow `i32` are
//!   not sentinels.
//! - Only a sentinel on the final line of output counts. Any later ordinary
//!   line clears what an earlier sentinel recorded.
//! - Sentinel lines are consumed by the parent and never relayed.

use std::fmt;

/// Literal prefix of every sentinel line.
pub const SENTINEL_MARKER: &str = "@runlog.command";

/// Largest exit status a process can report.
pub const MAX_EXIT_STATUS: i32 = 255;

/// Reduces `status` to the `0..=255` range the way a shell does, modulo 256.
///
/// ```
/// use logging::protocol::normalize_exit_status;
///
/// assert_eq!(normalize_exit_status(-3), 253);
/// assert_eq!(normalize_exit_status(300), 44);
/// ```
#[must_use]
pub const fn normalize_exit_status(status: i32) -> i32 {
    status.rem_euclid(MAX_EXIT_STATUS + 1)
}

/// Kind of termination a sentinel reports.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SentinelKind {
    /// Ordinary termination with a status.
    Exit,
    /// Termination already reported as QUIT or FATAL.
    Fatal,
}

impl SentinelKind {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Fatal => "fatal",
        }
    }
}

/// A decoded sentinel line.
///
/// ```
/// use logging::{Sentinel, SentinelKind};
///
/// let sentinel = Sentinel::fatal(3);
/// assert_eq!(sentinel.to_string(), "@runlog.command fatal:3");
/// assert_eq!(Sentinel::decode("@runlog.command exit:0"), Some(Sentinel::exit(0)));
/// assert_eq!(Sentinel::decode("@runlog.command exit:"), None);
/// assert_eq!(Sentinel::decode("x @runlog.command exit:1"), None);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Sentinel {
    kind: SentinelKind,
    status: i32,
}

impl Sentinel {
    /// Ordinary termination. The status is normalized with [`normalize_exit_status`].
    #[must_use]
    pub const fn exit(status: i32) -> Self {
        Self::new(SentinelKind::Exit, status)
    }

    /// Already reported termination. The status is normalized with [`normalize_exit_status`].
    #[must_use]
    pub const fn fatal(status: i32) -> Self {
        Self::new(SentinelKind::Fatal, status)
    }

    const fn new(kind: SentinelKind, status: i32) -> Self {
        Self {
            kind,
            status: normalize_exit_status(status),
        }
    }

    /// Sentinel kind.
    #[must_use]
    pub const fn kind(self) -> SentinelKind {
        self.kind
    }

    /// Reported exit status.
    #[must_use]
    pub const fn status(self) -> i32 {
        self.status
    }

    /// Encodes the sentinel as a line without terminator.
    #[must_use]
    pub fn encode(self) -> String {
        self.to_string()
    }

    /// Decodes `line`, returning `None` when it is not a sentinel.
    #[must_use]
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let rest = line.strip_prefix(SENTINEL_MARKER)?.strip_prefix(' ')?;
        let (keyword, digits) = rest.split_once(':')?;
        let kind = match keyword {
            "exit" => SentinelKind::Exit,
            "fatal" => SentinelKind::Fatal,
            _ => return None,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let status = digits.parse::<i32>().ok()?;
        Some(Self { kind, status })
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SENTINEL_MARKER} {}:{}",
            self.kind.keyword(),
            self.status
        )
    }
}

/// Tracks sentinels in a stream of output lines.
///
/// Feed every line to [`SentinelTracker::observe`] in order; afterwards the
/// tracker describes the sentinel on the final line, if there was one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SentinelTracker {
    last: Option<Sentinel>,
}

impl SentinelTracker {
    /// Creates a tracker that has seen no output.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Observes one line and returns `true` when it was a sentinel, in which
    /// case it must not be relayed.
    pub fn observe(&mut self, line: &str) -> bool {
        self.last = Sentinel::decode(line);
        self.last.is_some()
    }

    /// Sentinel on the final line observed so far.
    #[must_use]
    pub const fn last(&self) -> Option<Sentinel> {
        self.last
    }

    /// Status reported by the final sentinel, or 0.
    #[must_use]
    pub fn status(&self) -> i32 {
        self.last.map_or(0, Sentinel::status)
    }

    /// Reports whether the final line announced an already reported failure.
    #[must_use]
    pub fn already_fatal(&self) -> bool {
        self.last
            .is_some_and(|sentinel| sentinel.kind == SentinelKind::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for sentinel in [Sentinel::exit(0), Sentinel::exit(3), Sentinel::fatal(255)] {
            assert_eq!(Sentinel::decode(&sentinel.encode()), Some(sentinel));
        }
    }

    #[test]
    fn encode_wraps_status_like_a_shell() {
        assert_eq!(Sentinel::fatal(-4).encode(), "@runlog.command fatal:252");
        assert_eq!(Sentinel::exit(300).encode(), "@runlog.command exit:44");
        assert_eq!(Sentinel::exit(256).encode(), "@runlog.command exit:0");
    }

    #[test]
    fn negative_statuses_never_become_success() {
        for status in [-1, -3, -255] {
            assert_ne!(normalize_exit_status(status), 0, "status {status}");
        }
        assert_eq!(normalize_exit_status(-3), 253);
        assert_eq!(normalize_exit_status(42), 42);
    }

    #[test]
    fn decode_tolerates_carriage_return() {
        assert_eq!(
            Sentinel::decode("@runlog.command fatal:7\r"),
            Some(Sentinel::fatal(7))
        );
    }

    #[test]
    fn decode_rejects_near_misses() {
        for line in [
            "",
            "@runlog.command",
            "@runlog.command exit",
            "@runlog.command exit:",
            "@runlog.command exit:-1",
            "@runlog.command exit:+1",
            "@runlog.command exit:1 ",
            " @runlog.command exit:1",
            "@runlog.command  exit:1",
            "@runlog.command quit:1",
            "@runlog.command EXIT:1",
            "@runlog.commandexit:1",
            "@runlog.command exit:99999999999",
            "@runlog.command exit:1\r\r",
        ] {
            assert_eq!(Sentinel::decode(line), None, "{line:?}");
        }
    }

    #[test]
    fn decode_accepts_large_in_range_statuses() {
        assert_eq!(
            Sentinel::decode("@runlog.command exit:1000").map(Sentinel::status),
            Some(1000)
        );
    }

    #[test]
    fn tracker_honours_only_the_final_line() {
        let mut tracker = SentinelTracker::new();
        assert!(tracker.observe("@runlog.command fatal:4"));
        assert!(tracker.already_fatal());
        assert_eq!(tracker.status(), 4);

        assert!(!tracker.observe("more output"));
        assert!(!tracker.already_fatal());
        assert_eq!(tracker.status(), 0);
        assert_eq!(tracker.last(), None);
    }

    #[test]
    fn exit_sentinel_sets_status_without_fatal_flag() {
        let mut tracker = SentinelTracker::new();
        tracker.observe("@runlog.command fatal:4");
        tracker.observe("@runlog.command exit:2");
        assert!(!tracker.already_fatal());
        assert_eq!(tracker.status(), 2);
    }

    #[test]
    fn empty_stream_reports_nothing() {
        let tracker = SentinelTracker::default();
        assert_eq!(tracker.status(), 0);
        assert!(!tracker.already_fatal());
    }
}
