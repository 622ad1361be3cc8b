#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/logging-sink/src/lib.rs
//!
//! # Overview
//!
//! `logging-sink` owns the output side of the runlog workspace: the table of
//! numbered output targets that log levels route records to, and the
//! terminal-aware line writer shared by the emitter and the command relay.
//!
//! # Design
//!
//! Targets are addressed by [`TargetId`], a positive descriptor number that
//! mirrors the file-descriptor numbering scripts are used to: `1` is standard
//! output, `2` is standard error and every additional log file receives the
//! next free number starting at `3`. [`OutputTargets`] stores one boxed writer
//! per id together with a flag recording whether a human is watching the other
//! end (a terminal). [`OutputTargets::write_line`] applies the formatting rule
//! used for every line the workspace prints: terminals (or callers forcing
//! formatting) receive the text verbatim followed by [`RESET`], everything else
//! receives the text with escape sequences removed by [`strip_escapes`].
//!
//! # Invariants
//!
//! - Ids `1` and `2` are console targets regardless of what they write to.
//! - Every written line ends with exactly one newline and is flushed before the
//!   call returns, so interleaving with child process output stays line exact.
//! - Lines routed to non-terminal targets never contain escape sequences unless
//!   formatting is forced.
//!
//! # Errors
//!
//! Writer failures surface as [`std::io::Error`]. Parsing descriptor numbers
//! reports [`TargetError`].
//!
//! # Examples
//!
//! ```
//! use logging_sink::{OutputTargets, TargetId};
//! use test_support::SharedBuffer;
//!
//! let stdout = SharedBuffer::new();
//! let stderr = SharedBuffer::new();
//! let mut targets = OutputTargets::with_writers(stdout.clone(), stderr.clone());
//!
//! targets.write_line(TargetId::STDOUT, "\x1b[1mhello\x1b[0m", false)?;
//! assert_eq!(stdout.contents(), "hello\n");
//! # Ok::<(), std::io::Error>(())
//! ```

mod error;
mod escapes;
mod target;
mod targets;

pub use error::TargetError;
pub use escapes::{RESET, contains_escape, strip_escapes};
pub use target::TargetId;
pub use targets::{OutputTarget, OutputTargets};
