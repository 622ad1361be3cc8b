#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` is the reporting half of the runlog engine. It keeps the
//! priority-ordered registry of log levels, renders and routes records through
//! it and carries the state that lets nested framework processes tell their
//! parent that a failure was already reported.
//!
//! # Design
//!
//! - [`LevelRegistry`] orders [`LogLevel`]s by priority, lowest first, with
//!   FATAL always last. Levels can be defined and rerouted until the first
//!   record is emitted; [`Update`] selects between replacing and keeping a
//!   field.
//! - [`Logger`] owns the registry, the [`OutputTargets`](logging_sink::OutputTargets)
//!   table and the executor's [`NestingState`]. [`Logger::emit`] renders
//!   `[timestamp ]LABEL message[ (exit status N)]`, applies the global and
//!   console priority filters and writes the record to every target of the
//!   level. ERROR returns its status, QUIT and FATAL return
//!   [`LogError::Terminate`], FATAL after a stack trace from the configured
//!   [`TraceProducer`].
//! - [`protocol`] defines the sentinel line a nested process writes to
//!   standard error so the enclosing executor neither loses the exit status
//!   nor reports a fatal failure twice.
//! - [`LogConfig`] reads the `RUNLOG_*` environment variables and exports
//!   them again for child processes.
//!
//! # Invariants
//!
//! - FATAL is the highest priority level. New levels are inserted below it.
//! - The registry never changes after the first emission.
//! - A process writes at most one `fatal` sentinel.
//! - Messages are never dropped silently: an unknown level is reported and the
//!   message is written at WARN.
//!
//! # Errors
//!
//! [`UsageError`] covers API misuse and is reported as a FATAL record.
//! [`LogError`] is returned by emission and carries termination requests.
//! [`ConfigError`] reports malformed configuration.
//!
//! # Examples
//!
//! ```
//! use logging::{LogConfig, LogError, Logger};
//! use logging_sink::OutputTargets;
//! use test_support::SharedBuffer;
//!
//! let stderr = SharedBuffer::new();
//! let targets = OutputTargets::with_writers(SharedBuffer::new(), stderr.clone());
//! let mut logger = Logger::with_targets(LogConfig::default(), targets)?
//!     .with_trace_producer(|_skip: usize| vec!["  at main".to_owned()]);
//!
//! let outcome = logger.emit("FATAL", &["2", "cannot continue"]);
//! assert!(matches!(outcome, Err(LogError::Terminate { status: 2 })));
//! assert_eq!(
//!     stderr.contents(),
//!     "FATAL   cannot continue (exit status 2)\n  at main\n"
//! );
//! # Ok::<(), logging::ConfigError>(())
//! ```
//!
//! # See also
//!
//! - `logging_sink` for output targets and escape stripping.
//! - The `engine` crate, which runs commands through a [`Logger`].

mod config;
mod emitter;
mod error;
mod levels;
mod nesting;
pub mod protocol;
mod record;
mod timestamp;
mod trace;
#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use config::{CriticalLevel, LogConfig, parse_flag, vars};
pub use emitter::Logger;
pub use error::{ConfigError, LogError, UsageError};
pub use levels::{LevelClass, LevelRegistry, LogLevel, Update, names, parse_format_code};
pub use nesting::NestingState;
pub use protocol::{Sentinel, SentinelKind, SentinelTracker};
pub use record::{LogRecord, split_exit_status};
pub use timestamp::{Clock, LocalClock, TimestampFormat};
pub use trace::{BacktraceProducer, TraceProducer};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{RunlogLayer, TracingEvent, drain_events, init_tracing, push_event};
