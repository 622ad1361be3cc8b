//! crates/logging/src/error.rs
//! Error types shared by the registry, the emitter and configuration loading.

use std::io;
use std::path::PathBuf;

use logging_sink::{TargetError, TargetId};
use thiserror::Error;

/// Misuse of the logging API by the script or program driving it.
///
/// Usage errors are programmer errors. The emitter reports them as a FATAL
/// record and terminates with status 1.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum UsageError {
    /// The registry was modified after the first record was emitted.
    #[error("log levels cannot be changed after the first message has been logged")]
    Frozen,

    /// `Keep` was requested for a field of a level that does not exist yet.
    #[error("cannot keep the {field} of undefined log level {name}")]
    KeepOnNewLevel {
        /// Upper-cased level name.
        name: String,
        /// Field that had no concrete value.
        field: &'static str,
    },

    /// The requested output target is not open for writing.
    #[error("output target {0} is not open for writing")]
    TargetNotOpen(TargetId),

    /// The requested output target is not a positive integer.
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    /// A critical section was requested at a level other than QUIT or FATAL.
    #[error("critical section level must be QUIT or FATAL, not {0}")]
    CriticalLevel(String),

    /// The registry failed validation when it was frozen.
    #[error("corrupt log level registry: {0}")]
    CorruptRegistry(String),

    /// A priority filter names a level the registry does not define.
    #[error("unknown log level {0} in priority filter")]
    UnknownFilterLevel(String),

    /// A command was submitted without a program.
    #[error("no command given to run")]
    EmptyCommand,
}

/// Outcome of an emission or command that did not simply succeed.
#[derive(Debug, Error)]
pub enum LogError {
    /// The requested level does not exist. The message was still logged at WARN.
    #[error("unknown log level {0}")]
    UnknownLevel(String),

    /// The process must terminate with `status`; every human-readable report
    /// has already been written.
    #[error("terminating with exit status {status}")]
    Terminate {
        /// Exit status to terminate with.
        status: i32,
    },

    /// Writing to an output target failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LogError {
    /// Returns the process exit status this error maps to.
    #[must_use]
    pub const fn exit_status(&self) -> i32 {
        match self {
            Self::Terminate { status } => *status,
            Self::UnknownLevel(_) | Self::Io(_) => 1,
        }
    }

    /// Reports whether the error requests process termination.
    #[must_use]
    pub const fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate { .. })
    }
}

/// Malformed configuration read from the environment or the command line.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The timestamp format is not a valid `time` format description.
    #[error("invalid timestamp format '{format}': {message}")]
    TimestampFormat {
        /// Format text as supplied.
        format: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A variable that must name QUIT or FATAL names something else.
    #[error("{variable} must be QUIT or FATAL, not '{value}'")]
    CriticalLevel {
        /// Variable or option name.
        variable: String,
        /// Rejected value.
        value: String,
    },

    /// The inherited nesting level is not a non-negative integer.
    #[error("{variable} must be a non-negative integer, not '{value}'")]
    NestingLevel {
        /// Variable name.
        variable: String,
        /// Rejected value.
        value: String,
    },

    /// The configured log file could not be opened.
    #[error("cannot open log file {}: {source}", path.display())]
    LogFile {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Applying the configuration to the registry failed.
    #[error(transparent)]
    Usage(#[from] UsageError),
}
