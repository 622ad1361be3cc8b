#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/engine/src/lib.rs
//!
//! # Overview
//!
//! `engine` runs external commands on behalf of the runlog logging framework.
//! Every command line is logged at RUN, the command's combined output is
//! relayed through the same level routing as log records, and failures are
//! escalated to ERROR, QUIT or FATAL depending on the critical sections open at
//! the time.
//!
//! # Design
//!
//! [`Engine`] is the single context object: it owns the
//! [`Logger`](logging::Logger) (registry, targets and nesting state) and the
//! [`CriticalSections`] tracker. Output is read on one dedicated thread per
//! command and handed to the executor over a channel, so relayed lines and log
//! records are written from one thread and never interleave.
//!
//! A command that is itself a runlog invocation inherits the effective
//! configuration and a nesting depth through the environment. When such a
//! child has already written a FATAL record it ends its output with a
//! [`Sentinel`](logging::Sentinel); the parent consumes that line and
//! terminates with the same status instead of reporting the failure again.
//!
//! # Invariants
//!
//! - A failed command produces at most one human-readable FATAL record across
//!   an entire chain of nested invocations.
//! - Sentinel lines are never relayed.
//! - Critical sections latch their level on the outermost entry.
//!
//! # Errors
//!
//! Operations return [`LogError`]. [`LogError::Terminate`] carries the status
//! the process must exit with once every report has been written.
//!
//! # Examples
//!
//! ```no_run
//! use engine::Engine;
//! use logging::{LogConfig, Logger};
//!
//! let mut engine = Engine::new(Logger::new(LogConfig::from_env()?)?);
//! let status = engine.run_command(&["cargo", "fmt", "--check"])?;
//! if status != 0 {
//!     engine.emit("WARN", &["formatting drift"])?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # See also
//!
//! - [`logging::protocol`] for the sentinel line format.

mod command;
mod critical;

use std::env;
use std::path::{Path, PathBuf};

use logging::{CriticalLevel, LogError, Logger, UsageError};

pub use command::{NOT_EXECUTABLE_STATUS, NOT_FOUND_STATUS, exit_status_code, render_command};
pub use critical::{CriticalSectionGuard, CriticalSections};

const DEFAULT_PROGRAM_NAME: &str = "runlog";

/// Command execution context.
#[derive(Debug)]
pub struct Engine {
    logger: Logger,
    critical: CriticalSections,
    program_name: String,
    self_exe: Option<PathBuf>,
}

impl Engine {
    /// Wraps `logger`. Critical sections default to the configured level.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        let self_exe = env::current_exe().ok();
        let program_name = self_exe
            .as_deref()
            .and_then(Path::file_name)
            .map_or_else(
                || DEFAULT_PROGRAM_NAME.to_owned(),
                |name| name.to_string_lossy().into_owned(),
            );
        Self {
            critical: CriticalSections::new(logger.config().critical_default),
            logger,
            program_name,
            self_exe,
        }
    }

    /// Sets the name shown in place of this program's path in logged
    /// command lines.
    #[must_use]
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    /// Sets the executable recognised as a recursive invocation.
    #[must_use]
    pub fn with_self_exe(mut self, path: Option<PathBuf>) -> Self {
        self.self_exe = path;
        self
    }

    /// The logger.
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The logger, mutably.
    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Consumes the engine and returns its logger.
    #[must_use]
    pub fn into_logger(self) -> Logger {
        self.logger
    }

    /// Emits a record; see [`Logger::emit`].
    pub fn emit<S: AsRef<str>>(&mut self, level: &str, args: &[S]) -> Result<i32, LogError> {
        self.logger.emit(level, args)
    }

    /// Opens a critical section.
    ///
    /// `level` is `QUIT` or `FATAL` (any case) and only takes effect on the
    /// outermost section; `None` uses the configured default. Anything else is
    /// a usage error reported as FATAL.
    pub fn begin_critical_section(&mut self, level: Option<&str>) -> Result<(), LogError> {
        let level = match level {
            Some(text) => match text.parse::<CriticalLevel>() {
                Ok(level) => Some(level),
                Err(text) => {
                    return Err(self.logger.report_usage(UsageError::CriticalLevel(text)));
                }
            },
            None => None,
        };
        self.critical.begin(level);
        Ok(())
    }

    /// Closes the innermost critical section. Without one this does nothing.
    pub fn end_critical_section(&mut self) {
        self.critical.end();
    }

    /// Opens a critical section closed when the returned guard drops.
    pub fn critical_section(
        &mut self,
        level: Option<&str>,
    ) -> Result<CriticalSectionGuard<'_>, LogError> {
        self.begin_critical_section(level)?;
        Ok(CriticalSectionGuard::new(self))
    }

    /// Number of open critical sections.
    #[must_use]
    pub const fn critical_depth(&self) -> u32 {
        self.critical.depth()
    }

    /// Level failures escalate to, while a critical section is open.
    #[must_use]
    pub const fn critical_level(&self) -> Option<CriticalLevel> {
        self.critical.active_level()
    }
}
