//! crates/logging/src/emitter.rs
//!
//! The [`Logger`] turns `(level, arguments)` pairs into records, routes them
//! through the level registry and implements the control flow attached to
//! ERROR, QUIT and FATAL.

use std::fmt;

use logging_sink::{OutputTargets, TargetId};

use crate::config::LogConfig;
use crate::error::{ConfigError, LogError, UsageError};
use crate::levels::{LevelClass, LevelRegistry, Update, names};
use crate::nesting::NestingState;
use crate::protocol::Sentinel;
use crate::record::{LogRecord, split_exit_status};
use crate::timestamp::{Clock, LocalClock, TimestampFormat};
use crate::trace::{BacktraceProducer, TraceProducer};

const TRACE_SKIP: usize = 0;

#[derive(Clone, Copy, Debug, Default)]
struct Thresholds {
    global: usize,
    console: Option<usize>,
}

/// Formats, filters and writes log records.
///
/// The logger owns the level registry, the output target table and the
/// nesting state of the command executor. The registry is frozen by the first
/// emission (or relayed line); from then on level definitions are fixed.
///
/// QUIT and FATAL records return [`LogError::Terminate`]. Callers propagate it
/// to `main`, which exits with the carried status; nothing else needs to be
/// written at that point.
///
/// # Examples
///
/// ```
/// use logging::{LogConfig, Logger};
/// use logging_sink::OutputTargets;
/// use test_support::SharedBuffer;
///
/// let stdout = SharedBuffer::new();
/// let stderr = SharedBuffer::new();
/// let targets = OutputTargets::with_writers(stdout.clone(), stderr.clone());
/// let mut logger = Logger::with_targets(LogConfig::default(), targets)?;
///
/// assert_eq!(logger.emit("success", &["deployed"])?, 0);
/// assert_eq!(logger.emit("ERROR", &["3", "tests failed"])?, 3);
///
/// assert_eq!(stdout.contents(), "SUCCESS deployed\n");
/// assert_eq!(stderr.contents(), "ERROR   tests failed (exit status 3)\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Logger {
    registry: LevelRegistry,
    targets: OutputTargets,
    config: LogConfig,
    timestamp: Option<TimestampFormat>,
    clock: Box<dyn Clock + Send>,
    tracer: Box<dyn TraceProducer + Send>,
    nesting: NestingState,
    thresholds: Thresholds,
}

impl Logger {
    /// Creates a logger writing to the process's standard streams.
    pub fn new(config: LogConfig) -> Result<Self, ConfigError> {
        Self::with_targets(config, OutputTargets::standard())
    }

    /// Creates a logger writing to `targets`.
    ///
    /// Opens the configured log file, if any, as an additional target for the
    /// configured levels.
    pub fn with_targets(config: LogConfig, mut targets: OutputTargets) -> Result<Self, ConfigError> {
        let timestamp = match config.timestamp_format.as_deref() {
            Some(format) => TimestampFormat::parse(format)?,
            None => None,
        };

        let mut registry = LevelRegistry::default();
        if let Some(path) = &config.log_file {
            let id = targets
                .open_file(path)
                .map_err(|source| ConfigError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            registry.add_output_target(id, &config.log_file_levels, &targets)?;
        }

        Ok(Self {
            registry,
            targets,
            nesting: NestingState::inherited(config.nesting_level),
            config,
            timestamp,
            clock: Box::new(LocalClock),
            tracer: Box::new(BacktraceProducer),
            thresholds: Thresholds::default(),
        })
    }

    /// Replaces the clock used for timestamps.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the producer of FATAL stack traces.
    pub fn with_trace_producer<T>(mut self, tracer: T) -> Self
    where
        T: TraceProducer + Send + 'static,
    {
        self.tracer = Box::new(tracer);
        self
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Level registry.
    #[must_use]
    pub const fn registry(&self) -> &LevelRegistry {
        &self.registry
    }

    /// Output target table.
    #[must_use]
    pub const fn targets(&self) -> &OutputTargets {
        &self.targets
    }

    /// Mutable output target table, for registering extra writers.
    pub fn targets_mut(&mut self) -> &mut OutputTargets {
        &mut self.targets
    }

    /// Nesting state of the command executor.
    #[must_use]
    pub const fn nesting(&self) -> &NestingState {
        &self.nesting
    }

    /// Creates or updates a level; see [`LevelRegistry::define_or_update`].
    ///
    /// Misuse is reported as a FATAL record.
    pub fn define_level(
        &mut self,
        name: &str,
        format: Update<String>,
        target: Option<Update<TargetId>>,
    ) -> Result<(), LogError> {
        self.registry
            .define_or_update(name, format, target, &self.targets)
            .map_err(|error| self.report_usage(error))
    }

    /// Routes levels to an additional target; see
    /// [`LevelRegistry::add_output_target`].
    ///
    /// Misuse is reported as a FATAL record.
    pub fn add_output_target<S: AsRef<str>>(
        &mut self,
        target: TargetId,
        levels: &[S],
    ) -> Result<(), LogError> {
        self.registry
            .add_output_target(target, levels, &self.targets)
            .map_err(|error| self.report_usage(error))
    }

    /// Emits one record at `level` (matched case-insensitively).
    ///
    /// Returns 0 for ordinary levels and the exit status for ERROR. QUIT and
    /// FATAL return [`LogError::Terminate`]. An unknown level is reported as an
    /// ERROR, the message is written at WARN and [`LogError::UnknownLevel`] is
    /// returned.
    pub fn emit<S: AsRef<str>>(&mut self, level: &str, args: &[S]) -> Result<i32, LogError> {
        self.ensure_frozen()?;
        #[cfg(feature = "tracing")]
        self.flush_tracing_events()?;

        match self.registry.resolve_index(level) {
            Some(index) => self.emit_at(index, args),
            None => self.emit_unknown(level, args),
        }
    }

    /// Writes one line of command output to every RUN target that is not
    /// suppressed. Priority filters do not apply.
    pub fn relay(&mut self, line: &str) -> Result<(), LogError> {
        self.ensure_frozen()?;
        for target in self.run_targets() {
            if self.nesting.is_suppressed(target) {
                continue;
            }
            self.targets
                .write_line(target, line, self.config.formatting)?;
        }
        Ok(())
    }

    /// Marks the start of a command run and returns the depth to hand to the
    /// child process.
    pub fn enter_command(&mut self) -> u32 {
        let run_targets = self.run_targets();
        self.nesting.enter(&run_targets)
    }

    /// Marks the end of a command run.
    pub fn leave_command(&mut self) {
        self.nesting.leave();
    }

    /// Writes diagnostics buffered since the last record.
    ///
    /// Does nothing before the first record or once a sentinel has been
    /// written, since the sentinel must stay the final line.
    pub fn flush_diagnostics(&mut self) -> Result<(), LogError> {
        if !self.registry.is_frozen() || self.nesting.sentinel_sent() {
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        self.flush_tracing_events()?;
        Ok(())
    }

    /// Writes the `fatal` sentinel for `status` to standard error when an
    /// enclosing executor exists and this process has not written one yet.
    pub fn propagate_fatal(&mut self, status: i32) -> Result<(), LogError> {
        if self.nesting.depth() == 0 || self.nesting.sentinel_sent() {
            return Ok(());
        }
        self.flush_diagnostics()?;
        self.nesting.claim_sentinel();
        self.targets
            .write_raw(TargetId::STDERR, &Sentinel::fatal(status).encode())?;
        Ok(())
    }

    /// Writes the `exit` sentinel for a nonzero final `status` when an
    /// enclosing executor exists and no fatal sentinel was written.
    pub fn report_exit(&mut self, status: i32) -> Result<(), LogError> {
        if status == 0 || self.nesting.depth() == 0 || self.nesting.sentinel_sent() {
            return Ok(());
        }
        self.flush_diagnostics()?;
        self.nesting.claim_sentinel();
        self.targets
            .write_raw(TargetId::STDERR, &Sentinel::exit(status).encode())?;
        Ok(())
    }

    /// Reports `error` as a FATAL record with status 1 and returns the
    /// resulting termination.
    ///
    /// The registry is frozen first if needed. When it cannot be used the
    /// report is written to standard error as a plain line.
    pub fn report_usage(&mut self, error: UsageError) -> LogError {
        let message = error.to_string();
        let decorate = self.config.formatting || self.targets.any_terminal();
        if self.registry.freeze(decorate).is_ok() {
            if let Some(fatal) = self.registry.resolve_index(names::FATAL) {
                return match self.emit_at(fatal, &["1", message.as_str()]) {
                    Err(error) => error,
                    Ok(_) => LogError::Terminate { status: 1 },
                };
            }
        }

        let line = format!("{} {message}", names::FATAL);
        if let Err(error) = self.targets.write_line(TargetId::STDERR, &line, false) {
            return LogError::Io(error);
        }
        LogError::Terminate { status: 1 }
    }

    fn ensure_frozen(&mut self) -> Result<(), LogError> {
        if self.registry.is_frozen() {
            return Ok(());
        }

        let decorate = self.config.formatting || self.targets.any_terminal();
        if let Err(error) = self.registry.freeze(decorate) {
            return Err(self.report_usage(error));
        }

        let level_filter = self.config.level_filter.clone();
        let Some(global) = self.registry.resolve_index(&level_filter) else {
            return Err(self.report_usage(UsageError::UnknownFilterLevel(level_filter)));
        };
        self.thresholds.global = global;

        if let Some(console_filter) = self.config.console_filter.clone() {
            let Some(console) = self.registry.resolve_index(&console_filter) else {
                self.thresholds.global = 0;
                return Err(self.report_usage(UsageError::UnknownFilterLevel(console_filter)));
            };
            self.thresholds.console = Some(console);
        }
        Ok(())
    }

    fn emit_at<S: AsRef<str>>(&mut self, index: usize, args: &[S]) -> Result<i32, LogError> {
        let class = self
            .registry
            .level(index)
            .map_or(LevelClass::Ordinary, |level| LevelClass::of(level.name()));

        match class {
            LevelClass::Ordinary => {
                self.write_record(index, args, None)?;
                Ok(0)
            }
            LevelClass::Error => {
                let (status, message) = split_exit_status(args);
                self.write_record(index, message, Some(status))?;
                Ok(status)
            }
            LevelClass::Quit | LevelClass::Fatal => {
                let (status, message) = split_exit_status(args);
                self.write_record(index, message, Some(status))?;
                self.propagate_fatal(status)?;
                Err(LogError::Terminate { status })
            }
        }
    }

    fn emit_unknown<S: AsRef<str>>(&mut self, level: &str, args: &[S]) -> Result<i32, LogError> {
        let name = level.to_uppercase();
        if let Some(error) = self.registry.resolve_index(names::ERROR) {
            let message = LogRecord::new("", args);
            let note = format!(
                "Unknown log level {name} for message: {}",
                message.message()
            );
            self.write_record(error, &[note], None)?;
        }
        match self.registry.resolve_index(names::WARN) {
            Some(warn) => {
                self.emit_at(warn, args)?;
            }
            None => {
                let message = LogRecord::new("", args);
                self.targets
                    .write_line(TargetId::STDERR, message.message(), self.config.formatting)?;
            }
        }
        Err(LogError::UnknownLevel(name))
    }

    fn write_record<S: AsRef<str>>(
        &mut self,
        index: usize,
        parts: &[S],
        status: Option<i32>,
    ) -> Result<(), LogError> {
        let Some(level) = self.registry.level(index) else {
            return Ok(());
        };
        let targets = level.targets().to_vec();
        let fatal = level.name() == names::FATAL;

        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(|format| format.render(self.clock.as_ref()));
        let label = self.registry.label(index).unwrap_or_default();
        let line = LogRecord::new(label, parts)
            .with_timestamp(timestamp)
            .with_exit_status(status)
            .to_string();
        let trace = if fatal {
            self.tracer.produce_trace(TRACE_SKIP)
        } else {
            Vec::new()
        };

        for target in targets {
            if !self.accepts(index, target) {
                continue;
            }
            self.targets
                .write_line(target, &line, self.config.formatting)?;
            for frame in &trace {
                self.targets
                    .write_line(target, frame, self.config.formatting)?;
            }
        }
        Ok(())
    }

    fn accepts(&self, index: usize, target: TargetId) -> bool {
        if self.nesting.is_suppressed(target) {
            return false;
        }
        let threshold = match self.thresholds.console {
            Some(console) if self.targets.is_console(target) => console,
            _ => self.thresholds.global,
        };
        index >= threshold
    }

    fn run_targets(&self) -> Vec<TargetId> {
        self.registry
            .resolve_index(names::RUN)
            .and_then(|index| self.registry.level(index))
            .map_or_else(|| vec![TargetId::STDOUT], |level| level.targets().to_vec())
    }

    #[cfg(feature = "tracing")]
    fn flush_tracing_events(&mut self) -> Result<(), LogError> {
        for event in crate::tracing_bridge::drain_events() {
            if let Some(index) = self.registry.resolve_index(event.level_name()) {
                self.write_record(index, &[event.message], None)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("registry", &self.registry)
            .field("targets", &self.targets)
            .field("config", &self.config)
            .field("nesting", &self.nesting)
            .finish_non_exhaustive()
    }
}
