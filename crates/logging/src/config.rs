//! crates/logging/src/config.rs
//! Engine configuration read from `RUNLOG_*` environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::levels::names;

/// Environment variable names understood by [`LogConfig`].
pub mod vars {
    /// `time` format description prefixed to every record; empty disables timestamps.
    pub const TIMESTAMP_FORMAT: &str = "RUNLOG_TIMESTAMP_FORMAT";
    /// Lowest level written to any target.
    pub const LEVEL_FILTER: &str = "RUNLOG_LEVEL_FILTER";
    /// Lowest level written to console targets; unset inherits the level filter.
    pub const CONSOLE_FILTER: &str = "RUNLOG_CONSOLE_FILTER";
    /// Keeps escape sequences on targets that are not terminals.
    pub const FORMATTING: &str = "RUNLOG_FORMATTING";
    /// Logs commands without running them.
    pub const DRY_RUN: &str = "RUNLOG_DRY_RUN";
    /// Level latched by critical sections opened without an explicit level.
    pub const CRITICAL_SECTION_DEFAULT: &str = "RUNLOG_CRITICAL_SECTION_DEFAULT";
    /// File that records are appended to in addition to the console.
    pub const LOG_FILE: &str = "RUNLOG_LOG_FILE";
    /// Comma separated levels routed to the log file; empty routes all levels.
    pub const LOG_FILE_LEVELS: &str = "RUNLOG_LOG_FILE_LEVELS";
    /// Nesting depth inherited from an enclosing command executor.
    pub const COMMAND_NESTING_LEVEL: &str = "RUNLOG_COMMAND_NESTING_LEVEL";
}

/// Level a critical section escalates command failures to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CriticalLevel {
    /// Terminate without a stack trace.
    Quit,
    /// Terminate after writing a stack trace.
    #[default]
    Fatal,
}

impl CriticalLevel {
    /// Level name as registered in the registry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quit => names::QUIT,
            Self::Fatal => names::FATAL,
        }
    }
}

impl fmt::Display for CriticalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriticalLevel {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_uppercase().as_str() {
            names::QUIT => Ok(Self::Quit),
            names::FATAL => Ok(Self::Fatal),
            _ => Err(text.to_owned()),
        }
    }
}

/// Runtime configuration of the emitter and the command executor.
///
/// Values normally come from the environment so nested invocations of the
/// framework inherit them. [`LogConfig::env_pairs`] produces the variables a
/// child process needs to reproduce this configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogConfig {
    /// Timestamp format description; `None` disables timestamps.
    pub timestamp_format: Option<String>,
    /// Lowest level written to any target.
    pub level_filter: String,
    /// Lowest level written to console targets.
    pub console_filter: Option<String>,
    /// Keep escape sequences on targets that are not terminals.
    pub formatting: bool,
    /// Log commands without running them.
    pub dry_run: bool,
    /// Default critical section level.
    pub critical_default: CriticalLevel,
    /// Additional log file.
    pub log_file: Option<PathBuf>,
    /// Levels routed to the log file; empty routes every level.
    pub log_file_levels: Vec<String>,
    /// Nesting depth inherited from an enclosing executor.
    pub nesting_level: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            timestamp_format: None,
            level_filter: names::RUN.to_owned(),
            console_filter: None,
            formatting: false,
            dry_run: false,
            critical_default: CriticalLevel::Fatal,
            log_file: None,
            log_file_levels: Vec::new(),
            nesting_level: 0,
        }
    }
}

impl LogConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names to values.
    ///
    /// Unset and empty variables fall back to the defaults.
    ///
    /// ```
    /// use logging::{CriticalLevel, LogConfig};
    ///
    /// let config = LogConfig::from_lookup(|name| match name {
    ///     "RUNLOG_LEVEL_FILTER" => Some("debug".to_owned()),
    ///     "RUNLOG_DRY_RUN" => Some("yes".to_owned()),
    ///     "RUNLOG_CRITICAL_SECTION_DEFAULT" => Some("quit".to_owned()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(config.level_filter, "DEBUG");
    /// assert!(config.dry_run);
    /// assert_eq!(config.critical_default, CriticalLevel::Quit);
    /// # Ok::<(), logging::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.timestamp_format = value(vars::TIMESTAMP_FORMAT);
        if let Some(filter) = value(vars::LEVEL_FILTER) {
            config.level_filter = filter.trim().to_uppercase();
        }
        config.console_filter = value(vars::CONSOLE_FILTER).map(|f| f.trim().to_uppercase());
        config.formatting = value(vars::FORMATTING).is_some_and(|v| parse_flag(&v));
        config.dry_run = value(vars::DRY_RUN).is_some_and(|v| parse_flag(&v));
        if let Some(level) = value(vars::CRITICAL_SECTION_DEFAULT) {
            config.critical_default = level.parse().map_err(|value| ConfigError::CriticalLevel {
                variable: vars::CRITICAL_SECTION_DEFAULT.to_owned(),
                value,
            })?;
        }
        config.log_file = value(vars::LOG_FILE).map(PathBuf::from);
        config.log_file_levels = value(vars::LOG_FILE_LEVELS)
            .map(|levels| parse_level_list(&levels))
            .unwrap_or_default();
        if let Some(depth) = value(vars::COMMAND_NESTING_LEVEL) {
            config.nesting_level = depth.trim().parse().map_err(|_| ConfigError::NestingLevel {
                variable: vars::COMMAND_NESTING_LEVEL.to_owned(),
                value: depth.clone(),
            })?;
        }

        Ok(config)
    }

    /// Returns the variables that reproduce this configuration in a child
    /// process, excluding the nesting level which the executor sets itself.
    ///
    /// Every variable is listed so values inherited from this process's own
    /// environment cannot contradict the effective configuration.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        let flag = |set: bool| if set { "1" } else { "0" }.to_owned();
        vec![
            (
                vars::TIMESTAMP_FORMAT,
                self.timestamp_format.clone().unwrap_or_default(),
            ),
            (vars::LEVEL_FILTER, self.level_filter.clone()),
            (
                vars::CONSOLE_FILTER,
                self.console_filter.clone().unwrap_or_default(),
            ),
            (vars::FORMATTING, flag(self.formatting)),
            (vars::DRY_RUN, flag(self.dry_run)),
            (
                vars::CRITICAL_SECTION_DEFAULT,
                self.critical_default.as_str().to_owned(),
            ),
            (
                vars::LOG_FILE,
                self.log_file
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
            ),
            (vars::LOG_FILE_LEVELS, self.log_file_levels.join(",")),
        ]
    }
}

/// Interprets a boolean configuration value.
///
/// Empty, `0`, `false`, `no` and `off` (any case) are false; everything else is true.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn parse_level_list(text: &str) -> Vec<String> {
    text.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|name| !name.is_empty())
        .map(str::to_uppercase)
        .collect()
}
