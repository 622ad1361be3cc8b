//! crates/logging/src/levels.rs
//! Priority-ordered registry of log levels with per-level formatting and routing.

use logging_sink::{OutputTargets, RESET, TargetId};

use crate::error::UsageError;

/// Names of the levels every registry starts with.
pub mod names {
    /// Developer diagnostics.
    pub const DEBUG: &str = "DEBUG";
    /// Informational messages.
    pub const INFO: &str = "INFO";
    /// Commands about to run and their relayed output.
    pub const RUN: &str = "RUN";
    /// Warnings.
    pub const WARN: &str = "WARN";
    /// Recoverable failures carrying an exit status.
    pub const ERROR: &str = "ERROR";
    /// Start of a unit of work.
    pub const START: &str = "START";
    /// End of a unit of work.
    pub const FINISH: &str = "FINISH";
    /// Successful completion.
    pub const SUCCESS: &str = "SUCCESS";
    /// Terminates the process without a stack trace.
    pub const QUIT: &str = "QUIT";
    /// Terminates the process after writing a stack trace.
    pub const FATAL: &str = "FATAL";
}

const BOLD_BLUE: &str = "\x1b[1;34m";
const BOLD_CYAN: &str = "\x1b[1;36m";
const BOLD_MAGENTA: &str = "\x1b[1;35m";
const BOLD_YELLOW: &str = "\x1b[1;33m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";

/// Field update that either replaces a value or keeps the current one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Update<T> {
    /// Replace the field with this value.
    Set(T),
    /// Leave the field unchanged.
    Keep,
}

impl<T> Update<T> {
    /// Returns the concrete value, if any.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Keep => None,
        }
    }
}

/// How the emitter treats records of a level beyond writing them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LevelClass {
    /// Written and done.
    Ordinary,
    /// Carries an exit status that is returned to the caller.
    Error,
    /// Carries an exit status and terminates the process.
    Quit,
    /// Like [`LevelClass::Quit`] with a stack trace after the record.
    Fatal,
}

impl LevelClass {
    /// Classifies a level by its upper-case name.
    #[must_use]
    pub fn of(name: &str) -> Self {
        match name {
            names::ERROR => Self::Error,
            names::QUIT => Self::Quit,
            names::FATAL => Self::Fatal,
            _ => Self::Ordinary,
        }
    }

    /// Reports whether records of this class consume an exit status argument.
    #[must_use]
    pub const fn carries_status(self) -> bool {
        !matches!(self, Self::Ordinary)
    }

    /// Reports whether records of this class terminate the process.
    #[must_use]
    pub const fn terminates(self) -> bool {
        matches!(self, Self::Quit | Self::Fatal)
    }
}

/// A named log level.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogLevel {
    name: String,
    format: String,
    targets: Vec<TargetId>,
}

impl LogLevel {
    /// Creates a level; `name` is upper-cased and duplicate targets are dropped.
    pub fn new(name: &str, format: impl Into<String>, targets: &[TargetId]) -> Self {
        let mut level = Self {
            name: name.to_uppercase(),
            format: format.into(),
            targets: Vec::with_capacity(targets.len()),
        };
        for &target in targets {
            level.add_target(target);
        }
        level
    }

    /// Upper-case level name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terminal escape sequence applied to the label.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Output targets in the order records are written to them.
    #[must_use]
    pub fn targets(&self) -> &[TargetId] {
        &self.targets
    }

    fn add_target(&mut self, target: TargetId) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }
}

/// Ordered set of log levels, lowest priority first.
///
/// A level's priority is its position. FATAL is always the highest priority
/// level; levels created later are inserted directly below it. The registry may
/// be changed until [`LevelRegistry::freeze`] runs, which happens when the first
/// record is emitted. Afterwards every mutation fails with
/// [`UsageError::Frozen`].
///
/// # Examples
///
/// ```
/// use logging::{LevelRegistry, Update, names};
/// use logging_sink::{OutputTargets, TargetId};
///
/// let targets = OutputTargets::with_writers(Vec::new(), Vec::new());
/// let mut registry = LevelRegistry::default();
/// registry.define_or_update(
///     "notice",
///     Update::Set("\x1b[1m".to_owned()),
///     Some(Update::Set(TargetId::STDERR)),
///     &targets,
/// )?;
///
/// let notice = registry.resolve_index("NOTICE").unwrap();
/// assert_eq!(notice + 1, registry.resolve_index(names::FATAL).unwrap());
/// # Ok::<(), logging::UsageError>(())
/// ```
#[derive(Clone, Debug)]
pub struct LevelRegistry {
    levels: Vec<LogLevel>,
    labels: Vec<String>,
    frozen: bool,
}

impl Default for LevelRegistry {
    fn default() -> Self {
        let stdout = [TargetId::STDOUT];
        let stderr = [TargetId::STDERR];
        Self::from_levels(vec![
            LogLevel::new(names::DEBUG, BOLD_BLUE, &stderr),
            LogLevel::new(names::INFO, BOLD_CYAN, &stdout),
            LogLevel::new(names::RUN, BOLD_MAGENTA, &stdout),
            LogLevel::new(names::WARN, BOLD_YELLOW, &stderr),
            LogLevel::new(names::ERROR, BOLD_RED, &stderr),
            LogLevel::new(names::START, BOLD_CYAN, &stdout),
            LogLevel::new(names::FINISH, BOLD_CYAN, &stdout),
            LogLevel::new(names::SUCCESS, BOLD_GREEN, &stdout),
            LogLevel::new(names::QUIT, BOLD_RED, &stderr),
            LogLevel::new(names::FATAL, BOLD_RED, &stderr),
        ])
    }
}

impl LevelRegistry {
    /// Builds a registry from explicit levels, lowest priority first.
    ///
    /// The levels are validated by [`LevelRegistry::freeze`].
    #[must_use]
    pub fn from_levels(levels: Vec<LogLevel>) -> Self {
        Self {
            levels,
            labels: Vec::new(),
            frozen: false,
        }
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Reports whether the registry has no levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Reports whether the registry has been frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the level at priority `index`.
    #[must_use]
    pub fn level(&self, index: usize) -> Option<&LogLevel> {
        self.levels.get(index)
    }

    /// Iterates the levels, lowest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &LogLevel> + '_ {
        self.levels.iter()
    }

    /// Returns the priority index of `name`, matched case-insensitively.
    #[must_use]
    pub fn resolve_index(&self, name: &str) -> Option<usize> {
        let name = name.to_uppercase();
        self.levels.iter().position(|level| level.name == name)
    }

    /// Returns the label written for `index`.
    ///
    /// Before freezing this is the bare level name. Afterwards it is padded to
    /// the longest name and, when decoration was requested, wrapped in the
    /// level's format code and [`RESET`].
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        if self.frozen {
            self.labels.get(index).map(String::as_str)
        } else {
            self.levels.get(index).map(LogLevel::name)
        }
    }

    /// Creates level `name` or updates its format and target.
    ///
    /// A new level needs a concrete format; its target defaults to standard
    /// output when omitted. For an existing level, `Keep` (or an omitted
    /// target) preserves the field and `Set` replaces it. A new target replaces
    /// the level's whole target set.
    pub fn define_or_update(
        &mut self,
        name: &str,
        format: Update<String>,
        target: Option<Update<TargetId>>,
        open: &OutputTargets,
    ) -> Result<(), UsageError> {
        self.ensure_mutable()?;
        if let Some(Update::Set(id)) = target {
            ensure_open(id, open)?;
        }

        let name = name.to_uppercase();
        if let Some(index) = self.resolve_index(&name) {
            let level = &mut self.levels[index];
            if let Update::Set(format) = format {
                level.format = format;
            }
            if let Some(Update::Set(id)) = target {
                level.targets = vec![id];
            }
            return Ok(());
        }

        let Update::Set(format) = format else {
            return Err(UsageError::KeepOnNewLevel {
                name,
                field: "format",
            });
        };
        let id = match target {
            None => TargetId::STDOUT,
            Some(Update::Set(id)) => id,
            Some(Update::Keep) => {
                return Err(UsageError::KeepOnNewLevel {
                    name,
                    field: "target",
                });
            }
        };
        self.insert_below_fatal(LogLevel::new(&name, format, &[id]));
        Ok(())
    }

    /// Routes the named levels (all levels when `levels` is empty) to `target`
    /// in addition to their current targets.
    ///
    /// Names that do not exist yet are created with an empty format code.
    pub fn add_output_target<S: AsRef<str>>(
        &mut self,
        target: TargetId,
        levels: &[S],
        open: &OutputTargets,
    ) -> Result<(), UsageError> {
        self.ensure_mutable()?;
        ensure_open(target, open)?;

        if levels.is_empty() {
            for level in &mut self.levels {
                level.add_target(target);
            }
            return Ok(());
        }

        for name in levels {
            match self.resolve_index(name.as_ref()) {
                Some(index) => self.levels[index].add_target(target),
                None => self.insert_below_fatal(LogLevel::new(name.as_ref(), "", &[target])),
            }
        }
        Ok(())
    }

    /// Validates the registry, renders labels and rejects further changes.
    ///
    /// Freezing twice is a no-op. Labels are wrapped in format codes only when
    /// `decorate` is set.
    pub fn freeze(&mut self, decorate: bool) -> Result<(), UsageError> {
        if self.frozen {
            return Ok(());
        }
        self.validate()?;

        let width = self
            .levels
            .iter()
            .map(|level| level.name.chars().count())
            .max()
            .unwrap_or(0);
        self.labels = self
            .levels
            .iter()
            .map(|level| {
                let padded = format!("{:<width$}", level.name);
                if decorate {
                    format!("{}{padded}{RESET}", level.format)
                } else {
                    padded
                }
            })
            .collect();
        self.frozen = true;
        Ok(())
    }

    fn validate(&self) -> Result<(), UsageError> {
        let Some(last) = self.levels.last() else {
            return Err(UsageError::CorruptRegistry("no levels defined".to_owned()));
        };
        if last.name != names::FATAL {
            return Err(UsageError::CorruptRegistry(format!(
                "{} must be the highest priority level, found {}",
                names::FATAL,
                last.name
            )));
        }
        for (index, level) in self.levels.iter().enumerate() {
            if level.name.is_empty() {
                return Err(UsageError::CorruptRegistry(format!(
                    "level {index} has no name"
                )));
            }
            if self.levels[..index].iter().any(|other| other.name == level.name) {
                return Err(UsageError::CorruptRegistry(format!(
                    "level {} is defined twice",
                    level.name
                )));
            }
        }
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), UsageError> {
        if self.frozen {
            Err(UsageError::Frozen)
        } else {
            Ok(())
        }
    }

    fn insert_below_fatal(&mut self, level: LogLevel) {
        let position = self
            .resolve_index(names::FATAL)
            .unwrap_or(self.levels.len());
        self.levels.insert(position, level);
    }
}

fn ensure_open(id: TargetId, open: &OutputTargets) -> Result<(), UsageError> {
    if open.contains(id) {
        Ok(())
    } else {
        Err(UsageError::TargetNotOpen(id))
    }
}

/// Expands `\e`, `\033` and `\x1b` notations into the escape character.
///
/// Format codes read from configuration text use these notations since the
/// escape character itself cannot be typed into most environments.
///
/// ```
/// assert_eq!(logging::parse_format_code(r"\e[1;31m"), "\x1b[1;31m");
/// assert_eq!(logging::parse_format_code(r"\033[0m\x1b[2m"), "\x1b[0m\x1b[2m");
/// ```
#[must_use]
pub fn parse_format_code(text: &str) -> String {
    text.replace(r"\x1b", "\x1b")
        .replace(r"\x1B", "\x1b")
        .replace(r"\033", "\x1b")
        .replace(r"\e", "\x1b")
}
