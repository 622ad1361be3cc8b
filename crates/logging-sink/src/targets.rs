use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use is_terminal::IsTerminal;

use crate::escapes::{RESET, strip_escapes};
use crate::target::TargetId;

/// A single writable output target.
pub struct OutputTarget {
    writer: Box<dyn Write + Send>,
    terminal: bool,
    path: Option<PathBuf>,
}

impl OutputTarget {
    /// Wraps an arbitrary writer.
    pub fn new<W>(writer: W, terminal: bool) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            writer: Box::new(writer),
            terminal,
            path: None,
        }
    }

    /// Reports whether the target is attached to a terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Returns the file path backing the target, if it was opened from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputTarget")
            .field("terminal", &self.terminal)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Table of open output targets keyed by descriptor number.
///
/// The table always starts with standard output and standard error. Log files
/// opened with [`OutputTargets::open_file`] receive the next free id.
#[derive(Debug)]
pub struct OutputTargets {
    targets: BTreeMap<TargetId, OutputTarget>,
}

impl OutputTargets {
    /// Builds a table over the process's standard streams.
    ///
    /// Terminal detection runs once, here.
    #[must_use]
    pub fn standard() -> Self {
        let stdout_terminal = io::stdout().is_terminal();
        let stderr_terminal = io::stderr().is_terminal();
        let mut targets = BTreeMap::new();
        targets.insert(
            TargetId::STDOUT,
            OutputTarget::new(io::stdout(), stdout_terminal),
        );
        targets.insert(
            TargetId::STDERR,
            OutputTarget::new(io::stderr(), stderr_terminal),
        );
        Self { targets }
    }

    /// Builds a table whose standard streams are the provided writers.
    ///
    /// Neither writer is treated as a terminal; use
    /// [`OutputTargets::set_terminal`] to change that.
    pub fn with_writers<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        let mut targets = BTreeMap::new();
        targets.insert(TargetId::STDOUT, OutputTarget::new(stdout, false));
        targets.insert(TargetId::STDERR, OutputTarget::new(stderr, false));
        Self { targets }
    }

    /// Installs `target` under `id`, replacing any previous target.
    pub fn insert(&mut self, id: TargetId, target: OutputTarget) -> Option<OutputTarget> {
        self.targets.insert(id, target)
    }

    /// Installs `writer` under the next free id and returns that id.
    pub fn push<W>(&mut self, writer: W, terminal: bool) -> TargetId
    where
        W: Write + Send + 'static,
    {
        let id = self.next_id();
        self.targets.insert(id, OutputTarget::new(writer, terminal));
        id
    }

    /// Opens `path` for appending (creating it if needed) as a new target.
    ///
    /// Files are never considered terminals.
    pub fn open_file(&mut self, path: &Path) -> io::Result<TargetId> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let id = self.next_id();
        let mut target = OutputTarget::new(file, false);
        target.path = Some(path.to_path_buf());
        self.targets.insert(id, target);
        Ok(id)
    }

    /// Overrides the terminal flag of an open target.
    pub fn set_terminal(&mut self, id: TargetId, terminal: bool) {
        if let Some(target) = self.targets.get_mut(&id) {
            target.terminal = terminal;
        }
    }

    /// Reports whether `id` refers to an open target.
    #[must_use]
    pub fn contains(&self, id: TargetId) -> bool {
        self.targets.contains_key(&id)
    }

    /// Returns the target registered under `id`.
    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&OutputTarget> {
        self.targets.get(&id)
    }

    /// Reports whether `id` is attached to a terminal. Unknown ids are not.
    #[must_use]
    pub fn is_terminal(&self, id: TargetId) -> bool {
        self.targets.get(&id).is_some_and(OutputTarget::is_terminal)
    }

    /// Reports whether `id` is a console target: a standard stream or a terminal.
    #[must_use]
    pub fn is_console(&self, id: TargetId) -> bool {
        id.is_standard() || self.is_terminal(id)
    }

    /// Reports whether any open target is a terminal.
    #[must_use]
    pub fn any_terminal(&self) -> bool {
        self.targets.values().any(OutputTarget::is_terminal)
    }

    /// Iterates the open ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.targets.keys().copied()
    }

    /// Writes one line of `text` to `id` and flushes it.
    ///
    /// Terminals, or any target when `force_formatting` is set, receive `text`
    /// verbatim followed by [`RESET`]. Other targets receive `text` with escape
    /// sequences stripped. Writing to an id that is not open is an error of
    /// kind [`io::ErrorKind::NotFound`].
    pub fn write_line(
        &mut self,
        id: TargetId,
        text: &str,
        force_formatting: bool,
    ) -> io::Result<()> {
        let target = self.target_mut(id)?;

        let mut line = if force_formatting || target.terminal {
            let mut decorated = String::with_capacity(text.len() + RESET.len() + 1);
            decorated.push_str(text);
            decorated.push_str(RESET);
            decorated
        } else {
            strip_escapes(text).into_owned()
        };
        line.push('\n');

        target.writer.write_all(line.as_bytes())?;
        target.writer.flush()
    }

    /// Writes `text` and a newline to `id` without any decoration or stripping.
    pub fn write_raw(&mut self, id: TargetId, text: &str) -> io::Result<()> {
        let target = self.target_mut(id)?;
        target.writer.write_all(text.as_bytes())?;
        target.writer.write_all(b"\n")?;
        target.writer.flush()
    }

    /// Flushes every open target.
    pub fn flush_all(&mut self) -> io::Result<()> {
        for target in self.targets.values_mut() {
            target.writer.flush()?;
        }
        Ok(())
    }

    fn target_mut(&mut self, id: TargetId) -> io::Result<&mut OutputTarget> {
        self.targets.get_mut(&id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("output target {id} is not open"),
            )
        })
    }

    fn next_id(&self) -> TargetId {
        self.targets
            .keys()
            .next_back()
            .map_or(TargetId::FIRST_AUXILIARY, |last| {
                last.next().max(TargetId::FIRST_AUXILIARY)
            })
    }
}

#[cfg(test)]
mod tests;
