//! crates/engine/src/critical.rs
//! Critical sections that escalate command failures to QUIT or FATAL.

use std::ops::{Deref, DerefMut};

use logging::CriticalLevel;

use crate::Engine;

/// Nesting counter for critical sections.
///
/// The outermost [`CriticalSections::begin`] latches the escalation level for
/// the whole region; inner sections only deepen it. An unmatched
/// [`CriticalSections::end`] is ignored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CriticalSections {
    depth: u32,
    level: CriticalLevel,
    default: CriticalLevel,
}

impl CriticalSections {
    /// Creates a tracker whose sections default to `default`.
    #[must_use]
    pub const fn new(default: CriticalLevel) -> Self {
        Self {
            depth: 0,
            level: default,
            default,
        }
    }

    /// Opens a section. `level` only matters for the outermost section.
    pub fn begin(&mut self, level: Option<CriticalLevel>) {
        if self.depth == 0 {
            self.level = level.unwrap_or(self.default);
        }
        self.depth = self.depth.saturating_add(1);
    }

    /// Closes the innermost section, if any.
    pub fn end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Number of open sections.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Latched level while a section is open.
    #[must_use]
    pub const fn active_level(&self) -> Option<CriticalLevel> {
        if self.depth > 0 {
            Some(self.level)
        } else {
            None
        }
    }
}

impl Default for CriticalSections {
    fn default() -> Self {
        Self::new(CriticalLevel::Fatal)
    }
}

/// RAII guard that closes a critical section when dropped.
///
/// Created by [`Engine::critical_section`]. The guard dereferences to the
/// [`Engine`] so commands can run through it while the section is open.
///
/// ```no_run
/// use engine::Engine;
/// use logging::{LogConfig, Logger};
///
/// let logger = Logger::new(LogConfig::default())?;
/// let mut engine = Engine::new(logger);
/// {
///     let mut section = engine.critical_section(None)?;
///     section.run_command(&["make", "install"])?;
/// }
/// assert_eq!(engine.critical_depth(), 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use = "dropping the guard immediately closes the critical section"]
pub struct CriticalSectionGuard<'a> {
    engine: &'a mut Engine,
}

impl<'a> CriticalSectionGuard<'a> {
    pub(crate) const fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }
}

impl Drop for CriticalSectionGuard<'_> {
    fn drop(&mut self) {
        self.engine.end_critical_section();
    }
}

impl Deref for CriticalSectionGuard<'_> {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &*self.engine
    }
}

impl DerefMut for CriticalSectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_tracker_has_no_level() {
        let sections = CriticalSections::default();
        assert_eq!(sections.depth(), 0);
        assert_eq!(sections.active_level(), None);
    }

    #[test]
    fn outermost_begin_latches_level() {
        let mut sections = CriticalSections::new(CriticalLevel::Fatal);
        sections.begin(Some(CriticalLevel::Quit));
        sections.begin(Some(CriticalLevel::Fatal));
        assert_eq!(sections.depth(), 2);
        assert_eq!(sections.active_level(), Some(CriticalLevel::Quit));

        sections.end();
        assert_eq!(sections.active_level(), Some(CriticalLevel::Quit));
        sections.end();
        assert_eq!(sections.active_level(), None);
    }

    #[test]
    fn begin_without_level_uses_default() {
        let mut sections = CriticalSections::new(CriticalLevel::Quit);
        sections.begin(None);
        assert_eq!(sections.active_level(), Some(CriticalLevel::Quit));
    }

    #[test]
    fn relatching_after_close() {
        let mut sections = CriticalSections::default();
        sections.begin(Some(CriticalLevel::Quit));
        sections.end();
        sections.begin(None);
        assert_eq!(sections.active_level(), Some(CriticalLevel::Fatal));
    }

    #[test]
    fn unmatched_end_is_ignored() {
        let mut sections = CriticalSections::default();
        sections.end();
        sections.end();
        assert_eq!(sections.depth(), 0);
        sections.begin(None);
        assert_eq!(sections.depth(), 1);
    }
}
