//! crates/logging/src/nesting.rs
//! Command nesting depth and the output targets suppressed while nested.

use logging_sink::TargetId;

/// Nesting bookkeeping for the command executor.
///
/// `depth` counts the command executors active around the current point,
/// including those in ancestor processes: a process starts at the depth it
/// inherited through the environment, recorded as the `baseline`. While the
/// depth is above the baseline a command is running in this process and the
/// auxiliary RUN targets captured when the outermost command started are
/// suppressed, since nested framework processes write their own records there.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NestingState {
    depth: u32,
    baseline: u32,
    skipped: Vec<TargetId>,
    sentinel_sent: bool,
}

impl NestingState {
    /// Starts at the depth inherited from an enclosing executor.
    #[must_use]
    pub const fn inherited(depth: u32) -> Self {
        Self {
            depth,
            baseline: depth,
            skipped: Vec::new(),
            sentinel_sent: false,
        }
    }

    /// Current depth.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Depth this process started at.
    #[must_use]
    pub const fn baseline(&self) -> u32 {
        self.baseline
    }

    /// Reports whether an executor in this process is running a command.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        self.depth > self.baseline
    }

    /// Enters a command and returns the depth handed to the child process.
    ///
    /// The outermost command of this process records which of `run_targets`
    /// are auxiliary (beyond standard output and error); those are suppressed
    /// until the matching [`NestingState::leave`].
    pub fn enter(&mut self, run_targets: &[TargetId]) -> u32 {
        if !self.is_nested() {
            self.skipped = run_targets
                .iter()
                .copied()
                .filter(|target| !target.is_standard())
                .collect();
        }
        self.depth = self.depth.saturating_add(1);
        self.depth
    }

    /// Leaves a command. The depth never drops below the baseline.
    pub fn leave(&mut self) {
        if self.is_nested() {
            self.depth -= 1;
        }
    }

    /// Reports whether writes to `target` are currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self, target: TargetId) -> bool {
        self.is_nested() && self.skipped.contains(&target)
    }

    /// Records that this process wrote its sentinel.
    ///
    /// Returns `false` when one was already written, in which case the caller
    /// must not write another.
    pub fn claim_sentinel(&mut self) -> bool {
        !std::mem::replace(&mut self.sentinel_sent, true)
    }

    /// Reports whether this process already wrote its sentinel.
    #[must_use]
    pub const fn sentinel_sent(&self) -> bool {
        self.sentinel_sent
    }
}
