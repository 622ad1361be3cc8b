//! crates/engine/src/command/mod.rs
//!
//! Command execution: render and log the command line, run the program with
//! its output relayed through the logger, decode the sentinel a nested
//! `runlog` leaves on its last line and escalate failures.

mod display;
mod relay;

use std::ffi::OsStr;
use std::process::Command;

#[cfg(feature = "tracing")]
use tracing::instrument;

use logging::protocol::SentinelTracker;
use logging::{LogError, UsageError, names, vars};

pub use display::render_command;
pub use relay::{NOT_EXECUTABLE_STATUS, NOT_FOUND_STATUS, exit_status_code};

use relay::{RelayMessage, RunningCommand, spawn_failure_status};

use crate::Engine;

impl Engine {
    /// Runs `command`, relaying its output, and returns its exit status.
    ///
    /// The command line is logged at RUN first; under dry-run nothing else
    /// happens and `Ok(0)` is returned. Standard output and standard error of
    /// the child are joined and relayed line by line to the RUN targets. A
    /// failure is logged at ERROR and its status returned, unless a critical
    /// section is open, in which case the latched QUIT or FATAL level
    /// terminates. A child that already reported a fatal failure terminates
    /// this process with the same status and no further message.
    ///
    /// # Errors
    ///
    /// [`LogError::Terminate`] when the failure must end the process, usage
    /// errors (an empty command) included. [`LogError::Io`] when relaying
    /// output fails.
    #[cfg_attr(
        feature = "tracing",
        instrument(skip(self, command), fields(args = command.len()), name = "run_command")
    )]
    pub fn run_command<S: AsRef<OsStr>>(&mut self, command: &[S]) -> Result<i32, LogError> {
        let Some((program, args)) = command.split_first() else {
            return Err(self.logger.report_usage(UsageError::EmptyCommand));
        };

        let display = render_command(command, self.self_exe.as_deref(), &self.program_name);
        self.logger.emit(names::RUN, &[display.as_str()])?;
        if self.logger.config().dry_run {
            return Ok(0);
        }

        let depth = self.logger.enter_command();
        let outcome = self.execute(program.as_ref(), args, depth);
        self.logger.leave_command();
        let (process_status, tracker) = outcome?;

        let status = if process_status != 0 {
            process_status
        } else {
            tracker.status()
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(status, already_fatal = tracker.already_fatal(), "command finished");

        if status == 0 {
            return Ok(0);
        }
        if tracker.already_fatal() {
            self.logger.propagate_fatal(status)?;
            return Err(LogError::Terminate { status });
        }

        let status_text = status.to_string();
        let level = self
            .critical
            .active_level()
            .map_or(names::ERROR, |level| level.as_str());
        self.logger
            .emit(level, &[status_text.as_str(), display.as_str()])
    }

    fn execute<S: AsRef<OsStr>>(
        &mut self,
        program: &OsStr,
        args: &[S],
        depth: u32,
    ) -> Result<(i32, SentinelTracker), LogError> {
        let mut tracker = SentinelTracker::new();

        let mut child = Command::new(program);
        child.args(args);
        child.envs(self.logger.config().env_pairs());
        if self.logger.targets().any_terminal() {
            child.env(vars::FORMATTING, "1");
        }
        child.env(vars::COMMAND_NESTING_LEVEL, depth.to_string());

        let running = match RunningCommand::spawn(child) {
            Ok(running) => running,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%error, "spawn failed");
                let line = format!("{}: {error}", program.to_string_lossy());
                self.logger.relay(&line)?;
                return Ok((spawn_failure_status(&error), tracker));
            }
        };

        while let Some(message) = running.next_message() {
            let result = match message {
                RelayMessage::Line(line) => {
                    let line = line.trim_end_matches('\r');
                    if tracker.observe(line) {
                        Ok(())
                    } else {
                        self.logger.relay(line)
                    }
                }
                RelayMessage::Error(error) => Err(LogError::Io(error)),
                RelayMessage::Finished => Ok(()),
            };
            if let Err(error) = result {
                running.terminate();
                return Err(error);
            }
        }

        let status = running.wait()?;
        Ok((status, tracker))
    }
}

#[cfg(test)]
mod tests;
