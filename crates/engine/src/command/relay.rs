//! Spawning a command with its standard output and error joined on one pipe,
//! drained line by line on a dedicated reader thread.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use logging::protocol::MAX_EXIT_STATUS;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Exit status reported when the program does not exist.
pub const NOT_FOUND_STATUS: i32 = 127;

/// Exit status reported when the program exists but cannot be started.
pub const NOT_EXECUTABLE_STATUS: i32 = 126;

/// Messages sent from the reader thread to the executor.
#[derive(Debug)]
pub enum RelayMessage {
    /// One line of output without its terminator.
    Line(String),
    /// Reading the pipe failed.
    Error(io::Error),
    /// The pipe reached end of file.
    Finished,
}

/// A spawned command whose output is being drained.
#[derive(Debug)]
pub struct RunningCommand {
    child: Child,
    receiver: Receiver<RelayMessage>,
    reader: Option<JoinHandle<()>>,
}

impl RunningCommand {
    /// Spawns `command` with standard output and error joined.
    ///
    /// The command is consumed so its copies of the pipe's write end are
    /// closed once the child holds them; otherwise the reader would never see
    /// end of file.
    pub fn spawn(mut command: Command) -> io::Result<Self> {
        let (reader, writer) = io::pipe()?;
        command.stdout(writer.try_clone()?);
        command.stderr(writer);
        command.stdin(Stdio::inherit());

        let child = command.spawn();
        drop(command);
        let child = child?;

        let (sender, receiver) = mpsc::channel();
        let reader = thread::spawn(move || read_lines(reader, &sender));

        Ok(Self {
            child,
            receiver,
            reader: Some(reader),
        })
    }

    /// Waits for the next message. Returns `None` once output is exhausted.
    pub fn next_message(&self) -> Option<RelayMessage> {
        match self.receiver.recv() {
            Ok(RelayMessage::Finished) | Err(_) => None,
            Ok(message) => Some(message),
        }
    }

    /// Joins the reader thread and waits for the child to exit.
    ///
    /// Call only after [`RunningCommand::next_message`] returned `None`.
    pub fn wait(mut self) -> io::Result<i32> {
        self.join_reader();
        let status = self.child.wait()?;
        Ok(exit_status_code(status))
    }

    /// Kills the child and reclaims its resources.
    pub fn terminate(mut self) {
        // The child may have exited already; the remaining cleanup still applies.
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.join_reader();
    }

    fn join_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn read_lines<R: Read>(reader: R, sender: &Sender<RelayMessage>) {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                if buffer.last() == Some(&b'\n') {
                    buffer.pop();
                }
                let line = String::from_utf8_lossy(&buffer).into_owned();
                if sender.send(RelayMessage::Line(line)).is_err() {
                    return;
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                let _ = sender.send(RelayMessage::Error(error));
                return;
            }
        }
    }
    let _ = sender.send(RelayMessage::Finished);
}

/// Maps a process exit status to a shell-style code: signals become 128 + N.
pub fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        if let Some(signal) = status.signal() {
            return (128 + signal).min(MAX_EXIT_STATUS);
        }
    }
    MAX_EXIT_STATUS
}

/// Status reported for a command that could not be spawned.
pub fn spawn_failure_status(error: &io::Error) -> i32 {
    if error.kind() == io::ErrorKind::NotFound {
        NOT_FOUND_STATUS
    } else {
        NOT_EXECUTABLE_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(running: &RunningCommand) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(message) = running.next_message() {
            match message {
                RelayMessage::Line(line) => lines.push(line),
                RelayMessage::Error(error) => panic!("read failed: {error}"),
                RelayMessage::Finished => unreachable!(),
            }
        }
        lines
    }

    #[test]
    fn reader_splits_lines_and_keeps_partial_tail() {
        let (sender, receiver) = mpsc::channel();
        read_lines(&b"one\ntwo\r\nthree"[..], &sender);
        let messages: Vec<_> = receiver.try_iter().collect();
        assert_eq!(messages.len(), 4);
        assert!(matches!(&messages[0], RelayMessage::Line(line) if line == "one"));
        assert!(matches!(&messages[1], RelayMessage::Line(line) if line == "two\r"));
        assert!(matches!(&messages[2], RelayMessage::Line(line) if line == "three"));
        assert!(matches!(messages[3], RelayMessage::Finished));
    }

    #[test]
    fn reader_replaces_invalid_utf8() {
        let (sender, receiver) = mpsc::channel();
        read_lines(&b"caf\xe9\n"[..], &sender);
        assert!(matches!(
            receiver.recv(),
            Ok(RelayMessage::Line(line)) if line == "caf\u{fffd}"
        ));
    }

    #[test]
    fn spawn_failures_map_to_shell_statuses() {
        let missing = io::Error::from(io::ErrorKind::NotFound);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(spawn_failure_status(&missing), 127);
        assert_eq!(spawn_failure_status(&denied), 126);
    }

    #[cfg(unix)]
    #[test]
    fn stdout_and_stderr_arrive_in_order() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "echo out; echo err >&2; echo again"]);
        let running = RunningCommand::spawn(command).expect("spawn");
        let lines = drain(&running);
        assert_eq!(running.wait().expect("wait"), 0);
        assert_eq!(lines, vec!["out", "err", "again"]);
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_and_signals_are_reported() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "exit 7"]);
        let running = RunningCommand::spawn(command).expect("spawn");
        assert!(drain(&running).is_empty());
        assert_eq!(running.wait().expect("wait"), 7);

        let mut command = Command::new("/bin/sh");
        command.args(["-c", "kill -TERM $$"]);
        let running = RunningCommand::spawn(command).expect("spawn");
        drain(&running);
        assert_eq!(running.wait().expect("wait"), 128 + 15);
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let command = Command::new("/nonexistent/runlog-test-program");
        let error = RunningCommand::spawn(command).expect_err("missing program");
        assert_eq!(spawn_failure_status(&error), NOT_FOUND_STATUS);
    }
}
