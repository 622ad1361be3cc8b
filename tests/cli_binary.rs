//! End-to-end tests for the `runlog` binary, including chains of nested
//! invocations communicating through the environment and the sentinel line.

use assert_cmd::Command;
use logging::vars;
use predicates::prelude::*;

const RUNLOG: &str = env!("CARGO_BIN_EXE_runlog");

/// Builds a `runlog` invocation isolated from the caller's configuration.
fn runlog() -> Command {
    let mut command = Command::new(RUNLOG);
    for var in [
        vars::TIMESTAMP_FORMAT,
        vars::LEVEL_FILTER,
        vars::CONSOLE_FILTER,
        vars::FORMATTING,
        vars::DRY_RUN,
        vars::CRITICAL_SECTION_DEFAULT,
        vars::LOG_FILE,
        vars::LOG_FILE_LEVELS,
        vars::COMMAND_NESTING_LEVEL,
        "RUNLOG_TRACE",
    ] {
        command.env_remove(var);
    }
    command
}

fn combined(output: &std::process::Output) -> String {
    let mut data = output.stdout.clone();
    data.extend_from_slice(&output.stderr);
    String::from_utf8(data).expect("output should be valid UTF-8")
}

#[test]
fn help_lists_usage() {
    runlog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: runlog"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    runlog().assert().code(1);
}

#[test]
fn log_writes_to_the_level_target() {
    runlog()
        .args(["log", "SUCCESS", "shipped"])
        .assert()
        .success()
        .stdout("SUCCESS shipped\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn formatting_is_stripped_unless_forced() {
    runlog()
        .args(["log", "SUCCESS", "plain"])
        .assert()
        .stdout(predicate::str::contains("\x1b").not());

    runlog()
        .args(["--formatting", "log", "SUCCESS", "colored"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\x1b[1;32mSUCCESS\x1b[0m colored\x1b[0m\n"));
}

#[test]
fn dry_run_does_not_execute() {
    runlog()
        .args(["-n", "run", "--", "echo", "hi"])
        .assert()
        .success()
        .stdout("RUN     echo hi\n");
}

#[test]
fn dry_run_from_environment() {
    runlog()
        .env(vars::DRY_RUN, "yes")
        .args(["run", "--", "echo", "hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi\n").count(1));
}

#[test]
fn negative_fatal_status_is_not_success() {
    runlog()
        .args(["log", "FATAL", "--", "-3", "boom"])
        .assert()
        .code(253)
        .stderr(predicate::str::starts_with("FATAL   boom (exit status -3)\n"));
}

#[cfg(unix)]
mod unix {
    use super::*;

    #[test]
    fn exit_status_propagates() {
        runlog()
            .args(["run", "--", "sh", "-c", "echo working; exit 7"])
            .assert()
            .code(7)
            .stdout("RUN     sh -c 'echo working; exit 7'\nworking\n")
            .stderr("ERROR   sh -c 'echo working; exit 7' (exit status 7)\n");
    }

    #[test]
    fn signals_map_to_shell_statuses() {
        runlog()
            .args(["run", "--", "sh", "-c", "kill -TERM $$"])
            .assert()
            .code(143);
    }

    #[test]
    fn missing_program_exits_127() {
        runlog()
            .args(["run", "--", "/nonexistent/runlog-missing"])
            .assert()
            .code(127);
    }

    #[test]
    fn three_level_chain_reports_one_fatal() {
        let output = runlog()
            .args([
                "run", "--", RUNLOG, "run", "--", RUNLOG, "run", "--critical", "--", "sh", "-c",
                "exit 3",
            ])
            .output()
            .expect("run chain");

        assert_eq!(output.status.code(), Some(3));
        let text = combined(&output);
        let fatal_records = text.lines().filter(|line| line.starts_with("FATAL")).count();
        assert_eq!(fatal_records, 1, "output was:\n{text}");
        assert!(!text.contains("@runlog.command"), "sentinel leaked:\n{text}");
        assert!(
            !text.lines().any(|line| line.starts_with("ERROR")),
            "failure reported twice:\n{text}"
        );
        assert_eq!(
            text.lines().filter(|line| line.starts_with("RUN")).count(),
            3
        );
    }

    #[test]
    fn nested_negative_fatal_status_propagates_once() {
        let output = runlog()
            .args(["run", "--", RUNLOG, "log", "FATAL", "--", "-3", "boom"])
            .output()
            .expect("run chain");

        assert_eq!(output.status.code(), Some(253));
        let text = combined(&output);
        assert_eq!(
            text.lines().filter(|line| line.starts_with("FATAL")).count(),
            1,
            "output was:\n{text}"
        );
        assert!(!text.contains("@runlog.command"), "sentinel leaked:\n{text}");
        assert!(!text.lines().any(|line| line.starts_with("ERROR")));
    }

    #[test]
    fn chain_without_critical_section_reports_each_level() {
        let output = runlog()
            .args(["run", "--", RUNLOG, "run", "--", "sh", "-c", "exit 2"])
            .output()
            .expect("run chain");

        assert_eq!(output.status.code(), Some(2));
        let text = combined(&output);
        assert_eq!(
            text.lines().filter(|line| line.starts_with("ERROR")).count(),
            2,
            "output was:\n{text}"
        );
        assert!(!text.contains("@runlog.command"));
    }

    #[test]
    fn critical_section_escalates_in_parent_of_plain_failure() {
        let output = runlog()
            .args(["run", "--critical", "--", RUNLOG, "run", "--", "sh", "-c", "exit 4"])
            .output()
            .expect("run chain");

        assert_eq!(output.status.code(), Some(4));
        let text = combined(&output);
        assert_eq!(
            text.lines().filter(|line| line.starts_with("ERROR")).count(),
            1
        );
        assert_eq!(
            text.lines().filter(|line| line.starts_with("FATAL")).count(),
            1
        );
    }

    #[test]
    fn nested_invocation_shows_program_name() {
        runlog()
            .args(["run", "--", RUNLOG, "log", "SUCCESS", "built"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("RUN     runlog log SUCCESS built\n"));
    }

    #[test]
    fn nested_records_reach_the_log_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.log");

        runlog()
            .arg("--log-file")
            .arg(&path)
            .args(["run", "--", RUNLOG, "log", "SUCCESS", "built"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("SUCCESS built\n"));

        let log = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2, "log was:\n{log}");
        assert!(lines[0].starts_with("RUN"));
        assert_eq!(lines[1], "SUCCESS built");
    }

    #[test]
    fn timestamps_follow_the_configured_format() {
        runlog()
            .args(["--timestamp-format", "[year]", "log", "SUCCESS", "dated"])
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"^\d{4} SUCCESS dated\n$").expect("regex"));
    }
}
