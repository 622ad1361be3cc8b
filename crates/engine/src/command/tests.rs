use super::*;
use logging::{LogConfig, Logger};
use logging_sink::OutputTargets;
use test_support::SharedBuffer;

struct Harness {
    engine: Engine,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

fn harness(config: LogConfig) -> Harness {
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    let targets = OutputTargets::with_writers(stdout.clone(), stderr.clone());
    let logger = Logger::with_targets(config, targets)
        .expect("logger")
        .with_trace_producer(|_skip: usize| vec!["  at build::install".to_owned()]);
    let engine = Engine::new(logger)
        .with_program_name("runlog")
        .with_self_exe(None);
    Harness {
        engine,
        stdout,
        stderr,
    }
}

fn sh(script: &str) -> [&str; 3] {
    ["/bin/sh", "-c", script]
}

#[test]
fn empty_command_is_a_usage_error() {
    let mut h = harness(LogConfig::default());
    let error = h
        .engine
        .run_command::<&str>(&[])
        .expect_err("empty command");
    assert!(matches!(error, LogError::Terminate { status: 1 }));
    assert_eq!(
        h.stderr.lines()[0],
        "FATAL   no command given to run (exit status 1)"
    );
}

#[test]
fn dry_run_logs_without_running() {
    let mut h = harness(LogConfig {
        dry_run: true,
        ..LogConfig::default()
    });
    assert_eq!(h.engine.run_command(&["echo", "hi"]).expect("run"), 0);
    assert_eq!(h.stdout.lines(), vec!["RUN     echo hi"]);
    assert_eq!(h.stderr.contents(), "");
}

#[test]
fn missing_program_reports_127() {
    let mut h = harness(LogConfig::default());
    let status = h
        .engine
        .run_command(&["/nonexistent/runlog-missing"])
        .expect("run");
    assert_eq!(status, NOT_FOUND_STATUS);

    let stdout = h.stdout.lines();
    assert_eq!(stdout[0], "RUN     /nonexistent/runlog-missing");
    assert!(stdout[1].starts_with("/nonexistent/runlog-missing: "));
    assert_eq!(
        h.stderr.contents(),
        "ERROR   /nonexistent/runlog-missing (exit status 127)\n"
    );
}

#[cfg(unix)]
mod unix {
    use super::*;
    use logging::CriticalLevel;

    #[test]
    fn successful_command_relays_joined_output() {
        let mut h = harness(LogConfig::default());
        let status = h
            .engine
            .run_command(&sh("echo out; echo err >&2"))
            .expect("run");
        assert_eq!(status, 0);
        assert_eq!(
            h.stdout.lines(),
            vec!["RUN     /bin/sh -c 'echo out; echo err >&2'", "out", "err"]
        );
        assert_eq!(h.stderr.contents(), "");
    }

    #[test]
    fn failure_outside_critical_section_is_an_error() {
        let mut h = harness(LogConfig::default());
        assert_eq!(h.engine.run_command(&sh("exit 3")).expect("run"), 3);
        assert_eq!(
            h.stderr.contents(),
            "ERROR   /bin/sh -c 'exit 3' (exit status 3)\n"
        );
    }

    #[test]
    fn failure_inside_critical_section_is_fatal() {
        let mut h = harness(LogConfig::default());
        let error = {
            let mut section = h.engine.critical_section(None).expect("begin");
            section.run_command(&sh("exit 4")).expect_err("fatal")
        };
        assert!(matches!(error, LogError::Terminate { status: 4 }));
        assert_eq!(h.engine.critical_depth(), 0);
        assert_eq!(
            h.stderr.lines(),
            vec![
                "FATAL   /bin/sh -c 'exit 4' (exit status 4)",
                "  at build::install",
            ]
        );
    }

    #[test]
    fn quit_section_escalates_without_trace() {
        let mut h = harness(LogConfig::default());
        h.engine.begin_critical_section(Some("quit")).expect("begin");
        h.engine.begin_critical_section(Some("FATAL")).expect("begin");
        let error = h.engine.run_command(&sh("exit 2")).expect_err("quit");
        assert_eq!(error.exit_status(), 2);
        assert_eq!(
            h.stderr.contents(),
            "QUIT    /bin/sh -c 'exit 2' (exit status 2)\n"
        );
    }

    #[test]
    fn configured_default_applies_to_sections() {
        let mut h = harness(LogConfig {
            critical_default: CriticalLevel::Quit,
            ..LogConfig::default()
        });
        h.engine.begin_critical_section(None).expect("begin");
        assert_eq!(h.engine.critical_level(), Some(CriticalLevel::Quit));
        h.engine.end_critical_section();
        assert_eq!(h.engine.critical_level(), None);
    }

    #[test]
    fn invalid_section_level_is_a_usage_error() {
        let mut h = harness(LogConfig::default());
        let error = h
            .engine
            .begin_critical_section(Some("ERROR"))
            .expect_err("usage");
        assert!(matches!(error, LogError::Terminate { status: 1 }));
        assert_eq!(h.engine.critical_depth(), 0);
        assert!(h.stderr.lines()[0].starts_with("FATAL   critical section level must be"));
    }

    #[test]
    fn fatal_sentinel_terminates_silently_at_top_level() {
        let mut h = harness(LogConfig::default());
        let error = h
            .engine
            .run_command(&sh("echo working; echo '@runlog.command fatal:6' >&2; exit 6"))
            .expect_err("already fatal");
        assert!(matches!(error, LogError::Terminate { status: 6 }));
        assert_eq!(h.stdout.lines()[1..], ["working"]);
        assert_eq!(h.stderr.contents(), "");
    }

    #[test]
    fn fatal_sentinel_is_forwarded_when_nested() {
        let mut h = harness(LogConfig {
            nesting_level: 1,
            ..LogConfig::default()
        });
        let error = h
            .engine
            .run_command(&sh("echo '@runlog.command fatal:6' >&2; exit 6"))
            .expect_err("already fatal");
        assert_eq!(error.exit_status(), 6);
        assert_eq!(h.stderr.contents(), "@runlog.command fatal:6\n");
        assert!(!h.stdout.contents().contains("@runlog.command"));
    }

    #[test]
    fn fatal_sentinel_bypasses_critical_sections() {
        let mut h = harness(LogConfig::default());
        h.engine.begin_critical_section(None).expect("begin");
        let error = h
            .engine
            .run_command(&sh("echo '@runlog.command fatal:9'; exit 9"))
            .expect_err("already fatal");
        assert_eq!(error.exit_status(), 9);
        assert!(!h.stderr.contents().contains("FATAL"));
    }

    #[test]
    fn exit_sentinel_supplies_status_of_clean_exit() {
        let mut h = harness(LogConfig::default());
        let status = h
            .engine
            .run_command(&sh("echo '@runlog.command exit:5'"))
            .expect("run");
        assert_eq!(status, 5);
        assert_eq!(h.stdout.lines().len(), 1);
    }

    #[test]
    fn sentinel_followed_by_output_is_relayed() {
        let mut h = harness(LogConfig::default());
        let status = h
            .engine
            .run_command(&sh("echo '@runlog.command fatal:2'; echo done"))
            .expect("run");
        assert_eq!(status, 0);
        assert_eq!(
            h.stdout.lines()[1..],
            ["@runlog.command fatal:2", "done"]
        );
    }

    #[test]
    fn child_receives_nesting_level_and_configuration() {
        let mut h = harness(LogConfig {
            nesting_level: 2,
            level_filter: "INFO".into(),
            ..LogConfig::default()
        });
        h.engine
            .run_command(&sh(
                "echo $RUNLOG_COMMAND_NESTING_LEVEL $RUNLOG_LEVEL_FILTER $RUNLOG_DRY_RUN",
            ))
            .expect("run");
        assert_eq!(h.stdout.lines()[1], "3 INFO 0");
    }

    #[test]
    fn depth_returns_to_baseline_after_each_command() {
        let mut h = harness(LogConfig::default());
        h.engine.run_command(&sh("exit 1")).expect("run");
        h.engine.run_command(&sh("true")).expect("run");
        assert_eq!(h.engine.logger().nesting().depth(), 0);
    }

    #[test]
    fn auxiliary_run_targets_skip_relayed_output() {
        let mut h = harness(LogConfig::default());
        let file = SharedBuffer::new();
        let id = h.engine.logger_mut().targets_mut().push(file.clone(), false);
        h.engine
            .logger_mut()
            .add_output_target(id, &["RUN"])
            .expect("route");

        h.engine.run_command(&sh("echo relayed")).expect("run");
        assert_eq!(file.lines(), vec!["RUN     /bin/sh -c 'echo relayed'"]);
        assert_eq!(h.stdout.lines()[1], "relayed");
    }

    #[test]
    fn escapes_are_stripped_from_relayed_output() {
        let mut h = harness(LogConfig::default());
        h.engine
            .run_command(&sh("printf '\\033[31mred\\033[0m\\r\\n'"))
            .expect("run");
        assert_eq!(h.stdout.lines()[1], "red");
    }

    #[test]
    fn forced_formatting_keeps_escapes_in_relayed_output() {
        let mut h = harness(LogConfig {
            formatting: true,
            ..LogConfig::default()
        });
        h.engine
            .run_command(&sh("printf '\\033[31mred\\033[0m\\r\\n'"))
            .expect("run");
        let lines = h.stdout.lines();
        assert_eq!(lines[1], "\x1b[31mred\x1b[0m\x1b[0m");
        assert!(lines[0].ends_with("\x1b[0m"), "RUN record: {:?}", lines[0]);
    }

    #[test]
    fn self_invocation_shows_program_name() {
        let stdout = SharedBuffer::new();
        let targets = OutputTargets::with_writers(stdout.clone(), SharedBuffer::new());
        let logger = Logger::with_targets(LogConfig::default(), targets).expect("logger");
        let mut engine = Engine::new(logger)
            .with_program_name("deploy")
            .with_self_exe(Some("/bin/sh".into()));
        engine.run_command(&sh("true")).expect("run");
        assert_eq!(stdout.lines(), vec!["RUN     deploy -c true"]);
    }
}
