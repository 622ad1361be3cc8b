use super::*;
use test_support::SharedBuffer;

fn buffered() -> (OutputTargets, SharedBuffer, SharedBuffer) {
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    let targets = OutputTargets::with_writers(stdout.clone(), stderr.clone());
    (targets, stdout, stderr)
}

#[test]
fn standard_streams_are_open_and_console() {
    let (targets, _, _) = buffered();
    assert!(targets.contains(TargetId::STDOUT));
    assert!(targets.contains(TargetId::STDERR));
    assert!(targets.is_console(TargetId::STDOUT));
    assert!(targets.is_console(TargetId::STDERR));
    assert!(!targets.any_terminal());
}

#[test]
fn non_terminal_lines_are_stripped() {
    let (mut targets, stdout, _) = buffered();
    targets
        .write_line(TargetId::STDOUT, "\x1b[1m\x1b[36mINFO\x1b[0m hello", false)
        .expect("write succeeds");
    assert_eq!(stdout.contents(), "INFO hello\n");
}

#[test]
fn terminal_lines_keep_escapes_and_end_with_reset() {
    let (mut targets, _, stderr) = buffered();
    targets.set_terminal(TargetId::STDERR, true);
    targets
        .write_line(TargetId::STDERR, "\x1b[31mboom", false)
        .expect("write succeeds");
    assert_eq!(stderr.contents(), "\x1b[31mboom\x1b[0m\n");
    assert!(targets.any_terminal());
}

#[test]
fn forced_formatting_decorates_non_terminals() {
    let (mut targets, stdout, _) = buffered();
    targets
        .write_line(TargetId::STDOUT, "\x1b[32mok", true)
        .expect("write succeeds");
    assert_eq!(stdout.contents(), "\x1b[32mok\x1b[0m\n");
}

#[test]
fn writing_to_unknown_target_fails() {
    let (mut targets, _, _) = buffered();
    let missing = TargetId::new(9).expect("nonzero");
    let error = targets
        .write_line(missing, "lost", false)
        .expect_err("target is not open");
    assert_eq!(error.kind(), io::ErrorKind::NotFound);
}

#[test]
fn pushed_targets_receive_ids_from_three() {
    let (mut targets, _, _) = buffered();
    let first = targets.push(SharedBuffer::new(), false);
    let second = targets.push(SharedBuffer::new(), true);
    assert_eq!(first.get(), 3);
    assert_eq!(second.get(), 4);
    assert!(!targets.is_console(first));
    assert!(targets.is_console(second));
    assert_eq!(
        targets.ids().map(TargetId::get).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[test]
fn open_file_appends_plain_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run.log");
    std::fs::write(&path, "existing\n").expect("seed file");

    let (mut targets, _, _) = buffered();
    let id = targets.open_file(&path).expect("open log file");
    assert_eq!(id, TargetId::FIRST_AUXILIARY);
    assert_eq!(targets.get(id).and_then(OutputTarget::path), Some(path.as_path()));

    targets
        .write_line(id, "\x1b[35mRUN\x1b[0m make", false)
        .expect("write succeeds");
    let contents = std::fs::read_to_string(&path).expect("read log file");
    assert_eq!(contents, "existing\nRUN make\n");
}

#[test]
fn open_file_reports_missing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut targets, _, _) = buffered();
    assert!(targets.open_file(&dir.path().join("missing/run.log")).is_err());
}

#[test]
fn raw_lines_are_untouched() {
    let (mut targets, _, stderr) = buffered();
    targets
        .write_raw(TargetId::STDERR, "\x1b[0mmarker exit:3")
        .expect("write succeeds");
    assert_eq!(stderr.contents(), "\x1b[0mmarker exit:3\n");
}
