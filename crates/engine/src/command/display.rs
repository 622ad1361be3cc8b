//! Human-readable rendering of command lines for RUN records.

use std::ffi::OsStr;
use std::path::Path;

/// Renders `command` as a shell-style argument vector.
///
/// Arguments containing characters outside a conservative safe set are single
/// quoted. When the program is `self_exe`, the framework's own executable, it
/// is shown as `program_name` instead of its path.
pub fn render_command<S: AsRef<OsStr>>(
    command: &[S],
    self_exe: Option<&Path>,
    program_name: &str,
) -> String {
    let mut rendered = Vec::with_capacity(command.len());
    for (index, arg) in command.iter().enumerate() {
        let arg = arg.as_ref();
        if index == 0 && self_exe.is_some_and(|exe| is_self_invocation(arg, exe)) {
            rendered.push(quote(program_name));
        } else {
            rendered.push(quote(&arg.to_string_lossy()));
        }
    }
    rendered.join(" ")
}

fn is_self_invocation(program: &OsStr, self_exe: &Path) -> bool {
    let program = Path::new(program);
    if program == self_exe {
        return true;
    }
    if program.components().count() == 1 {
        return self_exe.file_name() == Some(program.as_os_str());
    }
    match (program.canonicalize(), self_exe.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "_@%+=:,./-".contains(ch));
    if safe {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
