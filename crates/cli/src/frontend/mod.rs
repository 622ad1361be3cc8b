//! Front-end pipeline: parse arguments, load configuration, drive the engine.

mod arguments;

use std::ffi::OsString;
use std::fmt::Display;
use std::io::Write;

use engine::Engine;
use logging::{LogConfig, LogError, Logger, names};
use logging_sink::OutputTargets;

pub use arguments::clap_command;

use arguments::{Action, ParsedArgs, parse_args};

/// Status for invocations the argument parser rejects.
const USAGE_STATUS: i32 = 1;

pub(crate) fn run<I, S, F>(
    arguments: I,
    lookup: F,
    targets: OutputTargets,
    help: &mut dyn Write,
    diagnostics: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    F: Fn(&str) -> Option<String>,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => return report_parse_error(&error, help, diagnostics),
    };

    let config = match load_config(lookup, &parsed) {
        Ok(config) => config,
        Err(error) => return report_plain(&error, diagnostics),
    };
    #[cfg(feature = "tracing")]
    tracing::debug!(
        nesting_level = config.nesting_level,
        dry_run = config.dry_run,
        level_filter = %config.level_filter,
        "configuration loaded"
    );

    let logger = match Logger::with_targets(config, targets) {
        Ok(logger) => logger,
        Err(error) => return report_plain(&error, diagnostics),
    };
    let mut engine = Engine::new(logger);
    if let Some(name) = &parsed.program_name {
        engine = engine.with_program_name(name.clone());
    }

    let status = match execute(&mut engine, parsed.action) {
        Ok(status) => status,
        Err(LogError::Io(error)) => report_plain(&error, diagnostics),
        Err(error) => error.exit_status(),
    };

    if let Err(error) = engine.logger_mut().flush_diagnostics() {
        report_plain(&error, diagnostics);
    }
    if let Err(error) = engine.logger_mut().report_exit(status) {
        report_plain(&error, diagnostics);
    }
    status
}

fn load_config<F>(lookup: F, parsed: &ParsedArgs) -> Result<LogConfig, logging::ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LogConfig::from_lookup(lookup)?;
    parsed.globals.apply(&mut config);
    Ok(config)
}

fn execute(engine: &mut Engine, action: Action) -> Result<i32, LogError> {
    match action {
        Action::Run {
            critical: None,
            command,
        } => engine.run_command(&command),
        Action::Run {
            critical: Some(level),
            command,
        } => {
            let mut section = engine.critical_section(level.as_deref())?;
            section.run_command(&command)
        }
        Action::Log { level, message } => engine.emit(&level, &message),
    }
}

fn report_parse_error(
    error: &clap::Error,
    help: &mut dyn Write,
    diagnostics: &mut dyn Write,
) -> i32 {
    let rendered = error.render().to_string();
    if error.use_stderr() {
        let _ = diagnostics.write_all(rendered.as_bytes());
        let _ = diagnostics.flush();
        USAGE_STATUS
    } else {
        let _ = help.write_all(rendered.as_bytes());
        let _ = help.flush();
        0
    }
}

/// Writes a failure that happened without a usable logger.
fn report_plain(error: &dyn Display, diagnostics: &mut dyn Write) -> i32 {
    let _ = writeln!(diagnostics, "{} {error}", names::FATAL);
    let _ = diagnostics.flush();
    USAGE_STATUS
}
