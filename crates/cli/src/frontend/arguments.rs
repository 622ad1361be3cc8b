//! Argument parsing for the `runlog` front-end.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command, builder::OsStringValueParser, value_parser};
use logging::LogConfig;

/// Global options accepted before or after the subcommand.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct GlobalOptions {
    pub(crate) dry_run: bool,
    pub(crate) timestamp_format: Option<String>,
    pub(crate) level_filter: Option<String>,
    pub(crate) console_filter: Option<String>,
    pub(crate) formatting: bool,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) log_file_levels: Option<Vec<String>>,
}

impl GlobalOptions {
    /// Overrides the environment-derived `config` with the options that were given.
    pub(crate) fn apply(&self, config: &mut LogConfig) {
        if self.dry_run {
            config.dry_run = true;
        }
        if self.formatting {
            config.formatting = true;
        }
        if let Some(format) = &self.timestamp_format {
            config.timestamp_format = Some(format.clone()).filter(|f| !f.trim().is_empty());
        }
        if let Some(filter) = &self.level_filter {
            config.level_filter = filter.trim().to_uppercase();
        }
        if let Some(filter) = &self.console_filter {
            config.console_filter = Some(filter.trim().to_uppercase());
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
        if let Some(levels) = &self.log_file_levels {
            config.log_file_levels = levels
                .iter()
                .map(|level| level.trim().to_uppercase())
                .filter(|level| !level.is_empty())
                .collect();
        }
    }
}

/// What the invocation asks for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    /// `runlog run`: `critical` is `None` without `--critical`, `Some(None)` for
    /// a bare `--critical`.
    Run {
        critical: Option<Option<String>>,
        command: Vec<OsString>,
    },
    /// `runlog log`.
    Log { level: String, message: Vec<String> },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) program_name: Option<String>,
    pub(crate) globals: GlobalOptions,
    pub(crate) action: Action,
}

fn global_args() -> [Arg; 7] {
    [
        Arg::new("dry-run")
            .long("dry-run")
            .short('n')
            .help("Log commands without running them.")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new("timestamp-format")
            .long("timestamp-format")
            .value_name("FORMAT")
            .help("Prefix records with the time in FORMAT (time format description syntax).")
            .action(ArgAction::Set)
            .global(true),
        Arg::new("level-filter")
            .long("level-filter")
            .value_name("LEVEL")
            .help("Suppress records below LEVEL.")
            .action(ArgAction::Set)
            .global(true),
        Arg::new("console-filter")
            .long("console-filter")
            .value_name("LEVEL")
            .help("Suppress records below LEVEL on the console only.")
            .action(ArgAction::Set)
            .global(true),
        Arg::new("formatting")
            .long("formatting")
            .help("Keep escape codes on output that is not a terminal.")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new("log-file")
            .long("log-file")
            .value_name("FILE")
            .help("Append records to FILE.")
            .action(ArgAction::Set)
            .value_parser(value_parser!(PathBuf))
            .global(true),
        Arg::new("log-file-levels")
            .long("log-file-levels")
            .value_name("LEVELS")
            .help("Comma-separated levels written to the log file (default: all).")
            .action(ArgAction::Append)
            .value_delimiter(',')
            .global(true),
    ]
}

/// Builds the `clap` command used for parsing.
#[must_use]
pub fn clap_command() -> Command {
    Command::new("runlog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run commands with logged, escalating failure handling.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(global_args())
        .subcommand(
            Command::new("run")
                .about("Log and run a command, relaying its output.")
                .arg(
                    Arg::new("critical")
                        .long("critical")
                        .value_name("LEVEL")
                        .help("Escalate a failure to QUIT or FATAL (default from the environment).")
                        .num_args(0..=1)
                        .require_equals(true)
                        .default_missing_value(""),
                )
                .arg(
                    Arg::new("command")
                        .value_name("CMD")
                        .required(true)
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .value_parser(OsStringValueParser::new()),
                ),
        )
        .subcommand(
            Command::new("log")
                .about("Write one record at LEVEL.")
                .arg(Arg::new("level").value_name("LEVEL").required(true))
                .arg(
                    Arg::new("message")
                        .value_name("ARGS")
                        .num_args(0..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true),
                ),
        )
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from("runlog"));
    }
    let program_name = Path::new(&args[0])
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty());

    let matches = clap_command().try_get_matches_from(args)?;
    let (globals, action) = match matches.subcommand() {
        Some(("run", sub)) => (
            globals(sub),
            Action::Run {
                critical: sub
                    .get_one::<String>("critical")
                    .map(|level| Some(level.clone()).filter(|level| !level.is_empty())),
                command: sub
                    .get_many::<OsString>("command")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
            },
        ),
        Some(("log", sub)) => (
            globals(sub),
            Action::Log {
                level: sub.get_one::<String>("level").cloned().unwrap_or_default(),
                message: sub
                    .get_many::<String>("message")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
            },
        ),
        _ => {
            return Err(clap_command().error(
                clap::error::ErrorKind::MissingSubcommand,
                "a subcommand is required",
            ));
        }
    };

    Ok(ParsedArgs {
        program_name,
        globals,
        action,
    })
}

fn globals(matches: &ArgMatches) -> GlobalOptions {
    GlobalOptions {
        dry_run: matches.get_flag("dry-run"),
        timestamp_format: matches.get_one::<String>("timestamp-format").cloned(),
        level_filter: matches.get_one::<String>("level-filter").cloned(),
        console_filter: matches.get_one::<String>("console-filter").cloned(),
        formatting: matches.get_flag("formatting"),
        log_file: matches.get_one::<PathBuf>("log-file").cloned(),
        log_file_levels: matches
            .get_many::<String>("log-file-levels")
            .map(|values| values.cloned().collect()),
    }
}
