#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `runlog` command-line front-end. Two subcommands
//! expose the engine to shell scripts and other processes:
//!
//! - `runlog run [--critical[=LEVEL]] -- CMD...` logs `CMD` at RUN, relays its
//!   output and escalates a failure to ERROR, or to QUIT/FATAL inside a
//!   critical section.
//! - `runlog log LEVEL [ARGS...]` writes one record, exiting with the status an
//!   ERROR record carries.
//!
//! # Design
//!
//! [`run`] accepts the process arguments, builds a [`logging::LogConfig`] from the
//! environment, applies the global command-line overrides and hands control to
//! [`engine::Engine`]. The returned value is the process exit status; the
//! binary converts it with [`exit_code_from`]. Tests drive the same pipeline
//! through [`run_with`], supplying an environment lookup and in-memory writers.
//!
//! A `runlog run` whose command is itself `runlog` forms a nested chain. Each
//! level inherits the effective configuration through the environment, and
//! the innermost failure is reported once; the levels above it only propagate
//! its status.
//!
//! # Invariants
//!
//! - `run` never panics; I/O failures surface as exit status 1.
//! - Usage errors detected by the argument parser exit with status 1; `--help`
//!   and `--version` exit with 0.
//!
//! # Errors
//!
//! Invalid configuration is reported as a plain `FATAL` line on standard error
//! because no logger exists yet. Everything later is reported through the
//! logger.
//!
//! # Examples
//!
//! ```
//! use cli::run_with;
//! use test_support::SharedBuffer;
//!
//! let stdout = SharedBuffer::new();
//! let stderr = SharedBuffer::new();
//! let status = run_with(
//!     ["runlog", "log", "SUCCESS", "deployed"],
//!     |_: &str| None,
//!     stdout.clone(),
//!     stderr.clone(),
//! );
//!
//! assert_eq!(status, 0);
//! assert_eq!(stdout.contents(), "SUCCESS deployed\n");
//! ```
//!
//! # See also
//!
//! - `src/bin/runlog.rs` for the binary wiring [`run`] into `main`.

mod frontend;

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use logging::protocol::normalize_exit_status;
use logging_sink::OutputTargets;

pub use frontend::clap_command;

/// Environment variable holding the `tracing` filter directives.
pub const TRACE_FILTER_VAR: &str = "RUNLOG_TRACE";

/// Runs the front-end against the process environment and standard streams.
///
/// Returns the process exit status.
pub fn run<I, S>(arguments: I) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    #[cfg(feature = "tracing")]
    install_tracing();

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    frontend::run(
        arguments,
        |name| env::var(name).ok(),
        OutputTargets::standard(),
        &mut stdout,
        &mut stderr,
    )
}

/// Runs the front-end with an injected environment and output writers.
///
/// Neither writer is treated as a terminal. Help text and usage errors are
/// written to the same writers as log records.
pub fn run_with<I, S, F, Out, Err>(arguments: I, lookup: F, stdout: Out, stderr: Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    F: Fn(&str) -> Option<String>,
    Out: Write + Send + Clone + 'static,
    Err: Write + Send + Clone + 'static,
{
    let targets = OutputTargets::with_writers(stdout.clone(), stderr.clone());
    let mut help = stdout;
    let mut diagnostics = stderr;
    frontend::run(arguments, lookup, targets, &mut help, &mut diagnostics)
}

/// Converts a numeric exit status into an [`ExitCode`], reduced modulo 256 as
/// a shell would report it.
#[must_use]
pub fn exit_code_from(status: i32) -> ExitCode {
    let normalized = normalize_exit_status(status);
    ExitCode::from(u8::try_from(normalized).unwrap_or(u8::MAX))
}

#[cfg(feature = "tracing")]
fn install_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(TRACE_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("debug"));
    // A subscriber installed by an embedding process takes precedence.
    let _ = logging::init_tracing(filter);
}
