//! crates/logging/src/tracing_bridge.rs
//! Bridge between the tracing crate and the level registry.
//!
//! [`RunlogLayer`] is a tracing-subscriber layer that buffers events in a
//! thread-local queue. The [`Logger`](crate::Logger) drains the queue before
//! every emission and writes each event as a record at the matching level, so
//! diagnostics from `tracing::debug!` and friends are filtered, formatted and
//! routed exactly like records emitted directly.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::EnvFilter;
//!
//! logging::init_tracing(EnvFilter::new("debug"))?;
//! tracing::debug!(target: "runlog::engine", "spawned child");
//! logger.emit("RUN", &["make"])?; // writes the DEBUG record first
//! ```

use std::cell::RefCell;

use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::levels::names;

thread_local! {
    #[allow(clippy::missing_const_for_thread_local)]
    static EVENTS: RefCell<Vec<TracingEvent>> = RefCell::new(Vec::new());
}

/// A tracing event waiting to be written through the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TracingEvent {
    /// Event severity.
    pub level: Level,
    /// Event target, usually the emitting module path.
    pub target: String,
    /// Rendered message.
    pub message: String,
}

impl TracingEvent {
    /// Registry level the event is written at.
    #[must_use]
    pub fn level_name(&self) -> &'static str {
        level_name(self.level)
    }
}

/// Maps a tracing level to a registry level name.
const fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => names::ERROR,
        Level::WARN => names::WARN,
        Level::INFO => names::INFO,
        Level::DEBUG | Level::TRACE => names::DEBUG,
    }
}

/// Queues an event for the current thread.
pub fn push_event(event: TracingEvent) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

/// Drains the events queued on the current thread.
pub fn drain_events() -> Vec<TracingEvent> {
    EVENTS.with(|events| events.borrow_mut().drain(..).collect())
}

/// Tracing layer that queues events for the [`Logger`](crate::Logger).
#[derive(Clone, Copy, Debug, Default)]
pub struct RunlogLayer;

impl RunlogLayer {
    /// Creates the layer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RunlogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Some(message) = visitor.finish() {
            push_event(TracingEvent {
                level: *metadata.level(),
                target: metadata.target().to_owned(),
                message,
            });
        }
    }
}

/// Collects the `message` field and any other fields as `name=value` pairs.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> Option<String> {
        match (self.message, self.fields.is_empty()) {
            (Some(message), true) => Some(message),
            (Some(message), false) => Some(format!("{message} {}", self.fields.join(" "))),
            (None, false) => Some(self.fields.join(" ")),
            (None, true) => None,
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

/// Installs [`RunlogLayer`] behind `filter` as the global default subscriber.
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing<F>(filter: F) -> Result<(), tracing_subscriber::util::TryInitError>
where
    F: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(filter)
        .with(RunlogLayer::new())
        .try_init()
}
