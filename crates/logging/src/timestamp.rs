//! Timestamp prefixes for log records.

use time::OffsetDateTime;
use time::format_description::OwnedFormatItem;

use crate::error::ConfigError;

/// Source of the current time.
///
/// Returning `None` means no time is available; records are then written
/// without a timestamp.
pub trait Clock {
    /// Returns the current time, if known.
    fn now(&self) -> Option<OffsetDateTime>;
}

impl<F> Clock for F
where
    F: Fn() -> Option<OffsetDateTime>,
{
    fn now(&self) -> Option<OffsetDateTime> {
        self()
    }
}

/// Wall clock in the local time zone, falling back to UTC when the local
/// offset cannot be determined.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> Option<OffsetDateTime> {
        Some(OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()))
    }
}

/// Parsed timestamp format.
///
/// Formats use the `time` crate's format description syntax, for example
/// `[year]-[month]-[day] [hour]:[minute]:[second]`.
#[derive(Clone, Debug)]
pub struct TimestampFormat {
    text: String,
    items: OwnedFormatItem,
}

impl TimestampFormat {
    /// Parses `text`; an empty or blank format means no timestamps.
    pub fn parse(text: &str) -> Result<Option<Self>, ConfigError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let items = time::format_description::parse_owned::<1>(text).map_err(|error| {
            ConfigError::TimestampFormat {
                format: text.to_owned(),
                message: error.to_string(),
            }
        })?;
        Ok(Some(Self {
            text: text.to_owned(),
            items,
        }))
    }

    /// Format text as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Renders the current time of `clock`, or `None` when the clock has no
    /// time or the time cannot be rendered with this format.
    pub fn render(&self, clock: &dyn Clock) -> Option<String> {
        clock.now()?.format(&self.items).ok()
    }
}
