use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::TargetError;

/// Positive descriptor number identifying an output target.
///
/// The numbering follows file descriptor conventions so level definitions read
/// the same way in configuration files and in code: `1` is standard output,
/// `2` is standard error and log files are numbered from `3` upwards.
///
/// # Examples
///
/// ```
/// use logging_sink::TargetId;
///
/// let id: TargetId = "2".parse().unwrap();
/// assert_eq!(id, TargetId::STDERR);
/// assert!(id.is_standard());
/// assert!("0".parse::<TargetId>().is_err());
/// assert!("-1".parse::<TargetId>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TargetId(NonZeroU32);

impl TargetId {
    /// Standard output.
    pub const STDOUT: Self = Self(NonZeroU32::MIN);

    /// Standard error.
    pub const STDERR: Self = Self(NonZeroU32::MIN.saturating_add(1));

    /// First id handed out to auxiliary targets such as log files.
    pub const FIRST_AUXILIARY: Self = Self(NonZeroU32::MIN.saturating_add(2));

    /// Creates an id from a raw descriptor number, rejecting zero.
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the raw descriptor number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Reports whether the id is one of the two standard streams.
    #[must_use]
    pub const fn is_standard(self) -> bool {
        self.0.get() <= 2
    }

    /// Returns the id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetId {
    type Err = TargetError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| TargetError::Invalid(text.to_owned()))
    }
}
