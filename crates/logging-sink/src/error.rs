use thiserror::Error;

/// Errors produced while interpreting output target descriptors.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TargetError {
    /// The descriptor is not a positive integer.
    #[error("output target '{0}' is not a positive integer")]
    Invalid(String),
}
