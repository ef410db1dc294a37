//! Configuration validation errors

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A tag key is empty
    #[error("{0} cannot be empty")]
    EmptyTagKey(&'static str),

    /// A tag value is empty
    #[error("{0} cannot be empty")]
    EmptyTagValue(&'static str),

    /// The marker and instance-id tags share a key, so one would overwrite the other
    #[error("image marker tag and instance id tag must use different keys, both are '{0}'")]
    DuplicateTagKey(String),
}
