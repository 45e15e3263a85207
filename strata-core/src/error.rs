//! Error types for strata-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type: invalid descriptors and unencodable values.
///
/// The schema engine defines its own richer taxonomy and converts from
/// this one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid user input; the message is surfaced verbatim
    #[error("{0}")]
    Client(String),

    /// A value cannot be encoded for its declared type
    #[error("{0}")]
    Serialisation(String),
}

impl Error {
    /// Create a client error
    pub fn client(msg: impl Into<String>) -> Self {
        Error::Client(msg.into())
    }

    /// Create a serialisation error
    pub fn serialisation(msg: impl Into<String>) -> Self {
        Error::Serialisation(msg.into())
    }
}
