//! Error types for strata-schema

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Schema engine error taxonomy.
///
/// Every error aborts the document being indexed; the caller discards any
/// pending schema draft. There is no component-local recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid user input; the message is surfaced verbatim
    #[error("{0}")]
    Client(String),

    /// Strict mode and the field has no declared type
    #[error("Type of field {0} is missing")]
    MissingType(String),

    /// A value cannot be encoded for its declared type
    #[error("{0}")]
    Serialisation(String),

    /// The persisted schema violates the feed contract
    #[error("Schema is corrupt: {message} in {field}")]
    SchemaCorrupt {
        /// Full dotted meta-name of the offending field
        field: String,
        message: String,
    },

    /// Keyword recognized but the feature is disabled at build time
    #[error("{0} is not supported")]
    NotSupported(String),

    /// A keyword term too long to index
    #[error("Keyword term in {field} is too long ({length} bytes)")]
    KeywordTooLong { field: String, length: usize },
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

    /// Create a corrupt-schema error carrying the field's full meta-name
    pub fn corrupt(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::SchemaCorrupt {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Error::NotSupported(msg.into())
    }
}

impl From<strata_core::Error> for Error {
    fn from(err: strata_core::Error) -> Self {
        match err {
            strata_core::Error::Client(msg) => Error::Client(msg),
            strata_core::Error::Serialisation(msg) => Error::Serialisation(msg),
        }
    }
}

impl From<strata_spatial::SpatialError> for Error {
    fn from(err: strata_spatial::SpatialError) -> Self {
        Error::Serialisation(err.to_string())
    }
}
