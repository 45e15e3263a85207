//! Error types for strata-spatial

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, SpatialError>;

/// Spatial error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Malformed EWKT or geometry object
    #[error("Invalid geometry: {0}")]
    Parse(String),

    /// Coordinates outside their valid domain
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Geometry kind recognized but not representable
    #[error("Unsupported geometry: {0}")]
    Unsupported(String),
}

impl SpatialError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        SpatialError::Parse(msg.into())
    }

    /// Create an out-of-range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        SpatialError::OutOfRange(msg.into())
    }
}

impl From<SpatialError> for strata_core::Error {
    fn from(err: SpatialError) -> Self {
        strata_core::Error::serialisation(err.to_string())
    }
}
