//! Error types for geoweave

use std::fmt;

use thiserror::Error;

/// Machine-distinguishable failure category.
///
/// Every error type in the workspace maps onto one of these so callers can branch
/// on the category while showing the `Display` text to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedArchive,
    EmptyResult,
    InvalidGeometryForOperation,
    InvalidBoundingBox,
    RemoteServiceException,
    TransportFailure,
    DuplicateLayer,
    /// Another request of the same kind is still outstanding.
    Busy,
    Internal,
}

impl ErrorKind {
    /// Soft outcomes are informational; they never change the registry.
    pub fn is_soft(self) -> bool {
        matches!(self, Self::DuplicateLayer | Self::EmptyResult)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::MalformedArchive => "malformed archive",
            Self::EmptyResult => "empty result",
            Self::InvalidGeometryForOperation => "invalid geometry for operation",
            Self::InvalidBoundingBox => "invalid bounding box",
            Self::RemoteServiceException => "remote service exception",
            Self::TransportFailure => "transport failure",
            Self::DuplicateLayer => "duplicate layer",
            Self::Busy => "busy",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bounding box (south={south}, west={west}, north={north}, east={east}): {reason}")]
    InvalidBoundingBox {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
        reason: String,
    },

    #[error("Operation requires a {expected} geometry, got {found}")]
    InvalidGeometry {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Geometry has no coordinates")]
    EmptyGeometry,

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBoundingBox { .. } => ErrorKind::InvalidBoundingBox,
            Self::InvalidGeometry { .. } | Self::EmptyGeometry => {
                ErrorKind::InvalidGeometryForOperation
            }
            Self::Io(_) | Self::CrsMismatch(..) | Self::InvalidParameter { .. } | Self::Other(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
