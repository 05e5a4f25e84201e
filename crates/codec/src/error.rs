//! Error types for the geodata codec.

use geoweave_core::ErrorKind;
use thiserror::Error;

/// Errors produced while importing or exporting vector data.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported format: {file} (.{extension})")]
    UnsupportedFormat { file: String, extension: String },

    #[error("malformed archive {file}: {reason}")]
    MalformedArchive { file: String, reason: String },

    #[error("missing shapefile member .{member} for {dataset}")]
    MissingMember { dataset: String, member: &'static str },

    #[error("failed to decode {file} (.{extension}): {reason}")]
    Decode {
        file: String,
        extension: String,
        reason: String,
    },

    #[error("invalid data: {0}")]
    Invalid(String),

    #[error("nothing to export: {0}")]
    EmptyExport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] geoweave_core::Error),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::MalformedArchive { .. } | Self::MissingMember { .. } | Self::Zip(_) => {
                ErrorKind::MalformedArchive
            }
            Self::EmptyExport(_) => ErrorKind::EmptyResult,
            Self::Core(e) => e.kind(),
            Self::Decode { .. }
            | Self::Invalid(_)
            | Self::Json(_)
            | Self::GeoJson(_)
            | Self::Xml(_) => ErrorKind::UnsupportedFormat,
            Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Attach the offending file to a low-level parse failure.
    pub(crate) fn in_file(self, file: &str, extension: &str) -> Self {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::MalformedArchive { .. }
            | Self::MissingMember { .. }
            | Self::Decode { .. } => self,
            other => Self::Decode {
                file: file.to_string(),
                extension: extension.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
