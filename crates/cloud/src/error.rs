//! Error types for the external data adapters.

use geoweave_core::ErrorKind;
use thiserror::Error;

/// Errors produced while talking to an external geodata service.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("{service} reported an error: {message}")]
    RemoteService { service: &'static str, message: String },

    #[error("unexpected {found} response from {url}: {message}")]
    UnexpectedContent {
        url: String,
        found: String,
        message: String,
    },

    #[error("malformed {service} response: {reason}")]
    Decode { service: &'static str, reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("codec error: {0}")]
    Codec(#[from] geoweave_codec::CodecError),

    #[error("core error: {0}")]
    Core(#[from] geoweave_core::Error),
}

impl CloudError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Network(_) | Self::InvalidUrl { .. } | Self::Status { .. } => {
                ErrorKind::TransportFailure
            }
            Self::RemoteService { .. } | Self::UnexpectedContent { .. } | Self::Decode { .. } => {
                ErrorKind::RemoteServiceException
            }
            Self::Codec(e) => match e.kind() {
                // a body that does not parse is the server's fault, not the user's file
                ErrorKind::UnsupportedFormat => ErrorKind::RemoteServiceException,
                other => other,
            },
            Self::Core(e) => e.kind(),
        }
    }

    pub(crate) fn decode(service: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            service,
            reason: reason.to_string(),
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
