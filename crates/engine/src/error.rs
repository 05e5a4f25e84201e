//! Error types for the engine.

use geoweave_core::ErrorKind;
use thiserror::Error;

use crate::layer::LayerId;

/// Errors surfaced by workbench operations.
///
/// `Display` is the single human-readable message; [`EngineError::kind`] is
/// what callers branch on.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] geoweave_core::Error),

    #[error(transparent)]
    Codec(#[from] geoweave_codec::CodecError),

    #[error(transparent)]
    Cloud(#[from] geoweave_cloud::CloudError),

    #[error("layer '{0}' already exists")]
    DuplicateLayer(LayerId),

    #[error("no layer with id '{0}'")]
    LayerNotFound(LayerId),

    #[error("a {0} request is already in progress")]
    Busy(&'static str),

    #[error("remote layer '{0}' was not advertised by the current server")]
    UnknownRemoteLayer(String),

    #[error("failed to load config {path}: {reason}")]
    Config { path: String, reason: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::Codec(e) => e.kind(),
            Self::Cloud(e) => e.kind(),
            Self::DuplicateLayer(_) => ErrorKind::DuplicateLayer,
            Self::Busy(_) => ErrorKind::Busy,
            Self::LayerNotFound(_) | Self::UnknownRemoteLayer(_) | Self::Config { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_duplicates_are_soft() {
        assert!(EngineError::DuplicateLayer(LayerId::new("a")).kind().is_soft());
        assert!(!EngineError::Busy("WFS").kind().is_soft());
        assert!(!EngineError::UnknownRemoteLayer("x".into()).kind().is_soft());
    }
}
