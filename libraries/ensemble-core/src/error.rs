/// Core error types for Ensemble Player
use thiserror::Error;

/// Result type alias using `EnsembleError`
pub type Result<T> = std::result::Result<T, EnsembleError>;

/// Core error type for Ensemble Player
#[derive(Error, Debug)]
pub enum EnsembleError {
    /// Manifest parsing/validation errors (fatal to load)
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Native media source errors (load/seek/play failures)
    #[error("Media error: {0}")]
    Media(String),

    /// Playback rate outside the accepted (0, 4] range
    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl EnsembleError {
    /// Create a manifest error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Create a media error
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
