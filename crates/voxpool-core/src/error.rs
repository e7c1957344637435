//! Error types for voxpool.

use thiserror::Error;

/// Result type alias using voxpool's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for voxpool.
///
/// A pool refusing to hand out a channel is not an error; play operations
/// report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Duplicate group id: {0}")]
    DuplicateGroup(String),

    #[error("Group id is reserved: {0}")]
    ReservedGroupId(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Audio manager is not initialized")]
    NotInitialized,

    #[error("Audio manager has been disposed")]
    Disposed,

    // Clip errors
    #[error("Clip variant set is empty")]
    EmptyVariantSet,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error stems from setup-time configuration.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateGroup(_)
                | Self::ReservedGroupId(_)
                | Self::UnknownGroup(_)
                | Self::InvalidConfig(_)
                | Self::Json(_)
        )
    }

    /// Returns true if the manager's lifecycle rejected the call.
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::Disposed)
    }
}
