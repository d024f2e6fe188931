/// Result alias that carries the custom [`PoseSyncError`] type.
pub type Result<T> = std::result::Result<T, PoseSyncError>;

/// Common error type for the core crate.
///
/// Only the loading edge (results documents, configuration files) produces
/// errors. Once a session is running, problems degrade playback instead of
/// surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum PoseSyncError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// The results document parsed but violates a structural requirement.
    #[error("invalid results document: {0}")]
    InvalidDocument(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON decoding errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PoseSyncError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PoseSyncError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PoseSyncError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
