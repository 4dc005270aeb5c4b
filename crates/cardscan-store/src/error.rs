use thiserror::Error;

/// Errors that can occur while reading or writing stored documents.
///
/// A missing path is not an error: backends report it as `Ok(None)` and the
/// document store substitutes the empty document.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote store error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl StoreError {
    /// Whether the remote store rejected a conditional write.
    ///
    /// 409 is a revision mismatch; 422 is what the contents API answers when an
    /// existing path is written without a revision.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Remote { status: 409 | 422, .. })
    }
}
