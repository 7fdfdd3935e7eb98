//! Metadata store error type.

/// Errors surfaced by [`crate::MetaStore`].
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] fjall::Error),

    /// A stored record failed to decode.
    #[error("failed to decode stored record: {0}")]
    Codec(#[from] postcard::Error),

    /// A stored key or value violates the expected layout.
    #[error("corrupt metadata: {0}")]
    Corrupt(String),

    /// Filesystem failure while opening the store.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
