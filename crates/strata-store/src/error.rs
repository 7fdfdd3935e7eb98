//! Byte store error type.

use strata_types::BlobId;

/// Errors surfaced by [`crate::BlobStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested payload does not exist.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The written body exceeded the caller-imposed size limit.
    #[error("blob exceeds the maximum allowed size of {limit} bytes")]
    TooLarge {
        /// The limit that was exceeded.
        limit: u64,
    },

    /// The requested byte range does not fit the payload.
    #[error("requested range is not satisfiable")]
    InvalidRange,

    /// The operation was canceled mid-transfer.
    #[error("transfer canceled")]
    Canceled,

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
