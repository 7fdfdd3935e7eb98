//! Engine error kinds.
//!
//! Typed categories the wire layer maps onto S3 error codes. Backend
//! failures that carry no S3 meaning collapse into [`EngineError::Internal`]
//! and never leak implementation messages into wire responses.

use strata_meta::MetaError;
use strata_store::StoreError;

/// The engine-level error contract.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // -----------------------------------------------------------------------
    // Bucket errors
    // -----------------------------------------------------------------------
    /// The specified bucket does not exist.
    #[error("no such bucket: {bucket}")]
    NoSuchBucket {
        /// The bucket that was not found.
        bucket: String,
    },

    /// The bucket name is already taken.
    #[error("bucket already exists: {bucket}")]
    BucketAlreadyExists {
        /// The conflicting bucket name.
        bucket: String,
    },

    /// The bucket still holds object versions or in-flight uploads.
    #[error("bucket is not empty: {bucket}")]
    BucketNotEmpty {
        /// The non-empty bucket.
        bucket: String,
    },

    /// Creating the bucket would exceed the configured bucket count.
    #[error("bucket limit of {limit} reached")]
    TooManyBuckets {
        /// The configured cap.
        limit: usize,
    },

    /// The bucket name violates the DNS-label rules.
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// Which rule it violated.
        reason: String,
    },

    // -----------------------------------------------------------------------
    // Object errors
    // -----------------------------------------------------------------------
    /// The specified key does not exist.
    #[error("no such key: {key}")]
    NoSuchKey {
        /// The key that was not found.
        key: String,
    },

    /// The specified version does not exist.
    #[error("no such version: key={key}, version_id={version_id}")]
    NoSuchVersion {
        /// The key the version was requested for.
        key: String,
        /// The version id that was not found.
        version_id: String,
    },

    /// The object key is not acceptable.
    #[error("invalid object name {key:?}: {reason}")]
    InvalidObjectName {
        /// The rejected key.
        key: String,
        /// Which rule it violated.
        reason: String,
    },

    // -----------------------------------------------------------------------
    // Multipart errors
    // -----------------------------------------------------------------------
    /// The specified multipart upload does not exist.
    #[error("no such upload: {upload_id}")]
    NoSuchUpload {
        /// The upload id that was not found.
        upload_id: String,
    },

    /// A manifest entry names a part that was never staged, repeats a part
    /// number, asserts a stale ETag, or the manifest is empty.
    #[error("one or more of the specified parts could not be found")]
    InvalidPart,

    /// The manifest's part numbers are not in ascending order.
    #[error("the list of parts was not in ascending order")]
    InvalidPartOrder,

    /// A non-final part is smaller than the configured minimum.
    #[error("part is smaller than the minimum allowed size of {min} bytes")]
    EntityTooSmall {
        /// The configured minimum part size.
        min: u64,
    },

    /// The body exceeds the maximum allowed object size.
    #[error("body exceeds the maximum allowed object size of {max} bytes")]
    EntityTooLarge {
        /// The configured maximum object size.
        max: u64,
    },

    // -----------------------------------------------------------------------
    // Object lock
    // -----------------------------------------------------------------------
    /// Retention or legal hold forbids the requested operation.
    #[error("operation violates object lock state: {reason}")]
    InvalidObjectLockState {
        /// Which protection blocked the operation.
        reason: String,
    },

    // -----------------------------------------------------------------------
    // Conditional / range errors
    // -----------------------------------------------------------------------
    /// A request precondition did not hold.
    #[error("at least one precondition did not hold")]
    PreconditionFailed,

    /// An `if-none-match` / `if-modified-since` condition matched.
    #[error("not modified")]
    NotModified,

    /// The requested byte range does not fit the object.
    #[error("requested range is not satisfiable")]
    InvalidRange,

    /// A request argument is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the malformed argument.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Cancellation / catch-all
    // -----------------------------------------------------------------------
    /// The operation exceeded its deadline.
    #[error("request timed out")]
    RequestTimeout,

    /// The caller canceled the operation.
    #[error("operation canceled")]
    Canceled,

    /// Internal failure with no S3-visible category.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Canceled => Self::Canceled,
            StoreError::TooLarge { limit } => Self::EntityTooLarge { max: limit },
            StoreError::InvalidRange => Self::InvalidRange,
            StoreError::NotFound(id) => {
                Self::Internal(anyhow::anyhow!("payload missing for referenced blob {id}"))
            }
            StoreError::Io(e) => Self::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<MetaError> for EngineError {
    fn from(err: MetaError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

/// Convenience result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
