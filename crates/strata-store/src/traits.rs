//! The byte store capability trait.

use std::time::SystemTime;

use strata_types::BlobId;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// A streaming request or staging body.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Result of writing a payload.
#[derive(Debug, Clone)]
pub struct BlobWrite {
    /// Hex MD5 digest of the written bytes (unquoted).
    pub md5_hex: String,
    /// Number of bytes written.
    pub size: u64,
}

/// A streaming payload read.
pub struct BlobRead {
    /// The payload bytes (or the requested range of them).
    pub reader: BodyReader,
    /// Number of bytes the reader will yield.
    pub size: u64,
}

impl std::fmt::Debug for BlobRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRead").field("size", &self.size).finish()
    }
}

/// Capability the engine requires of a payload store.
///
/// Implementations must be `Send + Sync`; bodies stream through bounded
/// buffers, never materializing whole payloads. Concurrent writes to the
/// same [`BlobId`] are the caller's responsibility to serialize (the engine
/// holds a per-key lock across every write it issues).
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `body` into storage under `id`.
    ///
    /// Computes the MD5 digest and byte count on the fly. When `max_size`
    /// is set, writing stops with [`StoreError::TooLarge`] as soon as the
    /// body exceeds it. Cancellation aborts at a buffer boundary and leaves
    /// no partial payload behind.
    async fn put(
        &self,
        id: BlobId,
        body: BodyReader,
        max_size: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<BlobWrite, StoreError>;

    /// Open a payload for reading, optionally restricted to an inclusive
    /// byte range.
    async fn get(&self, id: BlobId, range: Option<(u64, u64)>) -> Result<BlobRead, StoreError>;

    /// Remove a payload. Removing a missing payload is a no-op.
    async fn delete(&self, id: BlobId) -> Result<(), StoreError>;

    /// Size of a payload in bytes.
    async fn head(&self, id: BlobId) -> Result<u64, StoreError>;

    /// Concatenate `parts` in order into a new payload under `dst`.
    ///
    /// Returns the total size. Used by multipart completion; the staged
    /// part payloads are left in place for the caller to delete.
    async fn compose(
        &self,
        parts: &[BlobId],
        dst: BlobId,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError>;

    /// List payloads last modified before `cutoff`.
    ///
    /// Supports the orphan sweep: the lifecycle worker intersects this with
    /// the metadata store's referenced set and deletes the difference.
    async fn list_older_than(&self, cutoff: SystemTime) -> Result<Vec<BlobId>, StoreError>;
}
