//! In-memory byte store for tests and embedding.

use std::time::SystemTime;

use bytes::Bytes;
use dashmap::DashMap;
use digest::Digest;
use strata_types::BlobId;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::traits::{BlobRead, BlobStore, BlobWrite, BodyReader};

/// [`BlobStore`] that keeps every payload in memory.
///
/// Bodies are still consumed through the streaming interface so the engine
/// exercises the same code paths against either backend.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobId, (Bytes, SystemTime)>,
}

impl std::fmt::Debug for MemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlobStore")
            .field("blob_count", &self.blobs.len())
            .finish()
    }
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        id: BlobId,
        mut body: BodyReader,
        max_size: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<BlobWrite, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        if let Some(limit) = max_size {
            if data.len() as u64 > limit {
                return Err(StoreError::TooLarge { limit });
            }
        }

        let md5_hex = hex::encode(md5::Md5::digest(&data));
        let size = data.len() as u64;
        self.blobs
            .insert(id, (Bytes::from(data), SystemTime::now()));
        Ok(BlobWrite { md5_hex, size })
    }

    async fn get(&self, id: BlobId, range: Option<(u64, u64)>) -> Result<BlobRead, StoreError> {
        let data = self
            .blobs
            .get(&id)
            .map(|entry| entry.value().0.clone())
            .ok_or(StoreError::NotFound(id))?;

        let slice = match range {
            None => data,
            Some((start, end)) => {
                let len = data.len() as u64;
                if start > end || end >= len {
                    return Err(StoreError::InvalidRange);
                }
                data.slice(start as usize..=end as usize)
            }
        };

        Ok(BlobRead {
            size: slice.len() as u64,
            reader: Box::new(std::io::Cursor::new(slice)),
        })
    }

    async fn delete(&self, id: BlobId) -> Result<(), StoreError> {
        self.blobs.remove(&id);
        Ok(())
    }

    async fn head(&self, id: BlobId) -> Result<u64, StoreError> {
        self.blobs
            .get(&id)
            .map(|entry| entry.value().0.len() as u64)
            .ok_or(StoreError::NotFound(id))
    }

    async fn compose(
        &self,
        parts: &[BlobId],
        dst: BlobId,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        let mut combined = Vec::new();
        for &part in parts {
            let data = self
                .blobs
                .get(&part)
                .map(|entry| entry.value().0.clone())
                .ok_or(StoreError::NotFound(part))?;
            combined.extend_from_slice(&data);
        }
        let total = combined.len() as u64;
        self.blobs
            .insert(dst, (Bytes::from(combined), SystemTime::now()));
        Ok(total)
    }

    async fn list_older_than(&self, cutoff: SystemTime) -> Result<Vec<BlobId>, StoreError> {
        Ok(self
            .blobs
            .iter()
            .filter(|entry| entry.value().1 < cutoff)
            .map(|entry| *entry.key())
            .collect())
    }
}
