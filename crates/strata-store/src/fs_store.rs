//! Filesystem byte store.
//!
//! One file per payload with a 2-level fan-out directory structure:
//! `{base_dir}/{hex[0..2]}/{hex[2..4]}/{hex}`. Writes go to a temporary
//! file in the final directory and are renamed into place, so a payload is
//! either fully present or absent.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use digest::Digest;
use strata_types::BlobId;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::traits::{BlobRead, BlobStore, BlobWrite, BodyReader};

/// Copy buffer size for streaming transfers.
const BUFFER_SIZE: usize = 64 * 1024;

/// Extension used for in-progress writes.
const TMP_EXTENSION: &str = "tmp";

/// Filesystem-backed [`BlobStore`].
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

impl FsBlobStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Full path for a payload id.
    fn blob_path(&self, id: BlobId) -> PathBuf {
        let hex = id.to_string();
        self.base_dir.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    /// Remove a temp file after a failed or canceled write.
    async fn discard_tmp(tmp: &Path) {
        if let Err(e) = tokio::fs::remove_file(tmp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
            }
        }
    }

    /// Stream `body` into `tmp`, hashing and counting as we go.
    async fn stream_to_tmp(
        tmp: &Path,
        mut body: BodyReader,
        max_size: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<BlobWrite, StoreError> {
        let mut file = tokio::fs::File::create(tmp).await?;
        let mut hasher = md5::Md5::new();
        let mut buf = vec![0u8; BUFFER_SIZE];
        let mut size: u64 = 0;

        loop {
            let n = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(StoreError::Canceled),
                read = body.read(&mut buf) => read?,
            };
            if n == 0 {
                break;
            }
            size += n as u64;
            if let Some(limit) = max_size {
                if size > limit {
                    return Err(StoreError::TooLarge { limit });
                }
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        Ok(BlobWrite {
            md5_hex: hex::encode(hasher.finalize()),
            size,
        })
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        id: BlobId,
        body: BodyReader,
        max_size: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<BlobWrite, StoreError> {
        let path = self.blob_path(id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(TMP_EXTENSION);
        let result = Self::stream_to_tmp(&tmp, body, max_size, cancel).await;
        let write = match result {
            Ok(write) => write,
            Err(e) => {
                Self::discard_tmp(&tmp).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&tmp, &path).await?;
        trace!(%id, size = write.size, "stored payload");
        Ok(write)
    }

    async fn get(&self, id: BlobId, range: Option<(u64, u64)>) -> Result<BlobRead, StoreError> {
        let path = self.blob_path(id);
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let total = file.metadata().await?.len();

        match range {
            None => Ok(BlobRead {
                reader: Box::new(file),
                size: total,
            }),
            Some((start, end)) => {
                if start > end || end >= total {
                    return Err(StoreError::InvalidRange);
                }
                file.seek(std::io::SeekFrom::Start(start)).await?;
                let len = end - start + 1;
                Ok(BlobRead {
                    reader: Box::new(file.take(len)),
                    size: len,
                })
            }
        }
    }

    async fn delete(&self, id: BlobId) -> Result<(), StoreError> {
        let path = self.blob_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                trace!(%id, "deleted payload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn head(&self, id: BlobId) -> Result<u64, StoreError> {
        let path = self.blob_path(id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id)),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn compose(
        &self,
        parts: &[BlobId],
        dst: BlobId,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let path = self.blob_path(dst);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(TMP_EXTENSION);
        let result = self.concat_parts(&tmp, parts, cancel).await;
        let total = match result {
            Ok(total) => total,
            Err(e) => {
                Self::discard_tmp(&tmp).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&tmp, &path).await?;
        debug!(%dst, parts = parts.len(), size = total, "composed payload");
        Ok(total)
    }

    async fn list_older_than(&self, cutoff: SystemTime) -> Result<Vec<BlobId>, StoreError> {
        let mut ids = Vec::new();

        let mut level0 = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(d0) = level0.next_entry().await? {
            if !d0.file_type().await?.is_dir() {
                continue;
            }
            let mut level1 = tokio::fs::read_dir(d0.path()).await?;
            while let Some(d1) = level1.next_entry().await? {
                if !d1.file_type().await?.is_dir() {
                    continue;
                }
                let mut files = tokio::fs::read_dir(d1.path()).await?;
                while let Some(entry) = files.next_entry().await? {
                    if !entry.file_type().await?.is_file() {
                        continue;
                    }
                    let modified = entry.metadata().await?.modified()?;
                    if modified >= cutoff {
                        continue;
                    }
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if let Some(id) = BlobId::from_hex(name) {
                        ids.push(id);
                    } else if name.ends_with(TMP_EXTENSION) {
                        // A crash mid-write can strand a temp file; reclaim it
                        // once it is past the cutoff.
                        Self::discard_tmp(&entry.path()).await;
                    }
                }
            }
        }
        Ok(ids)
    }
}

impl FsBlobStore {
    /// Concatenate part payloads into `tmp`, returning the total size.
    async fn concat_parts(
        &self,
        tmp: &Path,
        parts: &[BlobId],
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let mut out = tokio::fs::File::create(tmp).await?;
        let mut buf = vec![0u8; BUFFER_SIZE];
        let mut total: u64 = 0;

        for &part in parts {
            let part_path = self.blob_path(part);
            let mut src = match tokio::fs::File::open(&part_path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StoreError::NotFound(part));
                }
                Err(e) => return Err(StoreError::Io(e)),
            };
            loop {
                let n = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(StoreError::Canceled),
                    read = src.read(&mut buf) => read?,
                };
                if n == 0 {
                    break;
                }
                total += n as u64;
                out.write_all(&buf[..n]).await?;
            }
        }

        out.flush().await?;
        Ok(total)
    }
}
