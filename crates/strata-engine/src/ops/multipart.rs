//! Multipart upload operations.
//!
//! Uploads stage parts as independent payloads; completion validates the
//! client's manifest against the staged parts, composes the final payload,
//! and publishes the version atomically under the per-key lock. A reader
//! never observes a partial composite.

use strata_types::{BlobId, Owner, PartInfo, PartRecord, UploadRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::checksums::{compute_multipart_etag, strip_etag};
use crate::error::{EngineError, EngineResult};
use crate::service::{normalize_user_metadata, ObjectService};
use crate::types::{
    CompletedPart, CreateMultipartOptions, ListMultipartUploadsOptions,
    ListMultipartUploadsResult, ListPartsOptions, ListPartsResult, PutObjectResult,
    UploadPartResult,
};
use crate::validation::validate_object_key;
use crate::versioning::{generate_upload_id, version_id_for_put};

impl ObjectService {
    /// Initiate a multipart upload and return its opaque id.
    ///
    /// The options carry the eventual object's metadata; they are applied
    /// verbatim at completion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoSuchBucket`] or
    /// [`EngineError::InvalidObjectName`].
    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        opts: CreateMultipartOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        Self::ensure_live(cancel)?;
        validate_object_key(key)?;
        self.require_bucket(bucket)?;

        let now = self.clock.now();
        let upload_id = generate_upload_id(now);

        let record = UploadRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            upload_id: upload_id.clone(),
            initiated: now,
            content_type: opts.content_type,
            content_encoding: opts.content_encoding,
            cache_control: opts.cache_control,
            user_metadata: normalize_user_metadata(opts.user_metadata),
            storage_class: opts.storage_class.unwrap_or_else(|| "STANDARD".to_owned()),
            owner: Owner::default(),
        };
        self.meta.put_upload(&record)?;

        debug!(bucket, key, upload_id = %upload_id, "created multipart upload");
        Ok(upload_id)
    }

    /// Stage one part of an upload.
    ///
    /// The byte transfer happens outside the per-key lock; only the part
    /// record publication takes it. Re-uploading a part number replaces the
    /// prior content.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchUpload`] when the upload id is unknown (also
    ///   when it was completed or aborted while the part was in transit).
    /// - [`EngineError::InvalidArgument`] for an out-of-range part number.
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: strata_store::BodyReader,
        cancel: &CancellationToken,
    ) -> EngineResult<UploadPartResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        if part_number < 1 || part_number > self.config.max_parts_per_upload {
            return Err(EngineError::InvalidArgument {
                message: format!(
                    "part number must be between 1 and {}",
                    self.config.max_parts_per_upload
                ),
            });
        }
        if self.meta.get_upload(bucket, key, upload_id)?.is_none() {
            return Err(EngineError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            });
        }

        let blob_id = BlobId::for_part(bucket, key, upload_id, part_number);
        let write = self
            .blob
            .put(blob_id, body, Some(self.config.max_object_size), cancel)
            .await?;

        let _guard = self.locks.acquire(bucket, key).await;

        // The upload may have been completed or aborted during the transfer;
        // if so the staged payload is dead weight.
        if self.meta.get_upload(bucket, key, upload_id)?.is_none() {
            if let Err(e) = self.blob.delete(blob_id).await {
                warn!(%blob_id, error = %e, "staged part cleanup after upload vanished");
            }
            return Err(EngineError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            });
        }

        let record = PartRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            upload_id: upload_id.to_owned(),
            part_number,
            etag: crate::checksums::quote_etag(&write.md5_hex),
            size: write.size,
            last_modified: self.clock.now(),
        };
        self.meta.put_part(&record)?;

        debug!(bucket, key, upload_id, part_number, size = write.size, "staged part");
        Ok(UploadPartResult {
            etag: record.etag,
            size: write.size,
        })
    }

    /// Complete an upload from the client's part manifest.
    ///
    /// Validates ordering, existence, ETag assertions, and the minimum
    /// non-final part size before any metadata is touched; then composes
    /// the payload, publishes the version under the key lock, and discards
    /// the staged parts and upload record.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchUpload`] for an unknown upload id.
    /// - [`EngineError::InvalidPart`] for an empty manifest, a duplicate or
    ///   unknown part number, or a stale ETag assertion.
    /// - [`EngineError::InvalidPartOrder`] when part numbers decrease.
    /// - [`EngineError::EntityTooSmall`] when a non-final part is under the
    ///   configured minimum.
    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        manifest: &[CompletedPart],
        cancel: &CancellationToken,
    ) -> EngineResult<PutObjectResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let _guard = self.locks.acquire(bucket, key).await;

        let upload = self.meta.get_upload(bucket, key, upload_id)?.ok_or_else(|| {
            EngineError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            }
        })?;

        if manifest.is_empty() {
            return Err(EngineError::InvalidPart);
        }

        // Validate the manifest against the staged parts before touching
        // any metadata.
        let mut staged: Vec<PartRecord> = Vec::with_capacity(manifest.len());
        let mut last_number = 0u32;
        for entry in manifest {
            if entry.part_number == last_number {
                return Err(EngineError::InvalidPart);
            }
            if entry.part_number < last_number {
                return Err(EngineError::InvalidPartOrder);
            }
            last_number = entry.part_number;

            let part = self
                .meta
                .get_part(bucket, key, upload_id, entry.part_number)?
                .ok_or(EngineError::InvalidPart)?;
            if strip_etag(&part.etag) != strip_etag(&entry.etag) {
                return Err(EngineError::InvalidPart);
            }
            staged.push(part);
        }

        for part in &staged[..staged.len() - 1] {
            if part.size < self.config.multipart_min_part_size {
                return Err(EngineError::EntityTooSmall {
                    min: self.config.multipart_min_part_size,
                });
            }
        }

        let status = self.versioning_status(bucket)?;
        let now = self.clock.now();
        let version_id = version_id_for_put(status, now);
        let retention = self.default_retention(bucket, now)?;

        let part_ids: Vec<BlobId> = staged
            .iter()
            .map(|p| BlobId::for_part(bucket, key, upload_id, p.part_number))
            .collect();
        let dst_id = BlobId::for_object(bucket, key, &version_id);
        let size = self.blob.compose(&part_ids, dst_id, cancel).await?;

        let part_etags: Vec<&str> = staged.iter().map(|p| p.etag.as_str()).collect();
        let etag = compute_multipart_etag(&part_etags);

        let mut record = self.build_version_record(
            bucket,
            key,
            version_id.clone(),
            size,
            etag.clone(),
            upload.content_type.clone(),
            upload.content_encoding.clone(),
            upload.cache_control.clone(),
            upload.user_metadata.clone(),
            Some(upload.storage_class.clone()),
            now,
            retention,
        );
        record.parts = Some(
            staged
                .iter()
                .map(|p| PartInfo {
                    part_number: p.part_number,
                    etag: p.etag.clone(),
                    size: p.size,
                })
                .collect(),
        );

        if let Err(e) = self.publish_version(&record) {
            if let Err(cleanup) = self.blob.delete(dst_id).await {
                warn!(%dst_id, error = %cleanup, "payload cleanup after failed publish");
            }
            return Err(e);
        }

        // The object is visible; staging state is now garbage. Cleanup is
        // best-effort, the orphan sweep catches stragglers.
        self.discard_upload_state(bucket, key, upload_id).await;

        debug!(
            bucket,
            key,
            upload_id,
            version_id = %version_id,
            parts = staged.len(),
            size,
            "completed multipart upload"
        );
        Ok(PutObjectResult {
            version_id,
            etag,
            size,
        })
    }

    /// Abort an upload, discarding its record and every staged part.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoSuchUpload`] for an unknown upload id.
    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let _guard = self.locks.acquire(bucket, key).await;

        if self.meta.get_upload(bucket, key, upload_id)?.is_none() {
            return Err(EngineError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            });
        }

        self.discard_upload_state(bucket, key, upload_id).await;
        debug!(bucket, key, upload_id, "aborted multipart upload");
        Ok(())
    }

    /// Page through the staged parts of an upload.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoSuchUpload`] for an unknown upload id.
    pub async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        opts: ListPartsOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<ListPartsResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        if self.meta.get_upload(bucket, key, upload_id)?.is_none() {
            return Err(EngineError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            });
        }

        let marker = opts.part_number_marker.unwrap_or(0);
        let max_parts = opts.max_parts.unwrap_or(1000);

        let all: Vec<PartRecord> = self
            .meta
            .list_upload_parts(bucket, key, upload_id)?
            .into_iter()
            .filter(|p| p.part_number > marker)
            .collect();

        let is_truncated = all.len() > max_parts;
        let parts: Vec<PartRecord> = all.into_iter().take(max_parts).collect();
        let next_part_number_marker = if is_truncated {
            parts.last().map(|p| p.part_number)
        } else {
            None
        };

        Ok(ListPartsResult {
            parts,
            is_truncated,
            next_part_number_marker,
        })
    }

    /// List in-flight uploads of a bucket, ordered by `(key, upload_id)`.
    pub async fn list_multipart_uploads(
        &self,
        bucket: &str,
        opts: ListMultipartUploadsOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<ListMultipartUploadsResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let max_uploads = opts.max_uploads.unwrap_or(1000);
        let all = self.meta.list_uploads(bucket, &opts.prefix)?;
        let is_truncated = all.len() > max_uploads;
        let uploads = all.into_iter().take(max_uploads).collect();

        Ok(ListMultipartUploadsResult {
            uploads,
            is_truncated,
        })
    }

    /// Drop the upload record, its part records, and the staged payloads.
    async fn discard_upload_state(&self, bucket: &str, key: &str, upload_id: &str) {
        let part_numbers: Vec<u32> = match self.meta.list_upload_parts(bucket, key, upload_id) {
            Ok(parts) => parts.iter().map(|p| p.part_number).collect(),
            Err(e) => {
                warn!(bucket, key, upload_id, error = %e, "listing staged parts for discard");
                Vec::new()
            }
        };

        if let Err(e) = self.meta.remove_upload_parts(bucket, key, upload_id) {
            warn!(bucket, key, upload_id, error = %e, "removing staged part records");
        }
        if let Err(e) = self.meta.remove_upload(bucket, key, upload_id) {
            warn!(bucket, key, upload_id, error = %e, "removing upload record");
        }
        for part_number in part_numbers {
            let blob_id = BlobId::for_part(bucket, key, upload_id, part_number);
            if let Err(e) = self.blob.delete(blob_id).await {
                warn!(%blob_id, error = %e, "removing staged part payload");
            }
        }
    }
}
