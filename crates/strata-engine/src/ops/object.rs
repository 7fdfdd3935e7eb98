//! Object CRUD operations.
//!
//! Implements `put_object`, `get_object`, `head_object`, `delete_object`,
//! `delete_objects`, `copy_object`, the storage-class transition used by
//! the lifecycle worker, and the orphan-payload sweep.

use std::collections::HashSet;
use std::time::SystemTime;

use strata_store::BodyReader;
use strata_types::{BlobId, VersionRecord, VersioningStatus, NULL_VERSION_ID};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::checksums::{quote_etag, strip_etag};
use crate::error::{EngineError, EngineResult};
use crate::retention::check_destroy;
use crate::service::ObjectService;
use crate::types::{
    CopyObjectOptions, CopyObjectResult, DeleteObjectOptions, DeleteObjectResult,
    DeleteObjectsResult, DeletedObject, GetObjectOptions, GetObjectResult, MetadataDirective,
    ObjectIdentifier, PutObjectOptions, PutObjectResult,
};
use crate::validation::validate_object_key;
use crate::versioning::version_id_for_put;

impl ObjectService {
    /// Store an object from a streaming body.
    ///
    /// The payload is written first, then the version record, then the
    /// current pointer; the per-key lock is held across the whole sequence.
    /// A metadata failure after the payload write triggers best-effort
    /// payload cleanup, with the lifecycle sweep as the backstop.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchBucket`] when the bucket does not exist.
    /// - [`EngineError::EntityTooLarge`] when the body exceeds the limit.
    /// - [`EngineError::Canceled`] when the caller cancels mid-stream.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: BodyReader,
        opts: PutObjectOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<PutObjectResult> {
        Self::ensure_live(cancel)?;
        validate_object_key(key)?;
        self.require_bucket(bucket)?;

        let status = self.versioning_status(bucket)?;
        let now = self.clock.now();
        let version_id = version_id_for_put(status, now);
        let retention = self.default_retention(bucket, now)?;

        let _guard = self.locks.acquire(bucket, key).await;

        let blob_id = BlobId::for_object(bucket, key, &version_id);
        let write = self
            .blob
            .put(blob_id, body, Some(self.config.max_object_size), cancel)
            .await?;

        let record = self.build_version_record(
            bucket,
            key,
            version_id.clone(),
            write.size,
            quote_etag(&write.md5_hex),
            opts.content_type,
            opts.content_encoding,
            opts.cache_control,
            opts.user_metadata,
            opts.storage_class,
            now,
            retention,
        );

        if let Err(e) = self.publish_version(&record) {
            if let Err(cleanup) = self.blob.delete(blob_id).await {
                warn!(%blob_id, error = %cleanup, "payload cleanup after failed publish");
            }
            return Err(e);
        }

        debug!(bucket, key, version_id = %version_id, size = write.size, "put_object completed");
        Ok(PutObjectResult {
            version_id,
            etag: record.etag,
            size: write.size,
        })
    }

    /// Read an object (the latest version, or a named one).
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchKey`] / [`EngineError::NoSuchVersion`] when the
    ///   object or version is absent (a delete-marker latest reads as
    ///   `NoSuchKey`).
    /// - [`EngineError::PreconditionFailed`] / [`EngineError::NotModified`]
    ///   for failed conditional requests.
    /// - [`EngineError::InvalidRange`] for unsatisfiable ranges.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        opts: GetObjectOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<GetObjectResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let record = self.resolve_read_version(bucket, key, opts.version_id.as_deref())?;
        check_conditionals(&record, &opts)?;

        let range = resolve_range(&record, opts.range)?;
        let read = self.blob.get(record.blob_id(), range).await?;

        Ok(GetObjectResult {
            content_length: read.size,
            content_range: range.map(|(start, end)| (start, end, record.size)),
            body: read.reader,
            record,
        })
    }

    /// Read an object's metadata without its body.
    ///
    /// # Errors
    ///
    /// Same lookup errors as [`ObjectService::get_object`].
    pub async fn head_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngineResult<VersionRecord> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.resolve_read_version(bucket, key, version_id)
    }

    /// Delete an object per the bucket's versioning state.
    ///
    /// Without a version id: un-versioned buckets hard-delete, versioned
    /// buckets insert a delete marker, suspended buckets replace the
    /// `"null"` slot with a `"null"` delete marker. With a version id the
    /// named version is destroyed outright, subject to the retention gate.
    /// Deleting an absent object is success with no side effect.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchBucket`] when the bucket does not exist.
    /// - [`EngineError::NoSuchVersion`] for a missing named version (except
    ///   the `"null"` sentinel, which no-ops).
    /// - [`EngineError::InvalidObjectLockState`] when retention or legal
    ///   hold blocks the destruction.
    pub async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        opts: DeleteObjectOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<DeleteObjectResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let status = self.versioning_status(bucket)?;
        let now = self.clock.now();
        let _guard = self.locks.acquire(bucket, key).await;

        if let Some(vid) = opts.version_id.as_deref() {
            return self
                .delete_named_version(bucket, key, vid, opts.bypass_governance)
                .await;
        }

        match status {
            VersioningStatus::Unset => {
                let Some(record) = self.meta.get_current(bucket, key)? else {
                    return Ok(DeleteObjectResult {
                        delete_marker: false,
                        version_id: None,
                    });
                };
                check_destroy(&record, now, opts.bypass_governance)?;

                self.meta.remove_version(bucket, key, &record.version_id)?;
                self.meta.remove_current(bucket, key)?;
                self.blob.delete(record.blob_id()).await?;

                debug!(bucket, key, "hard-deleted object");
                Ok(DeleteObjectResult {
                    delete_marker: false,
                    version_id: None,
                })
            }
            VersioningStatus::Enabled => {
                let marker = self.build_delete_marker(
                    bucket,
                    key,
                    crate::versioning::generate_version_id(now),
                    now,
                );
                self.publish_version(&marker)?;

                debug!(bucket, key, version_id = %marker.version_id, "inserted delete marker");
                Ok(DeleteObjectResult {
                    delete_marker: true,
                    version_id: Some(marker.version_id),
                })
            }
            VersioningStatus::Suspended => {
                // The null slot is replaced destructively; its payload goes
                // away once the marker is committed.
                let displaced = self.meta.get_version(bucket, key, NULL_VERSION_ID)?;
                if let Some(old) = &displaced {
                    check_destroy(old, now, opts.bypass_governance)?;
                }

                let marker =
                    self.build_delete_marker(bucket, key, NULL_VERSION_ID.to_owned(), now);
                self.publish_version(&marker)?;

                if let Some(old) = displaced {
                    if !old.is_delete_marker {
                        self.blob.delete(old.blob_id()).await?;
                    }
                }

                debug!(bucket, key, "replaced null slot with delete marker");
                Ok(DeleteObjectResult {
                    delete_marker: true,
                    version_id: Some(NULL_VERSION_ID.to_owned()),
                })
            }
        }
    }

    /// Batch delete. Each key is processed independently; failures do not
    /// stop the batch.
    pub async fn delete_objects(
        &self,
        bucket: &str,
        identifiers: Vec<ObjectIdentifier>,
        bypass_governance: bool,
        cancel: &CancellationToken,
    ) -> EngineResult<DeleteObjectsResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let mut result = DeleteObjectsResult::default();
        for identifier in identifiers {
            let opts = DeleteObjectOptions {
                version_id: identifier.version_id.clone(),
                bypass_governance,
            };
            match self.delete_object(bucket, &identifier.key, opts, cancel).await {
                Ok(deleted) => result.deleted.push(DeletedObject {
                    key: identifier.key,
                    version_id: deleted.version_id,
                    delete_marker: deleted.delete_marker,
                }),
                Err(e) => result.errors.push((identifier, e)),
            }
        }
        Ok(result)
    }

    /// Copy an object. The destination receives its own version id and an
    /// ETag computed from the streamed bytes, regardless of how the source
    /// was assembled.
    ///
    /// # Errors
    ///
    /// Source lookup errors as in [`ObjectService::get_object`], destination
    /// errors as in [`ObjectService::put_object`].
    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        opts: CopyObjectOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<CopyObjectResult> {
        Self::ensure_live(cancel)?;
        validate_object_key(dst_key)?;
        self.require_bucket(src_bucket)?;
        self.require_bucket(dst_bucket)?;

        let src = self.resolve_read_version(src_bucket, src_key, opts.src_version_id.as_deref())?;

        let status = self.versioning_status(dst_bucket)?;
        let now = self.clock.now();
        let version_id = version_id_for_put(status, now);
        let retention = self.default_retention(dst_bucket, now)?;

        let _guard = self.locks.acquire(dst_bucket, dst_key).await;

        let src_read = self.blob.get(src.blob_id(), None).await?;
        let dst_id = BlobId::for_object(dst_bucket, dst_key, &version_id);
        let write = self
            .blob
            .put(
                dst_id,
                src_read.reader,
                Some(self.config.max_object_size),
                cancel,
            )
            .await?;

        let record = match opts.metadata_directive {
            MetadataDirective::Copy => self.build_version_record(
                dst_bucket,
                dst_key,
                version_id.clone(),
                write.size,
                quote_etag(&write.md5_hex),
                src.content_type.clone(),
                src.content_encoding.clone(),
                src.cache_control.clone(),
                src.user_metadata.clone(),
                Some(
                    opts.storage_class
                        .clone()
                        .unwrap_or_else(|| src.storage_class.clone()),
                ),
                now,
                retention,
            ),
            MetadataDirective::Replace => self.build_version_record(
                dst_bucket,
                dst_key,
                version_id.clone(),
                write.size,
                quote_etag(&write.md5_hex),
                opts.metadata.content_type,
                opts.metadata.content_encoding,
                opts.metadata.cache_control,
                opts.metadata.user_metadata,
                opts.storage_class.or(opts.metadata.storage_class),
                now,
                retention,
            ),
        };

        if let Err(e) = self.publish_version(&record) {
            if let Err(cleanup) = self.blob.delete(dst_id).await {
                warn!(%dst_id, error = %cleanup, "payload cleanup after failed publish");
            }
            return Err(e);
        }

        debug!(
            src_bucket,
            src_key,
            dst_bucket,
            dst_key,
            version_id = %version_id,
            size = write.size,
            "copy_object completed"
        );
        Ok(CopyObjectResult {
            version_id,
            etag: record.etag,
            size: write.size,
            last_modified: now,
        })
    }

    /// Rewrite a version's storage class in place.
    ///
    /// The attribute is the observable effect; no bytes move. Idempotent:
    /// returns `false` when the version is already in the target class (or
    /// is a delete marker).
    ///
    /// # Errors
    ///
    /// Lookup errors as in [`ObjectService::head_object`].
    pub async fn transition_storage_class(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        storage_class: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<bool> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let _guard = self.locks.acquire(bucket, key).await;

        let mut record = match version_id {
            Some(vid) => self.meta.get_version(bucket, key, vid)?.ok_or_else(|| {
                EngineError::NoSuchVersion {
                    key: key.to_owned(),
                    version_id: vid.to_owned(),
                }
            })?,
            None => self
                .meta
                .get_current(bucket, key)?
                .ok_or_else(|| EngineError::NoSuchKey {
                    key: key.to_owned(),
                })?,
        };

        if record.is_delete_marker || record.storage_class == storage_class {
            return Ok(false);
        }

        record.storage_class = storage_class.to_owned();
        self.meta.put_version(&record)?;

        let is_current = self
            .meta
            .get_current(bucket, key)?
            .is_some_and(|c| c.version_id == record.version_id);
        if is_current {
            self.meta.put_current(&record)?;
        }

        debug!(bucket, key, version_id = %record.version_id, storage_class, "transitioned storage class");
        Ok(true)
    }

    /// Delete payloads older than the grace window that no version or
    /// staged part references. Returns the number reclaimed.
    ///
    /// Payloads younger than the window are left alone: they may belong to
    /// writes whose metadata commit is still in flight.
    pub async fn sweep_orphan_payloads(&self, cancel: &CancellationToken) -> EngineResult<usize> {
        Self::ensure_live(cancel)?;

        let cutoff = SystemTime::from(self.clock.now()) - self.config.orphan_grace_window;
        let candidates = self.blob.list_older_than(cutoff).await?;
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut referenced: HashSet<BlobId> = HashSet::new();
        for record in self.meta.iter_all_versions() {
            let record = record?;
            if !record.is_delete_marker {
                referenced.insert(record.blob_id());
            }
        }
        for part in self.meta.iter_all_parts() {
            let part = part?;
            referenced.insert(BlobId::for_part(
                &part.bucket,
                &part.key,
                &part.upload_id,
                part.part_number,
            ));
        }

        let mut reclaimed = 0;
        for id in candidates {
            Self::ensure_live(cancel)?;
            if !referenced.contains(&id) {
                self.blob.delete(id).await?;
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            debug!(reclaimed, "swept orphan payloads");
        }
        Ok(reclaimed)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Destroy one named version; the caller holds the key lock.
    async fn delete_named_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        bypass_governance: bool,
    ) -> EngineResult<DeleteObjectResult> {
        let now = self.clock.now();

        let Some(record) = self.meta.get_version(bucket, key, version_id)? else {
            if version_id == NULL_VERSION_ID {
                // Hard-deleting an absent null version is a no-op success.
                return Ok(DeleteObjectResult {
                    delete_marker: false,
                    version_id: Some(version_id.to_owned()),
                });
            }
            return Err(EngineError::NoSuchVersion {
                key: key.to_owned(),
                version_id: version_id.to_owned(),
            });
        };

        check_destroy(&record, now, bypass_governance)?;

        self.meta.remove_version(bucket, key, version_id)?;

        let was_current = self
            .meta
            .get_current(bucket, key)?
            .is_some_and(|c| c.version_id == version_id);
        if was_current {
            self.promote_new_latest(bucket, key)?;
        }

        // Payload last, so a concurrent reader that already resolved the
        // old current pointer can still stream it.
        if !record.is_delete_marker {
            self.blob.delete(record.blob_id()).await?;
        }

        debug!(bucket, key, version_id, "deleted version");
        Ok(DeleteObjectResult {
            delete_marker: record.is_delete_marker,
            version_id: Some(version_id.to_owned()),
        })
    }
}

/// Evaluate conditional-request options in RFC 7232 precedence order.
fn check_conditionals(record: &VersionRecord, opts: &GetObjectOptions) -> EngineResult<()> {
    if let Some(if_match) = &opts.if_match {
        if strip_etag(if_match) != strip_etag(&record.etag) {
            return Err(EngineError::PreconditionFailed);
        }
    }
    if let Some(t) = opts.if_unmodified_since {
        if record.last_modified > t {
            return Err(EngineError::PreconditionFailed);
        }
    }
    if let Some(if_none_match) = &opts.if_none_match {
        if strip_etag(if_none_match) == strip_etag(&record.etag) {
            return Err(EngineError::NotModified);
        }
    }
    if let Some(t) = opts.if_modified_since {
        if record.last_modified <= t {
            return Err(EngineError::NotModified);
        }
    }
    Ok(())
}

/// Clamp a requested range against the object size.
fn resolve_range(
    record: &VersionRecord,
    range: Option<crate::types::ByteRange>,
) -> EngineResult<Option<(u64, u64)>> {
    let Some(range) = range else {
        return Ok(None);
    };
    if record.size == 0 || range.start >= record.size {
        return Err(EngineError::InvalidRange);
    }
    let end = range.end.map_or(record.size - 1, |e| e.min(record.size - 1));
    if range.start > end {
        return Err(EngineError::InvalidRange);
    }
    Ok(Some((range.start, end)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use strata_types::Owner;

    use super::*;
    use crate::types::ByteRange;

    fn make_record(size: u64, etag: &str) -> VersionRecord {
        VersionRecord {
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            version_id: "v1".to_owned(),
            size,
            etag: etag.to_owned(),
            content_type: None,
            content_encoding: None,
            cache_control: None,
            user_metadata: HashMap::new(),
            storage_class: "STANDARD".to_owned(),
            last_modified: Utc::now(),
            is_delete_marker: false,
            parts: None,
            owner: Owner::default(),
            retention: None,
            legal_hold: None,
        }
    }

    #[test]
    fn test_should_resolve_full_and_clamped_ranges() {
        let record = make_record(10, "\"e\"");
        assert_eq!(resolve_range(&record, None).unwrap(), None);

        let range = ByteRange {
            start: 2,
            end: Some(5),
        };
        assert_eq!(resolve_range(&record, Some(range)).unwrap(), Some((2, 5)));

        // An open end and an oversized end both clamp to the last byte.
        let open = ByteRange {
            start: 4,
            end: None,
        };
        assert_eq!(resolve_range(&record, Some(open)).unwrap(), Some((4, 9)));
        let oversized = ByteRange {
            start: 4,
            end: Some(99),
        };
        assert_eq!(
            resolve_range(&record, Some(oversized)).unwrap(),
            Some((4, 9))
        );
    }

    #[test]
    fn test_should_reject_out_of_bounds_range() {
        let record = make_record(10, "\"e\"");
        let past_end = ByteRange {
            start: 10,
            end: None,
        };
        assert!(matches!(
            resolve_range(&record, Some(past_end)),
            Err(EngineError::InvalidRange)
        ));

        let empty = make_record(0, "\"e\"");
        let any = ByteRange {
            start: 0,
            end: None,
        };
        assert!(matches!(
            resolve_range(&empty, Some(any)),
            Err(EngineError::InvalidRange)
        ));
    }

    #[test]
    fn test_should_check_etag_conditionals() {
        let record = make_record(1, "\"abc\"");

        let mut opts = GetObjectOptions {
            if_match: Some("\"abc\"".to_owned()),
            ..GetObjectOptions::default()
        };
        assert!(check_conditionals(&record, &opts).is_ok());

        opts.if_match = Some("\"other\"".to_owned());
        assert!(matches!(
            check_conditionals(&record, &opts),
            Err(EngineError::PreconditionFailed)
        ));

        let opts = GetObjectOptions {
            if_none_match: Some("abc".to_owned()),
            ..GetObjectOptions::default()
        };
        assert!(matches!(
            check_conditionals(&record, &opts),
            Err(EngineError::NotModified)
        ));
    }

    #[test]
    fn test_should_check_time_conditionals() {
        let record = make_record(1, "\"abc\"");
        let before = record.last_modified - chrono::Duration::hours(1);
        let after = record.last_modified + chrono::Duration::hours(1);

        let opts = GetObjectOptions {
            if_unmodified_since: Some(before),
            ..GetObjectOptions::default()
        };
        assert!(matches!(
            check_conditionals(&record, &opts),
            Err(EngineError::PreconditionFailed)
        ));

        let opts = GetObjectOptions {
            if_modified_since: Some(after),
            ..GetObjectOptions::default()
        };
        assert!(matches!(
            check_conditionals(&record, &opts),
            Err(EngineError::NotModified)
        ));

        let opts = GetObjectOptions {
            if_modified_since: Some(before),
            if_unmodified_since: Some(after),
            ..GetObjectOptions::default()
        };
        assert!(check_conditionals(&record, &opts).is_ok());
    }
}
