//! The [`ObjectService`] facade.
//!
//! Owns the byte store, the metadata store, the per-key lock table, and the
//! clock. Operation handlers live in the [`crate::ops`] modules; this file
//! holds construction and the helpers they share.
//!
//! Persistence ordering is fixed: payload bytes first, version history
//! second, the current pointer last. The current-pointer write is the
//! commit point a reader observes, which is what makes a concurrent read
//! see either the pre-state or the full post-state of any mutation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_meta::{ConfigKind, MetaStore};
use strata_store::{BlobStore, FsBlobStore};
use strata_types::{
    BucketRecord, ObjectLockConfig, Owner, RetentionRecord, VersionRecord, VersioningConfig,
    VersioningStatus,
};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lock::KeyLockTable;

/// The object engine's public operation surface.
///
/// One instance owns the process-wide state: both persistence layers, the
/// key lock table, and the time source. Construct a fresh instance per data
/// directory; tests use temporary directories and a manual clock.
pub struct ObjectService {
    pub(crate) config: EngineConfig,
    pub(crate) blob: Arc<dyn BlobStore>,
    pub(crate) meta: Arc<MetaStore>,
    pub(crate) locks: KeyLockTable,
    pub(crate) clock: Clock,
}

impl std::fmt::Debug for ObjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectService")
            .field("data_dir", &self.config.data_dir)
            .finish_non_exhaustive()
    }
}

impl ObjectService {
    /// Open the engine against `config.data_dir`, creating the two on-disk
    /// roots (`blobs/`, `meta/`) as needed. Tolerates both a fresh and a
    /// populated directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] if either store fails to open.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let blob = FsBlobStore::open(config.data_dir.join("blobs"))?;
        let meta = MetaStore::open(config.data_dir.join("meta"))?;
        Ok(Self::new(
            config,
            Arc::new(blob),
            Arc::new(meta),
            Clock::system(),
        ))
    }

    /// Assemble an engine from injected backends.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        blob: Arc<dyn BlobStore>,
        meta: Arc<MetaStore>,
        clock: Clock,
    ) -> Self {
        Self {
            config,
            blob,
            meta,
            locks: KeyLockTable::new(),
            clock,
        }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's time source.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    // -----------------------------------------------------------------------
    // Shared helpers for the ops modules
    // -----------------------------------------------------------------------

    /// Fail fast with [`EngineError::Canceled`] when the token has fired.
    pub(crate) fn ensure_live(cancel: &CancellationToken) -> EngineResult<()> {
        if cancel.is_cancelled() {
            return Err(EngineError::Canceled);
        }
        Ok(())
    }

    /// Fetch a bucket record or fail with `NoSuchBucket`.
    pub(crate) fn require_bucket(&self, bucket: &str) -> EngineResult<BucketRecord> {
        self.meta
            .get_bucket(bucket)?
            .ok_or_else(|| EngineError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })
    }

    /// The bucket's versioning status (`Unset` when never configured).
    pub(crate) fn versioning_status(&self, bucket: &str) -> EngineResult<VersioningStatus> {
        Ok(self
            .read_config::<VersioningConfig>(bucket, ConfigKind::Versioning, None)?
            .map(|c| c.status)
            .unwrap_or_default())
    }

    /// The bucket's object-lock configuration (disabled when never set).
    pub(crate) fn object_lock_config(&self, bucket: &str) -> EngineResult<ObjectLockConfig> {
        Ok(self
            .read_config::<ObjectLockConfig>(bucket, ConfigKind::ObjectLock, None)?
            .unwrap_or_default())
    }

    /// Retention to stamp onto a new version per the bucket's object-lock
    /// default, if any.
    pub(crate) fn default_retention(
        &self,
        bucket: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<RetentionRecord>> {
        let lock = self.object_lock_config(bucket)?;
        if !lock.enabled {
            return Ok(None);
        }
        Ok(lock.default_retention.map(|d| {
            let days = i64::from(d.days.unwrap_or(0)) + i64::from(d.years.unwrap_or(0)) * 365;
            RetentionRecord {
                mode: d.mode,
                retain_until: now + Duration::days(days),
            }
        }))
    }

    /// Decode a configuration document.
    pub(crate) fn read_config<T: DeserializeOwned>(
        &self,
        bucket: &str,
        kind: ConfigKind,
        id: Option<&str>,
    ) -> EngineResult<Option<T>> {
        match self.meta.get_config(bucket, kind, id)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| EngineError::Internal(anyhow::Error::new(e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Encode and store a configuration document.
    pub(crate) fn write_config<T: Serialize>(
        &self,
        bucket: &str,
        kind: ConfigKind,
        id: Option<&str>,
        value: &T,
    ) -> EngineResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| EngineError::Internal(anyhow::Error::new(e)))?;
        self.meta.put_config(bucket, kind, id, &bytes)?;
        Ok(())
    }

    /// Write a version into history and promote it to current.
    ///
    /// The second write is the commit point.
    pub(crate) fn publish_version(&self, record: &VersionRecord) -> EngineResult<()> {
        self.meta.put_version(record)?;
        self.meta.put_current(record)?;
        Ok(())
    }

    /// Recompute the current pointer for a key after a version was removed.
    ///
    /// The chronologically newest remaining version (data or delete marker)
    /// becomes current; creation time decides, version id breaks ties. The
    /// `"null"` sentinel does not sort chronologically against generated
    /// ids, which is why this scans records instead of trusting id order.
    pub(crate) fn promote_new_latest(&self, bucket: &str, key: &str) -> EngineResult<()> {
        let versions = self.meta.list_key_versions(bucket, key)?;
        let newest = versions
            .into_iter()
            .max_by(|a, b| {
                a.last_modified
                    .cmp(&b.last_modified)
                    .then_with(|| a.version_id.cmp(&b.version_id))
            });
        match newest {
            Some(record) => self.meta.put_current(&record)?,
            None => self.meta.remove_current(bucket, key)?,
        }
        Ok(())
    }

    /// Resolve the version a read operation addresses.
    ///
    /// Without a version id, the latest version is returned and a
    /// delete-marker latest reads as `NoSuchKey`. With one, the named
    /// version is returned; a delete marker also reads as `NoSuchKey` since
    /// it has no payload or metadata to serve.
    pub(crate) fn resolve_read_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> EngineResult<VersionRecord> {
        match version_id {
            Some(vid) => {
                let record = self.meta.get_version(bucket, key, vid)?.ok_or_else(|| {
                    EngineError::NoSuchVersion {
                        key: key.to_owned(),
                        version_id: vid.to_owned(),
                    }
                })?;
                if record.is_delete_marker {
                    return Err(EngineError::NoSuchKey {
                        key: key.to_owned(),
                    });
                }
                Ok(record)
            }
            None => {
                let record = self.meta.get_current(bucket, key)?.ok_or_else(|| {
                    EngineError::NoSuchKey {
                        key: key.to_owned(),
                    }
                })?;
                if record.is_delete_marker {
                    return Err(EngineError::NoSuchKey {
                        key: key.to_owned(),
                    });
                }
                Ok(record)
            }
        }
    }

    /// Build the record for a fresh data version.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build_version_record(
        &self,
        bucket: &str,
        key: &str,
        version_id: String,
        size: u64,
        etag: String,
        content_type: Option<String>,
        content_encoding: Option<String>,
        cache_control: Option<String>,
        user_metadata: HashMap<String, String>,
        storage_class: Option<String>,
        now: DateTime<Utc>,
        retention: Option<RetentionRecord>,
    ) -> VersionRecord {
        VersionRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            version_id,
            size,
            etag,
            content_type,
            content_encoding,
            cache_control,
            user_metadata: normalize_user_metadata(user_metadata),
            storage_class: storage_class.unwrap_or_else(|| "STANDARD".to_owned()),
            last_modified: now,
            is_delete_marker: false,
            parts: None,
            owner: Owner::default(),
            retention,
            legal_hold: None,
        }
    }

    /// Build a delete-marker version.
    pub(crate) fn build_delete_marker(
        &self,
        bucket: &str,
        key: &str,
        version_id: String,
        now: DateTime<Utc>,
    ) -> VersionRecord {
        VersionRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            version_id,
            size: 0,
            etag: String::new(),
            content_type: None,
            content_encoding: None,
            cache_control: None,
            user_metadata: HashMap::new(),
            storage_class: "STANDARD".to_owned(),
            last_modified: now,
            is_delete_marker: true,
            parts: None,
            owner: Owner::default(),
            retention: None,
            legal_hold: None,
        }
    }
}

/// User metadata keys arrive in the transport's stripped `x-amz-meta-` form
/// and are case-insensitive; store them lower-cased, values verbatim.
pub(crate) fn normalize_user_metadata(
    metadata: HashMap<String, String>,
) -> HashMap<String, String> {
    metadata
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect()
}
