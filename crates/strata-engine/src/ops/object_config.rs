//! Per-object retention and legal hold operations.
//!
//! Both require the bucket's object-lock configuration to be enabled and
//! both mutate the addressed version's record under the per-key lock. A
//! rewrite that would weaken active COMPLIANCE retention is refused for
//! every caller; weakening GOVERNANCE retention requires the bypass
//! capability the wire layer vouches for.

use strata_types::{LegalHoldStatus, RetentionRecord, VersionRecord};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::retention::check_rewrite;
use crate::service::ObjectService;

impl ObjectService {
    /// Set or extend retention on one object version.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidObjectLockState`] when object lock is not
    ///   enabled on the bucket, or when the rewrite would weaken active
    ///   retention without the right to do so.
    /// - [`EngineError::NoSuchKey`] / [`EngineError::NoSuchVersion`] when
    ///   the version is absent.
    pub async fn put_object_retention(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        retention: RetentionRecord,
        bypass_governance: bool,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.require_object_lock(bucket)?;

        let _guard = self.locks.acquire(bucket, key).await;

        let mut record = self.resolve_lockable_version(bucket, key, version_id)?;
        check_rewrite(
            record.retention.as_ref(),
            &retention,
            self.clock.now(),
            bypass_governance,
        )?;

        record.retention = Some(retention);
        self.rewrite_version(&record)?;

        debug!(
            bucket,
            key,
            version_id = %record.version_id,
            mode = %retention.mode,
            "object retention updated"
        );
        Ok(())
    }

    /// The retention record of one object version, if any.
    ///
    /// # Errors
    ///
    /// Lookup errors as in [`ObjectService::head_object`].
    pub async fn get_object_retention(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<RetentionRecord>> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        let record = self.resolve_lockable_version(bucket, key, version_id)?;
        Ok(record.retention)
    }

    /// Set or clear the legal hold on one object version.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidObjectLockState`] when object lock is not
    ///   enabled on the bucket.
    /// - [`EngineError::NoSuchKey`] / [`EngineError::NoSuchVersion`] when
    ///   the version is absent.
    pub async fn put_object_legal_hold(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        status: LegalHoldStatus,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.require_object_lock(bucket)?;

        let _guard = self.locks.acquire(bucket, key).await;

        let mut record = self.resolve_lockable_version(bucket, key, version_id)?;
        record.legal_hold = Some(status);
        self.rewrite_version(&record)?;

        debug!(
            bucket,
            key,
            version_id = %record.version_id,
            status = status.as_str(),
            "object legal hold updated"
        );
        Ok(())
    }

    /// The legal hold status of one object version (`Off` when never set).
    ///
    /// # Errors
    ///
    /// Lookup errors as in [`ObjectService::head_object`].
    pub async fn get_object_legal_hold(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngineResult<LegalHoldStatus> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        let record = self.resolve_lockable_version(bucket, key, version_id)?;
        Ok(record.legal_hold.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_object_lock(&self, bucket: &str) -> EngineResult<()> {
        if !self.object_lock_config(bucket)?.enabled {
            return Err(EngineError::InvalidObjectLockState {
                reason: format!("object lock is not enabled for bucket {bucket}"),
            });
        }
        Ok(())
    }

    /// Resolve the version a lock operation addresses; delete markers hold
    /// no payload and cannot carry retention.
    fn resolve_lockable_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> EngineResult<VersionRecord> {
        self.resolve_read_version(bucket, key, version_id)
    }

    /// Persist a mutated version record, refreshing the current pointer when
    /// the record is the key's latest.
    fn rewrite_version(&self, record: &VersionRecord) -> EngineResult<()> {
        self.meta.put_version(record)?;
        let is_current = self
            .meta
            .get_current(&record.bucket, &record.key)?
            .is_some_and(|c| c.version_id == record.version_id);
        if is_current {
            self.meta.put_current(record)?;
        }
        Ok(())
    }
}
