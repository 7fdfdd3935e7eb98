//! Bucket operations.

use strata_types::{BucketRecord, Owner};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::service::ObjectService;
use crate::validation::validate_bucket_name;

impl ObjectService {
    /// Create a bucket.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidBucketName`] when the name violates DNS rules.
    /// - [`EngineError::BucketAlreadyExists`] when the name is taken.
    /// - [`EngineError::TooManyBuckets`] when the configured cap is reached.
    pub async fn create_bucket(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<BucketRecord> {
        Self::ensure_live(cancel)?;
        validate_bucket_name(bucket)?;

        if self.meta.get_bucket(bucket)?.is_some() {
            return Err(EngineError::BucketAlreadyExists {
                bucket: bucket.to_owned(),
            });
        }
        if self.meta.bucket_count()? >= self.config.max_buckets {
            return Err(EngineError::TooManyBuckets {
                limit: self.config.max_buckets,
            });
        }

        let record = BucketRecord {
            name: bucket.to_owned(),
            created_at: self.clock.now(),
            owner: Owner::default(),
        };
        self.meta.put_bucket(&record)?;

        info!(bucket, "bucket created");
        Ok(record)
    }

    /// Delete a bucket.
    ///
    /// Only an empty bucket may be deleted: no object versions (delete
    /// markers included) and no in-flight multipart uploads. All bucket
    /// configuration is dropped with it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoSuchBucket`] when the bucket does not exist.
    /// - [`EngineError::BucketNotEmpty`] when versions or uploads remain.
    pub async fn delete_bucket(&self, bucket: &str, cancel: &CancellationToken) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        if self.meta.has_versions(bucket)? || self.meta.has_uploads(bucket)? {
            return Err(EngineError::BucketNotEmpty {
                bucket: bucket.to_owned(),
            });
        }

        self.meta.purge_bucket(bucket)?;
        info!(bucket, "bucket deleted");
        Ok(())
    }

    /// All buckets, ordered by name.
    pub async fn list_buckets(
        &self,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<BucketRecord>> {
        Self::ensure_live(cancel)?;
        Ok(self.meta.list_buckets()?)
    }

    /// Whether a bucket exists.
    pub async fn bucket_exists(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<bool> {
        Self::ensure_live(cancel)?;
        Ok(self.meta.get_bucket(bucket)?.is_some())
    }

    /// Fetch one bucket record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoSuchBucket`] when the bucket does not exist.
    pub async fn get_bucket(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<BucketRecord> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)
    }
}
