//! Per-bucket configuration operations.
//!
//! Every configuration is a document in the metadata store's `configs`
//! keyspace, replaced atomically as a single key, so all of them survive a
//! restart. Getters return `None` for configurations that were never set;
//! the wire layer owns the 404-shaped error codes.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_meta::ConfigKind;
use strata_types::{
    BucketEncryption, CorsRule, LifecycleRule, ObjectLockConfig, OwnershipControls,
    PublicAccessBlockConfig, VersioningConfig, VersioningStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::service::ObjectService;

impl ObjectService {
    // -----------------------------------------------------------------------
    // Versioning
    // -----------------------------------------------------------------------

    /// Set the bucket's versioning state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] when suspending versioning
    /// on a bucket with object lock enabled.
    pub async fn put_bucket_versioning(
        &self,
        bucket: &str,
        config: VersioningConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        if config.status == VersioningStatus::Suspended && self.object_lock_config(bucket)?.enabled
        {
            return Err(EngineError::InvalidArgument {
                message: "versioning cannot be suspended while object lock is enabled".to_owned(),
            });
        }

        self.write_config(bucket, ConfigKind::Versioning, None, &config)?;
        info!(bucket, status = ?config.status, "bucket versioning updated");
        Ok(())
    }

    /// The bucket's versioning configuration (`Unset` when never configured).
    pub async fn get_bucket_versioning(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<VersioningConfig> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        Ok(self
            .read_config(bucket, ConfigKind::Versioning, None)?
            .unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Replace the bucket's lifecycle rule set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] for an empty rule set,
    /// duplicate rule ids, or a rule with no action.
    pub async fn put_bucket_lifecycle(
        &self,
        bucket: &str,
        rules: Vec<LifecycleRule>,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        if rules.is_empty() {
            return Err(EngineError::InvalidArgument {
                message: "lifecycle configuration must contain at least one rule".to_owned(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(EngineError::InvalidArgument {
                    message: format!("duplicate lifecycle rule id: {}", rule.id),
                });
            }
            let has_action = rule.expiration.is_some()
                || !rule.transitions.is_empty()
                || rule.noncurrent_version_expiration.is_some();
            if !has_action {
                return Err(EngineError::InvalidArgument {
                    message: format!("lifecycle rule {} has no action", rule.id),
                });
            }
        }

        self.write_config(bucket, ConfigKind::Lifecycle, None, &rules)?;
        info!(bucket, rules = rules.len(), "bucket lifecycle updated");
        Ok(())
    }

    /// The bucket's lifecycle rules, if configured.
    pub async fn get_bucket_lifecycle(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<Vec<LifecycleRule>>> {
        self.get_doc(bucket, ConfigKind::Lifecycle, cancel).await
    }

    /// Drop the bucket's lifecycle rules.
    pub async fn delete_bucket_lifecycle(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Lifecycle, cancel).await
    }

    // -----------------------------------------------------------------------
    // Object lock
    // -----------------------------------------------------------------------

    /// Set the bucket's object-lock configuration.
    ///
    /// Enabling object lock forces versioning on (a lock without version
    /// history would protect nothing). Once enabled it cannot be disabled.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidObjectLockState`] when disabling an
    /// enabled configuration.
    pub async fn put_object_lock_config(
        &self,
        bucket: &str,
        config: ObjectLockConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let existing = self.object_lock_config(bucket)?;
        if existing.enabled && !config.enabled {
            return Err(EngineError::InvalidObjectLockState {
                reason: "object lock cannot be disabled once enabled".to_owned(),
            });
        }

        if config.enabled && self.versioning_status(bucket)? != VersioningStatus::Enabled {
            self.write_config(
                bucket,
                ConfigKind::Versioning,
                None,
                &VersioningConfig {
                    status: VersioningStatus::Enabled,
                    mfa_delete: false,
                },
            )?;
        }

        self.write_config(bucket, ConfigKind::ObjectLock, None, &config)?;
        info!(bucket, enabled = config.enabled, "object lock configuration updated");
        Ok(())
    }

    /// The bucket's object-lock configuration, if one was ever set.
    pub async fn get_object_lock_config(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<ObjectLockConfig>> {
        self.get_doc(bucket, ConfigKind::ObjectLock, cancel).await
    }

    // -----------------------------------------------------------------------
    // CORS
    // -----------------------------------------------------------------------

    /// Replace the bucket's CORS rules.
    pub async fn put_bucket_cors(
        &self,
        bucket: &str,
        rules: Vec<CorsRule>,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Cors, &rules, cancel).await
    }

    /// The bucket's CORS rules, if configured.
    pub async fn get_bucket_cors(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<Vec<CorsRule>>> {
        self.get_doc(bucket, ConfigKind::Cors, cancel).await
    }

    /// Drop the bucket's CORS rules.
    pub async fn delete_bucket_cors(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Cors, cancel).await
    }

    // -----------------------------------------------------------------------
    // Policy
    // -----------------------------------------------------------------------

    /// Set the bucket policy document (an opaque JSON string).
    pub async fn put_bucket_policy(
        &self,
        bucket: &str,
        policy: String,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Policy, &policy, cancel).await
    }

    /// The bucket policy, if configured.
    pub async fn get_bucket_policy(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<String>> {
        self.get_doc(bucket, ConfigKind::Policy, cancel).await
    }

    /// Drop the bucket policy.
    pub async fn delete_bucket_policy(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Policy, cancel).await
    }

    // -----------------------------------------------------------------------
    // Tagging
    // -----------------------------------------------------------------------

    /// Replace the bucket's tag set.
    pub async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Tagging, &tags, cancel).await
    }

    /// The bucket's tag set, if configured.
    pub async fn get_bucket_tagging(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<HashMap<String, String>>> {
        self.get_doc(bucket, ConfigKind::Tagging, cancel).await
    }

    /// Drop the bucket's tag set.
    pub async fn delete_bucket_tagging(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Tagging, cancel).await
    }

    // -----------------------------------------------------------------------
    // Encryption
    // -----------------------------------------------------------------------

    /// Set the bucket's server-side encryption configuration.
    pub async fn put_bucket_encryption(
        &self,
        bucket: &str,
        config: BucketEncryption,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Encryption, &config, cancel).await
    }

    /// The bucket's encryption configuration, if configured.
    pub async fn get_bucket_encryption(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<BucketEncryption>> {
        self.get_doc(bucket, ConfigKind::Encryption, cancel).await
    }

    /// Drop the bucket's encryption configuration.
    pub async fn delete_bucket_encryption(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Encryption, cancel).await
    }

    // -----------------------------------------------------------------------
    // Replication
    // -----------------------------------------------------------------------

    /// Set the bucket's replication configuration (opaque document; the
    /// engine performs no replication itself).
    pub async fn put_bucket_replication(
        &self,
        bucket: &str,
        config: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Replication, &config, cancel).await
    }

    /// The bucket's replication configuration, if configured.
    pub async fn get_bucket_replication(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<serde_json::Value>> {
        self.get_doc(bucket, ConfigKind::Replication, cancel).await
    }

    /// Drop the bucket's replication configuration.
    pub async fn delete_bucket_replication(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Replication, cancel).await
    }

    // -----------------------------------------------------------------------
    // Public access block
    // -----------------------------------------------------------------------

    /// Set the bucket's public access block.
    pub async fn put_public_access_block(
        &self,
        bucket: &str,
        config: PublicAccessBlockConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::PublicAccessBlock, &config, cancel).await
    }

    /// The bucket's public access block, if configured.
    pub async fn get_public_access_block(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<PublicAccessBlockConfig>> {
        self.get_doc(bucket, ConfigKind::PublicAccessBlock, cancel).await
    }

    /// Drop the bucket's public access block.
    pub async fn delete_public_access_block(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::PublicAccessBlock, cancel).await
    }

    // -----------------------------------------------------------------------
    // Notification / logging
    // -----------------------------------------------------------------------

    /// Set the bucket's event notification configuration (opaque document;
    /// delivery is a caller concern).
    pub async fn put_bucket_notification(
        &self,
        bucket: &str,
        config: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Notification, &config, cancel).await
    }

    /// The bucket's notification configuration, if configured.
    pub async fn get_bucket_notification(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<serde_json::Value>> {
        self.get_doc(bucket, ConfigKind::Notification, cancel).await
    }

    /// Drop the bucket's notification configuration.
    pub async fn delete_bucket_notification(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Notification, cancel).await
    }

    /// Set the bucket's access logging configuration (opaque document).
    pub async fn put_bucket_logging(
        &self,
        bucket: &str,
        config: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Logging, &config, cancel).await
    }

    /// The bucket's logging configuration, if configured.
    pub async fn get_bucket_logging(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<serde_json::Value>> {
        self.get_doc(bucket, ConfigKind::Logging, cancel).await
    }

    /// Drop the bucket's logging configuration.
    pub async fn delete_bucket_logging(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Logging, cancel).await
    }

    // -----------------------------------------------------------------------
    // Location / accelerate / ownership
    // -----------------------------------------------------------------------

    /// Set the bucket's location constraint.
    pub async fn put_bucket_location(
        &self,
        bucket: &str,
        location: String,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Location, &location, cancel).await
    }

    /// The bucket's location constraint (empty when never set).
    pub async fn get_bucket_location(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        Ok(self
            .get_doc(bucket, ConfigKind::Location, cancel)
            .await?
            .unwrap_or_default())
    }

    /// Set the bucket's transfer acceleration state (`Enabled`/`Suspended`).
    pub async fn put_bucket_accelerate(
        &self,
        bucket: &str,
        status: String,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Accelerate, &status, cancel).await
    }

    /// The bucket's acceleration state, if configured.
    pub async fn get_bucket_accelerate(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<String>> {
        self.get_doc(bucket, ConfigKind::Accelerate, cancel).await
    }

    /// Set the bucket's ownership controls.
    pub async fn put_bucket_ownership_controls(
        &self,
        bucket: &str,
        config: OwnershipControls,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.put_doc(bucket, ConfigKind::Ownership, &config, cancel).await
    }

    /// The bucket's ownership controls, if configured.
    pub async fn get_bucket_ownership_controls(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<OwnershipControls>> {
        self.get_doc(bucket, ConfigKind::Ownership, cancel).await
    }

    /// Drop the bucket's ownership controls.
    pub async fn delete_bucket_ownership_controls(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.delete_doc(bucket, ConfigKind::Ownership, cancel).await
    }

    // -----------------------------------------------------------------------
    // Metrics / analytics (id-keyed)
    // -----------------------------------------------------------------------

    /// Store one metrics configuration under its id.
    pub async fn put_bucket_metrics(
        &self,
        bucket: &str,
        id: &str,
        config: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.write_config(bucket, ConfigKind::Metrics, Some(id), &config)
    }

    /// Fetch one metrics configuration by id.
    pub async fn get_bucket_metrics(
        &self,
        bucket: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<serde_json::Value>> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.read_config(bucket, ConfigKind::Metrics, Some(id))
    }

    /// Drop one metrics configuration by id.
    pub async fn delete_bucket_metrics(
        &self,
        bucket: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        Ok(self.meta.remove_config(bucket, ConfigKind::Metrics, Some(id))?)
    }

    /// All metrics configurations, as `(id, document)` pairs in id order.
    pub async fn list_bucket_metrics(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<(String, serde_json::Value)>> {
        self.list_docs(bucket, ConfigKind::Metrics, cancel).await
    }

    /// Store one analytics configuration under its id.
    pub async fn put_bucket_analytics(
        &self,
        bucket: &str,
        id: &str,
        config: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.write_config(bucket, ConfigKind::Analytics, Some(id), &config)
    }

    /// Fetch one analytics configuration by id.
    pub async fn get_bucket_analytics(
        &self,
        bucket: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<serde_json::Value>> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.read_config(bucket, ConfigKind::Analytics, Some(id))
    }

    /// Drop one analytics configuration by id.
    pub async fn delete_bucket_analytics(
        &self,
        bucket: &str,
        id: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        Ok(self
            .meta
            .remove_config(bucket, ConfigKind::Analytics, Some(id))?)
    }

    /// All analytics configurations, as `(id, document)` pairs in id order.
    pub async fn list_bucket_analytics(
        &self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<(String, serde_json::Value)>> {
        self.list_docs(bucket, ConfigKind::Analytics, cancel).await
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    async fn put_doc<T: Serialize>(
        &self,
        bucket: &str,
        kind: ConfigKind,
        value: &T,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.write_config(bucket, kind, None, value)
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        bucket: &str,
        kind: ConfigKind,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<T>> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        self.read_config(bucket, kind, None)
    }

    async fn delete_doc(
        &self,
        bucket: &str,
        kind: ConfigKind,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        Ok(self.meta.remove_config(bucket, kind, None)?)
    }

    async fn list_docs(
        &self,
        bucket: &str,
        kind: ConfigKind,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<(String, serde_json::Value)>> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;
        let mut out = Vec::new();
        for (id, bytes) in self.meta.list_configs(bucket, kind)? {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| EngineError::Internal(anyhow::Error::new(e)))?;
            out.push((id, value));
        }
        Ok(out)
    }
}
