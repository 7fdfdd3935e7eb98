//! Bucket records and per-bucket configuration documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::{Owner, RetentionMode};

// ---------------------------------------------------------------------------
// BucketRecord
// ---------------------------------------------------------------------------

/// The persisted identity of a bucket.
///
/// Everything configurable about a bucket (versioning, lifecycle, CORS, ...)
/// lives in its own config document so each can be replaced atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRecord {
    /// Bucket name (3-63 chars, DNS-label rules).
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// The bucket owner.
    pub owner: Owner,
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Bucket versioning state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning has never been configured.
    #[default]
    Unset,
    /// Versioning is enabled: every put mints a new version.
    Enabled,
    /// Versioning is suspended: puts overwrite the `"null"` slot, history
    /// is retained.
    Suspended,
}

impl VersioningStatus {
    /// Whether new puts should receive a generated version id.
    #[must_use]
    pub fn mints_versions(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Bucket versioning configuration document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Versioning state.
    pub status: VersioningStatus,
    /// Whether MFA delete is enabled.
    #[serde(default)]
    pub mfa_delete: bool,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Whether a lifecycle rule is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleRuleStatus {
    /// Rule is evaluated by the worker.
    Enabled,
    /// Rule is retained but ignored.
    Disabled,
}

/// Expiration action of a lifecycle rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiration {
    /// Delete objects this many days after their last modification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Delete objects once this instant has passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Remove delete markers whose key has no remaining data versions.
    #[serde(default)]
    pub expired_object_delete_marker: bool,
}

/// Storage-class transition action of a lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition this many days after last modification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Transition once this instant has passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Target storage class.
    pub storage_class: String,
}

/// Expiration of non-latest versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentVersionExpiration {
    /// Delete a version this many days after it stopped being latest.
    pub noncurrent_days: u32,
}

/// One declarative lifecycle rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Rule identifier, unique within the bucket.
    pub id: String,
    /// Key prefix this rule applies to (empty = whole bucket).
    #[serde(default)]
    pub prefix: String,
    /// Whether the rule is in force.
    pub status: LifecycleRuleStatus,
    /// Expiration action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    /// Storage-class transitions, evaluated in order.
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Expiration of non-latest versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
}

impl LifecycleRule {
    /// Whether the worker should evaluate this rule.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self.status, LifecycleRuleStatus::Enabled)
    }
}

// ---------------------------------------------------------------------------
// Object lock
// ---------------------------------------------------------------------------

/// Default retention applied to new versions when object lock is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRetention {
    /// Retention mode applied by default.
    pub mode: RetentionMode,
    /// Retention period in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Retention period in years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<u32>,
}

/// Bucket object-lock configuration document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLockConfig {
    /// Whether object lock is enabled for the bucket.
    pub enabled: bool,
    /// Optional default retention rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_retention: Option<DefaultRetention>,
}

// ---------------------------------------------------------------------------
// Other typed configurations
// ---------------------------------------------------------------------------

/// A single CORS rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsRule {
    /// Optional rule identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Origins allowed to make cross-domain requests.
    pub allowed_origins: Vec<String>,
    /// HTTP methods the origin may execute.
    pub allowed_methods: Vec<String>,
    /// Headers allowed in a pre-flight request.
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to the browser.
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Pre-flight cache lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<i32>,
}

/// Server-side encryption configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEncryption {
    /// Encryption algorithm (`AES256`, `aws:kms`).
    pub sse_algorithm: String,
    /// KMS master key id for `aws:kms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
    /// Whether a bucket key is enabled for SSE-KMS.
    #[serde(default)]
    pub bucket_key_enabled: bool,
}

/// Public access block configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct PublicAccessBlockConfig {
    /// Block public ACLs.
    #[serde(default)]
    pub block_public_acls: bool,
    /// Ignore public ACLs.
    #[serde(default)]
    pub ignore_public_acls: bool,
    /// Block public bucket policies.
    #[serde(default)]
    pub block_public_policy: bool,
    /// Restrict public bucket policies.
    #[serde(default)]
    pub restrict_public_buckets: bool,
}

/// Bucket ownership controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipControls {
    /// The object ownership setting (`BucketOwnerPreferred`, `ObjectWriter`,
    /// `BucketOwnerEnforced`).
    pub object_ownership: String,
}
