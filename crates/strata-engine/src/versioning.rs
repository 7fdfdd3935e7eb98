//! Version and upload identifier generation.
//!
//! Both carry a nano-precision timestamp prefix followed by 128 random bits
//! in hex, so ids are unforgeable, unique across the server's lifetime, and
//! sort by creation order within a key.

use chrono::{DateTime, Utc};
use strata_types::VersioningStatus;

/// Generate a version id: 16 hex chars of nanosecond timestamp followed by
/// 32 hex chars of randomness.
#[must_use]
pub(crate) fn generate_version_id(now: DateTime<Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_default();
    format!(
        "{:016x}{}",
        nanos as u64,
        uuid::Uuid::new_v4().simple()
    )
}

/// Generate a multipart upload id: `<nano timestamp>-<128-bit random hex>`.
#[must_use]
pub(crate) fn generate_upload_id(now: DateTime<Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}", nanos, uuid::Uuid::new_v4().simple())
}

/// The version id a put receives under the given versioning status.
///
/// `Unset` and `Suspended` both write the `"null"` slot; only `Enabled`
/// mints fresh ids.
#[must_use]
pub(crate) fn version_id_for_put(status: VersioningStatus, now: DateTime<Utc>) -> String {
    if status.mints_versions() {
        generate_version_id(now)
    } else {
        strata_types::NULL_VERSION_ID.to_owned()
    }
}
