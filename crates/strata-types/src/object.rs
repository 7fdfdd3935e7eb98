//! Object version records and the per-version lock state.
//!
//! A [`VersionRecord`] is one immutable snapshot of an object: its payload
//! coordinates, HTTP-visible metadata, and the optional retention and legal
//! hold records that gate deletion.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BlobId;

/// Version id sentinel for un-versioned and suspended buckets.
pub const NULL_VERSION_ID: &str = "null";

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// The owner of a bucket or object version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Canonical user id.
    pub id: String,
    /// Display name.
    pub display_name: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            id: "02d6176db174dc93cb1b899f7c6078f08654445fe8cf1b6ce98d8855f66bdbf4".to_owned(),
            display_name: "strata".to_owned(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.display_name, self.id)
    }
}

// ---------------------------------------------------------------------------
// Retention / legal hold
// ---------------------------------------------------------------------------

/// Object lock retention mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionMode {
    /// Deletion blocked, but bypassable by an authorized caller.
    Governance,
    /// Deletion blocked absolutely until the retain-until date.
    Compliance,
}

impl RetentionMode {
    /// The wire-format string (`GOVERNANCE` / `COMPLIANCE`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Governance => "GOVERNANCE",
            Self::Compliance => "COMPLIANCE",
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`RetentionMode`] fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown retention mode: {0}")]
pub struct ParseRetentionModeError(String);

impl FromStr for RetentionMode {
    type Err = ParseRetentionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOVERNANCE" => Ok(Self::Governance),
            "COMPLIANCE" => Ok(Self::Compliance),
            _ => Err(ParseRetentionModeError(s.to_owned())),
        }
    }
}

/// A time-bound prohibition on deleting one object version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionRecord {
    /// Retention mode.
    pub mode: RetentionMode,
    /// The instant the prohibition lapses.
    pub retain_until: DateTime<Utc>,
}

/// Legal hold state for one object version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalHoldStatus {
    /// Hold active: the version cannot be deleted regardless of retention.
    On,
    /// No hold.
    #[default]
    Off,
}

impl LegalHoldStatus {
    /// The wire-format string (`ON` / `OFF`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Whether the hold is active.
    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

// ---------------------------------------------------------------------------
// PartInfo
// ---------------------------------------------------------------------------

/// One entry of the parts manifest carried by a completed multipart object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    /// Part number (1-based).
    pub part_number: u32,
    /// Quoted hex MD5 of the part's bytes.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
}

// ---------------------------------------------------------------------------
// VersionRecord
// ---------------------------------------------------------------------------

/// One persisted object version (or delete marker).
///
/// Delete markers are versions with `is_delete_marker = true`, zero size, and
/// no payload; everything else has a payload in the byte store addressable
/// via [`VersionRecord::blob_id`]. Fields stay un-annotated: the record is
/// persisted through a positional codec, so every field must always be
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Owning bucket.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Version id, or [`NULL_VERSION_ID`] for the un-versioned slot.
    pub version_id: String,
    /// Payload size in bytes (0 for delete markers).
    pub size: u64,
    /// Quoted entity tag (empty for delete markers).
    pub etag: String,
    /// MIME type.
    pub content_type: Option<String>,
    /// Content encoding (e.g. `gzip`).
    pub content_encoding: Option<String>,
    /// Cache control directives.
    pub cache_control: Option<String>,
    /// User-defined metadata, keys in their stripped lower-case form.
    pub user_metadata: HashMap<String, String>,
    /// Storage class (default `STANDARD`).
    pub storage_class: String,
    /// When this version was written.
    pub last_modified: DateTime<Utc>,
    /// Whether this version is a delete marker.
    pub is_delete_marker: bool,
    /// Parts manifest when the version was assembled from a multipart upload.
    pub parts: Option<Vec<PartInfo>>,
    /// Owner of this version.
    pub owner: Owner,
    /// Active retention, if any.
    pub retention: Option<RetentionRecord>,
    /// Legal hold, if any was ever set.
    pub legal_hold: Option<LegalHoldStatus>,
}

impl VersionRecord {
    /// Identifier of this version's payload in the byte store.
    ///
    /// Meaningless for delete markers, which carry no payload.
    #[must_use]
    pub fn blob_id(&self) -> BlobId {
        BlobId::for_object(&self.bucket, &self.key, &self.version_id)
    }

    /// Whether this version sits in the un-versioned slot.
    #[must_use]
    pub fn is_null_version(&self) -> bool {
        self.version_id == NULL_VERSION_ID
    }

    /// Whether an active legal hold blocks deletion.
    #[must_use]
    pub fn has_active_legal_hold(&self) -> bool {
        self.legal_hold.is_some_and(|h| h.is_on())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(version_id: &str) -> VersionRecord {
        VersionRecord {
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            version_id: version_id.to_owned(),
            size: 3,
            etag: "\"abc\"".to_owned(),
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
    fn test_should_detect_null_version() {
        assert!(make_record(NULL_VERSION_ID).is_null_version());
        assert!(!make_record("175f3a-abc").is_null_version());
    }

    #[test]
    fn test_should_derive_blob_id_from_coordinates() {
        let record = make_record("v1");
        assert_eq!(record.blob_id(), BlobId::for_object("b", "k", "v1"));
    }

    #[test]
    fn test_should_report_active_legal_hold() {
        let mut record = make_record("v1");
        assert!(!record.has_active_legal_hold());
        record.legal_hold = Some(LegalHoldStatus::Off);
        assert!(!record.has_active_legal_hold());
        record.legal_hold = Some(LegalHoldStatus::On);
        assert!(record.has_active_legal_hold());
    }

    #[test]
    fn test_should_roundtrip_retention_mode_strings() {
        for (s, mode) in [
            ("GOVERNANCE", RetentionMode::Governance),
            ("COMPLIANCE", RetentionMode::Compliance),
        ] {
            let parsed: RetentionMode = s.parse().unwrap_or_else(|_| panic!("parse {s}"));
            assert_eq!(parsed, mode);
            assert_eq!(parsed.as_str(), s);
        }
        assert!("governance".parse::<RetentionMode>().is_err());
    }

    #[test]
    fn test_should_default_legal_hold_to_off() {
        assert_eq!(LegalHoldStatus::default(), LegalHoldStatus::Off);
        assert!(!LegalHoldStatus::default().is_on());
    }
}
