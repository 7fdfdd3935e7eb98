//! Multipart upload records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::Owner;

/// An in-flight multipart upload.
///
/// Carries the metadata supplied at initiation; it is copied verbatim onto
/// the object version minted at completion. Persisted through a positional
/// codec, so fields carry no conditional-skip annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Owning bucket.
    pub bucket: String,
    /// The key the completed object will occupy.
    pub key: String,
    /// Opaque upload identifier.
    pub upload_id: String,
    /// When the upload was initiated.
    pub initiated: DateTime<Utc>,
    /// MIME type for the eventual object.
    pub content_type: Option<String>,
    /// Content encoding for the eventual object.
    pub content_encoding: Option<String>,
    /// Cache control for the eventual object.
    pub cache_control: Option<String>,
    /// User metadata for the eventual object.
    pub user_metadata: HashMap<String, String>,
    /// Storage class for the eventual object.
    pub storage_class: String,
    /// Who initiated the upload.
    pub owner: Owner,
}

/// One staged part of a multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    /// Owning bucket.
    pub bucket: String,
    /// The key of the upload this part belongs to.
    pub key: String,
    /// The upload this part belongs to.
    pub upload_id: String,
    /// Part number (1-based).
    pub part_number: u32,
    /// Quoted hex MD5 of this part's bytes.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
    /// When this part was uploaded (or last replaced).
    pub last_modified: DateTime<Utc>,
}
