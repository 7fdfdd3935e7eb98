//! Typed operation inputs and outputs for the [`crate::ObjectService`]
//! facade.
//!
//! These are engine-level shapes: the wire layer converts HTTP requests into
//! them and renders them back out as XML. Version ids use the `"null"`
//! sentinel rather than `Option` so the §4.5 semantics stay visible.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use strata_store::BodyReader;
use strata_types::VersionRecord;

// ---------------------------------------------------------------------------
// Put / Get / Head / Delete
// ---------------------------------------------------------------------------

/// Options for `put_object`.
#[derive(Default)]
pub struct PutObjectOptions {
    /// MIME type.
    pub content_type: Option<String>,
    /// Content encoding.
    pub content_encoding: Option<String>,
    /// Cache control directives.
    pub cache_control: Option<String>,
    /// User metadata; keys are stored case-insensitively (lower-cased).
    pub user_metadata: HashMap<String, String>,
    /// Storage class (defaults to `STANDARD`).
    pub storage_class: Option<String>,
}

/// Result of `put_object`.
#[derive(Debug, Clone)]
pub struct PutObjectResult {
    /// Version id of the written version (`"null"` when un-versioned).
    pub version_id: String,
    /// Quoted ETag of the written bytes.
    pub etag: String,
    /// Number of bytes written.
    pub size: u64,
}

/// An inclusive byte range request; `end` defaults to the last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive); `None` means through the end.
    pub end: Option<u64>,
}

/// Options for `get_object` and `head_object`.
#[derive(Default)]
pub struct GetObjectOptions {
    /// Read this specific version instead of the latest.
    pub version_id: Option<String>,
    /// Fail with `PreconditionFailed` unless the ETag matches.
    pub if_match: Option<String>,
    /// Fail with `NotModified` when the ETag matches.
    pub if_none_match: Option<String>,
    /// Fail with `NotModified` unless modified after this instant.
    pub if_modified_since: Option<DateTime<Utc>>,
    /// Fail with `PreconditionFailed` when modified after this instant.
    pub if_unmodified_since: Option<DateTime<Utc>>,
    /// Byte range to read.
    pub range: Option<ByteRange>,
}

/// Result of `get_object`: metadata plus a streaming body.
pub struct GetObjectResult {
    /// The version that was read.
    pub record: VersionRecord,
    /// Payload stream (the requested range of it).
    pub body: BodyReader,
    /// Number of bytes `body` will yield.
    pub content_length: u64,
    /// `(start, end, total)` when a range was applied.
    pub content_range: Option<(u64, u64, u64)>,
}

impl std::fmt::Debug for GetObjectResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectResult")
            .field("key", &self.record.key)
            .field("version_id", &self.record.version_id)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Options for `delete_object`.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectOptions {
    /// Delete this specific version instead of the latest.
    pub version_id: Option<String>,
    /// Caller carries the governance-bypass capability.
    pub bypass_governance: bool,
}

/// Result of `delete_object`.
#[derive(Debug, Clone)]
pub struct DeleteObjectResult {
    /// Whether the operation created (or removed) a delete marker.
    pub delete_marker: bool,
    /// The version id the delete applied to or minted, if any.
    pub version_id: Option<String>,
}

/// One key (and optional version) in a batch delete.
#[derive(Debug, Clone)]
pub struct ObjectIdentifier {
    /// The object key.
    pub key: String,
    /// Optional specific version.
    pub version_id: Option<String>,
}

/// One successful entry of a batch delete.
#[derive(Debug, Clone)]
pub struct DeletedObject {
    /// The deleted key.
    pub key: String,
    /// The version id the delete applied to or minted, if any.
    pub version_id: Option<String>,
    /// Whether a delete marker was involved.
    pub delete_marker: bool,
}

/// Result of `delete_objects`.
#[derive(Debug, Default)]
pub struct DeleteObjectsResult {
    /// Keys that were deleted (or no-op'd, matching S3 semantics).
    pub deleted: Vec<DeletedObject>,
    /// Keys that failed, with the error that stopped them.
    pub errors: Vec<(ObjectIdentifier, crate::EngineError)>,
}

// ---------------------------------------------------------------------------
// Copy
// ---------------------------------------------------------------------------

/// Whether a copy carries the source metadata or replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataDirective {
    /// Destination inherits the source's metadata.
    #[default]
    Copy,
    /// Destination uses the metadata supplied in the options.
    Replace,
}

/// Options for `copy_object`.
#[derive(Default)]
pub struct CopyObjectOptions {
    /// Copy this specific source version instead of the latest.
    pub src_version_id: Option<String>,
    /// Copy or replace metadata.
    pub metadata_directive: MetadataDirective,
    /// Replacement metadata, used under [`MetadataDirective::Replace`].
    pub metadata: PutObjectOptions,
    /// Storage class override for the destination.
    pub storage_class: Option<String>,
}

/// Result of `copy_object`.
#[derive(Debug, Clone)]
pub struct CopyObjectResult {
    /// Version id minted for the destination.
    pub version_id: String,
    /// ETag computed from the streamed bytes.
    pub etag: String,
    /// Bytes copied.
    pub size: u64,
    /// When the destination version was written.
    pub last_modified: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// Options for `create_multipart_upload` (the eventual object's metadata).
#[derive(Default)]
pub struct CreateMultipartOptions {
    /// MIME type.
    pub content_type: Option<String>,
    /// Content encoding.
    pub content_encoding: Option<String>,
    /// Cache control directives.
    pub cache_control: Option<String>,
    /// User metadata.
    pub user_metadata: HashMap<String, String>,
    /// Storage class (defaults to `STANDARD`).
    pub storage_class: Option<String>,
}

/// Result of `upload_part`.
#[derive(Debug, Clone)]
pub struct UploadPartResult {
    /// Quoted ETag of the staged part.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
}

/// One entry of the client's completion manifest.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    /// Part number being committed.
    pub part_number: u32,
    /// The ETag the client observed when uploading this part.
    pub etag: String,
}

/// Options for `list_parts`.
#[derive(Debug, Clone, Default)]
pub struct ListPartsOptions {
    /// Return parts with numbers strictly greater than this.
    pub part_number_marker: Option<u32>,
    /// Page size (default 1000).
    pub max_parts: Option<usize>,
}

/// Result of `list_parts`.
#[derive(Debug, Clone)]
pub struct ListPartsResult {
    /// The requested page of parts, ascending by part number.
    pub parts: Vec<strata_types::PartRecord>,
    /// Whether more parts exist.
    pub is_truncated: bool,
    /// Marker to resume from.
    pub next_part_number_marker: Option<u32>,
}

/// Options for `list_multipart_uploads`.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsOptions {
    /// Only uploads whose key starts with this prefix.
    pub prefix: String,
    /// Page size (default 1000).
    pub max_uploads: Option<usize>,
}

/// Result of `list_multipart_uploads`.
#[derive(Debug, Clone)]
pub struct ListMultipartUploadsResult {
    /// In-flight uploads ordered by `(key, upload_id)`.
    pub uploads: Vec<strata_types::UploadRecord>,
    /// Whether more uploads exist.
    pub is_truncated: bool,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Options for `list_objects`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOptions {
    /// Only keys starting with this prefix.
    pub prefix: String,
    /// Collapse keys sharing a delimited sub-prefix into common prefixes.
    pub delimiter: String,
    /// Page size (default 1000, clamped to the configured cap).
    pub max_keys: Option<usize>,
    /// Resume token from a previous truncated response.
    pub continuation_token: Option<String>,
}

/// Result of `list_objects`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    /// Current object versions in key order (no delete markers).
    pub objects: Vec<VersionRecord>,
    /// Collapsed prefixes, de-duplicated, in sort order.
    pub common_prefixes: Vec<String>,
    /// Whether more entries exist.
    pub is_truncated: bool,
    /// The next unread key, stable across concurrent inserts.
    pub next_continuation_token: Option<String>,
}

/// Options for `list_object_versions`.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsOptions {
    /// Only keys starting with this prefix.
    pub prefix: String,
    /// Resume after this key.
    pub key_marker: Option<String>,
    /// Resume after this version of `key_marker`.
    pub version_id_marker: Option<String>,
    /// Page size (default 1000, clamped to the configured cap).
    pub max_keys: Option<usize>,
}

/// One entry of a version listing.
#[derive(Debug, Clone)]
pub struct VersionSummary {
    /// The version (data or delete marker).
    pub record: VersionRecord,
    /// Whether this is the key's latest version.
    pub is_latest: bool,
}

/// Result of `list_object_versions`.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsResult {
    /// Versions in key order, newest first within each key.
    pub versions: Vec<VersionSummary>,
    /// Whether more entries exist.
    pub is_truncated: bool,
    /// Key to resume from.
    pub next_key_marker: Option<String>,
    /// Version id to resume from.
    pub next_version_id_marker: Option<String>,
}
