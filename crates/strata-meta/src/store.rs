//! [`MetaStore`]: typed operations over the fjall keyspaces.

use std::path::Path;

use fjall::{Database, Keyspace, KeyspaceCreateOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_types::{BucketRecord, PartRecord, UploadRecord, VersionRecord};
use tracing::debug;

use crate::error::MetaError;
use crate::keys;

type Result<T> = std::result::Result<T, MetaError>;

// ---------------------------------------------------------------------------
// ConfigKind
// ---------------------------------------------------------------------------

/// The per-bucket configuration name-spaces.
///
/// `Metrics` and `Analytics` documents are additionally keyed by an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// Versioning state.
    Versioning,
    /// Lifecycle rule set.
    Lifecycle,
    /// CORS rules.
    Cors,
    /// Bucket policy document.
    Policy,
    /// Server-side encryption.
    Encryption,
    /// Bucket tag set.
    Tagging,
    /// Replication configuration.
    Replication,
    /// Object lock configuration.
    ObjectLock,
    /// Public access block.
    PublicAccessBlock,
    /// Event notification configuration.
    Notification,
    /// Access logging configuration.
    Logging,
    /// Bucket location constraint.
    Location,
    /// Ownership controls.
    Ownership,
    /// Transfer acceleration state.
    Accelerate,
    /// Metrics configurations (id-keyed).
    Metrics,
    /// Analytics configurations (id-keyed).
    Analytics,
}

impl ConfigKind {
    /// Stable key segment for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Versioning => "versioning",
            Self::Lifecycle => "lifecycle",
            Self::Cors => "cors",
            Self::Policy => "policy",
            Self::Encryption => "encryption",
            Self::Tagging => "tagging",
            Self::Replication => "replication",
            Self::ObjectLock => "object-lock",
            Self::PublicAccessBlock => "public-access-block",
            Self::Notification => "notification",
            Self::Logging => "logging",
            Self::Location => "location",
            Self::Ownership => "ownership",
            Self::Accelerate => "accelerate",
            Self::Metrics => "metrics",
            Self::Analytics => "analytics",
        }
    }
}

// ---------------------------------------------------------------------------
// MetaStore
// ---------------------------------------------------------------------------

/// Durable, ordered metadata index.
///
/// Thread-safe; the underlying database serializes individual key writes.
/// Start-up tolerates both an empty directory (fresh install) and a
/// populated one (restart).
pub struct MetaStore {
    #[allow(dead_code)]
    db: Database,
    buckets: Keyspace,
    objects: Keyspace,
    versions: Keyspace,
    uploads: Keyspace,
    parts: Keyspace,
    configs: Keyspace,
}

impl std::fmt::Debug for MetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaStore").finish_non_exhaustive()
    }
}

impl MetaStore {
    /// Open (or create) the metadata store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Database`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path).open()?;
        let buckets = db.keyspace("buckets", KeyspaceCreateOptions::default)?;
        let objects = db.keyspace("objects", KeyspaceCreateOptions::default)?;
        let versions = db.keyspace("versions", KeyspaceCreateOptions::default)?;
        let uploads = db.keyspace("uploads", KeyspaceCreateOptions::default)?;
        let parts = db.keyspace("parts", KeyspaceCreateOptions::default)?;
        let configs = db.keyspace("configs", KeyspaceCreateOptions::default)?;
        Ok(Self {
            db,
            buckets,
            objects,
            versions,
            uploads,
            parts,
            configs,
        })
    }

    // ----- buckets -----

    /// Insert or replace a bucket record.
    pub fn put_bucket(&self, record: &BucketRecord) -> Result<()> {
        put_record(&self.buckets, record.name.as_bytes(), record)?;
        debug!(bucket = %record.name, "stored bucket record");
        Ok(())
    }

    /// Fetch a bucket record by name.
    pub fn get_bucket(&self, name: &str) -> Result<Option<BucketRecord>> {
        get_record(&self.buckets, name.as_bytes())
    }

    /// Remove a bucket record. Removing a missing bucket is a no-op.
    pub fn remove_bucket(&self, name: &str) -> Result<()> {
        self.buckets.remove(name.as_bytes())?;
        Ok(())
    }

    /// All bucket records, ordered by name.
    pub fn list_buckets(&self) -> Result<Vec<BucketRecord>> {
        let mut out = Vec::new();
        for guard in self.buckets.iter() {
            let value = guard.value()?;
            out.push(postcard::from_bytes(&value)?);
        }
        Ok(out)
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> Result<usize> {
        let mut count = 0;
        for guard in self.buckets.iter() {
            let _ = guard.key()?;
            count += 1;
        }
        Ok(count)
    }

    // ----- current objects (latest version per key) -----

    /// Set the current version for `(bucket, key)`.
    pub fn put_current(&self, record: &VersionRecord) -> Result<()> {
        let key = keys::object_key(&record.bucket, &record.key);
        put_record(&self.objects, &key, record)
    }

    /// Fetch the current version for `(bucket, key)`, delete markers included.
    pub fn get_current(&self, bucket: &str, key: &str) -> Result<Option<VersionRecord>> {
        get_record(&self.objects, &keys::object_key(bucket, key))
    }

    /// Drop the current pointer for `(bucket, key)`.
    pub fn remove_current(&self, bucket: &str, key: &str) -> Result<()> {
        self.objects.remove(keys::object_key(bucket, key))?;
        Ok(())
    }

    /// Scan current versions of a bucket in key order, starting at the first
    /// key `>= from_key` (pass `""` to scan from the beginning).
    pub fn scan_current<'a>(
        &'a self,
        bucket: &str,
        from_key: &str,
    ) -> impl Iterator<Item = Result<VersionRecord>> + 'a {
        let bound = keys::object_key(bucket, from_key);
        scan_records(&self.objects, keys::prefix(&[bucket]), bound)
    }

    // ----- version history -----

    /// Insert or replace a version record.
    pub fn put_version(&self, record: &VersionRecord) -> Result<()> {
        let key = keys::version_key(&record.bucket, &record.key, &record.version_id);
        put_record(&self.versions, &key, record)
    }

    /// Fetch one version of `(bucket, key)`.
    pub fn get_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> Result<Option<VersionRecord>> {
        get_record(&self.versions, &keys::version_key(bucket, key, version_id))
    }

    /// Remove one version of `(bucket, key)`. Missing versions are a no-op.
    pub fn remove_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<()> {
        self.versions
            .remove(keys::version_key(bucket, key, version_id))?;
        Ok(())
    }

    /// All versions of one key, in version-id order.
    pub fn list_key_versions(&self, bucket: &str, key: &str) -> Result<Vec<VersionRecord>> {
        scan_records(&self.versions, keys::prefix(&[bucket, key]), Vec::new()).collect()
    }

    /// Scan every version in a bucket in `(key, version_id)` order, starting
    /// at the first entry whose object key is `>= from_key`.
    pub fn scan_versions<'a>(
        &'a self,
        bucket: &str,
        from_key: &str,
    ) -> impl Iterator<Item = Result<VersionRecord>> + 'a {
        let bound = keys::object_key(bucket, from_key);
        scan_records(&self.versions, keys::prefix(&[bucket]), bound)
    }

    /// Whether any version (data or delete marker) exists in the bucket.
    pub fn has_versions(&self, bucket: &str) -> Result<bool> {
        has_any(&self.versions, &keys::prefix(&[bucket]))
    }

    /// Every version record in the store, across all buckets.
    pub fn iter_all_versions(&self) -> impl Iterator<Item = Result<VersionRecord>> + '_ {
        scan_records(&self.versions, Vec::new(), Vec::new())
    }

    // ----- multipart uploads -----

    /// Insert or replace an upload record.
    pub fn put_upload(&self, record: &UploadRecord) -> Result<()> {
        let key = keys::upload_key(&record.bucket, &record.key, &record.upload_id);
        put_record(&self.uploads, &key, record)?;
        debug!(
            bucket = %record.bucket,
            key = %record.key,
            upload_id = %record.upload_id,
            "stored upload record"
        );
        Ok(())
    }

    /// Fetch an upload record.
    pub fn get_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<Option<UploadRecord>> {
        get_record(&self.uploads, &keys::upload_key(bucket, key, upload_id))
    }

    /// Remove an upload record. Missing uploads are a no-op.
    pub fn remove_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.uploads
            .remove(keys::upload_key(bucket, key, upload_id))?;
        Ok(())
    }

    /// Uploads in a bucket whose key starts with `key_prefix`, in
    /// `(key, upload_id)` order.
    pub fn list_uploads(&self, bucket: &str, key_prefix: &str) -> Result<Vec<UploadRecord>> {
        let records: Vec<UploadRecord> =
            scan_records(&self.uploads, keys::prefix(&[bucket]), Vec::new())
                .collect::<Result<_>>()?;
        Ok(records
            .into_iter()
            .filter(|u| u.key.starts_with(key_prefix))
            .collect())
    }

    /// Whether any multipart upload is in flight in the bucket.
    pub fn has_uploads(&self, bucket: &str) -> Result<bool> {
        has_any(&self.uploads, &keys::prefix(&[bucket]))
    }

    // ----- staged parts -----

    /// Insert or replace a staged part record.
    pub fn put_part(&self, record: &PartRecord) -> Result<()> {
        let key = keys::part_key(
            &record.bucket,
            &record.key,
            &record.upload_id,
            record.part_number,
        );
        put_record(&self.parts, &key, record)
    }

    /// Fetch one staged part.
    pub fn get_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<Option<PartRecord>> {
        get_record(
            &self.parts,
            &keys::part_key(bucket, key, upload_id, part_number),
        )
    }

    /// All staged parts of one upload, in ascending part order.
    pub fn list_upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<Vec<PartRecord>> {
        scan_records(
            &self.parts,
            keys::prefix(&[bucket, key, upload_id]),
            Vec::new(),
        )
        .collect()
    }

    /// Remove every staged part of one upload.
    pub fn remove_upload_parts(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let prefix = keys::prefix(&[bucket, key, upload_id]);
        let mut stale = Vec::new();
        for guard in self.parts.prefix(&prefix) {
            stale.push(guard.key()?.to_vec());
        }
        for key in stale {
            self.parts.remove(key)?;
        }
        Ok(())
    }

    /// Every staged part record in the store, across all uploads.
    pub fn iter_all_parts(&self) -> impl Iterator<Item = Result<PartRecord>> + '_ {
        scan_records(&self.parts, Vec::new(), Vec::new())
    }

    // ----- per-bucket configurations -----

    /// Store a configuration document.
    pub fn put_config(
        &self,
        bucket: &str,
        kind: ConfigKind,
        id: Option<&str>,
        value: &[u8],
    ) -> Result<()> {
        self.configs
            .insert(keys::config_key(bucket, kind.as_str(), id), value)?;
        debug!(bucket, kind = kind.as_str(), "stored bucket configuration");
        Ok(())
    }

    /// Fetch a configuration document.
    pub fn get_config(
        &self,
        bucket: &str,
        kind: ConfigKind,
        id: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        match self.configs.get(keys::config_key(bucket, kind.as_str(), id))? {
            Some(value) => Ok(Some(value.to_vec())),
            None => Ok(None),
        }
    }

    /// Remove a configuration document. Missing documents are a no-op.
    pub fn remove_config(&self, bucket: &str, kind: ConfigKind, id: Option<&str>) -> Result<()> {
        self.configs
            .remove(keys::config_key(bucket, kind.as_str(), id))?;
        Ok(())
    }

    /// All id-keyed documents of one kind, as `(id, bytes)` pairs in id order.
    pub fn list_configs(&self, bucket: &str, kind: ConfigKind) -> Result<Vec<(String, Vec<u8>)>> {
        let prefix = keys::prefix(&[bucket, kind.as_str()]);
        let mut out = Vec::new();
        for guard in self.configs.prefix(&prefix) {
            let (key, value) = guard.into_inner()?;
            let id = key
                .get(prefix.len()..)
                .and_then(|rest| std::str::from_utf8(rest).ok())
                .ok_or_else(|| MetaError::Corrupt("config id is not valid UTF-8".to_owned()))?;
            out.push((id.to_owned(), value.to_vec()));
        }
        Ok(out)
    }

    /// Drop the bucket record and every configuration document of a bucket.
    ///
    /// Callers must have verified the bucket holds no versions or uploads.
    pub fn purge_bucket(&self, bucket: &str) -> Result<()> {
        let prefix = keys::prefix(&[bucket]);
        let mut stale = Vec::new();
        for guard in self.configs.prefix(&prefix) {
            stale.push(guard.key()?.to_vec());
        }
        for key in stale {
            self.configs.remove(key)?;
        }
        self.buckets.remove(bucket.as_bytes())?;
        debug!(bucket, "purged bucket metadata");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Keyspace helpers
// ---------------------------------------------------------------------------

fn put_record<T: Serialize>(ks: &Keyspace, key: &[u8], record: &T) -> Result<()> {
    let value = postcard::to_allocvec(record)?;
    ks.insert(key, value.as_slice())?;
    Ok(())
}

fn get_record<T: DeserializeOwned>(ks: &Keyspace, key: &[u8]) -> Result<Option<T>> {
    match ks.get(key)? {
        Some(value) => Ok(Some(postcard::from_bytes(&value)?)),
        None => Ok(None),
    }
}

fn has_any(ks: &Keyspace, prefix: &[u8]) -> Result<bool> {
    match ks.prefix(prefix).next() {
        Some(guard) => {
            let _ = guard.key()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Decode records under `prefix`, skipping raw keys below `lower_bound`.
///
/// An empty bound scans the whole prefix. The bound applies to the raw key
/// bytes, which is what makes continuation tokens cheap: the caller encodes
/// the next unread key and scanning resumes there.
fn scan_records<'a, T: DeserializeOwned>(
    ks: &'a Keyspace,
    prefix: Vec<u8>,
    lower_bound: Vec<u8>,
) -> impl Iterator<Item = Result<T>> + 'a {
    ks.prefix(prefix).filter_map(move |guard| match guard.into_inner() {
        Ok((key, value)) => {
            if !lower_bound.is_empty() && &key[..] < lower_bound.as_slice() {
                return None;
            }
            Some(postcard::from_bytes(&value).map_err(MetaError::from))
        }
        Err(e) => Some(Err(MetaError::from(e))),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use strata_types::{Owner, NULL_VERSION_ID};

    use super::*;

    fn open_store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let store = MetaStore::open(dir.path()).unwrap_or_else(|e| panic!("open failed: {e}"));
        (dir, store)
    }

    fn make_bucket(name: &str) -> BucketRecord {
        BucketRecord {
            name: name.to_owned(),
            created_at: Utc::now(),
            owner: Owner::default(),
        }
    }

    fn make_version(bucket: &str, key: &str, version_id: &str) -> VersionRecord {
        VersionRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            version_id: version_id.to_owned(),
            size: 42,
            etag: "\"etag\"".to_owned(),
            content_type: Some("text/plain".to_owned()),
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

    fn make_upload(bucket: &str, key: &str, upload_id: &str) -> UploadRecord {
        UploadRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            upload_id: upload_id.to_owned(),
            initiated: Utc::now(),
            content_type: None,
            content_encoding: None,
            cache_control: None,
            user_metadata: HashMap::new(),
            storage_class: "STANDARD".to_owned(),
            owner: Owner::default(),
        }
    }

    fn make_part(bucket: &str, key: &str, upload_id: &str, part_number: u32) -> PartRecord {
        PartRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            upload_id: upload_id.to_owned(),
            part_number,
            etag: format!("\"part-{part_number}\""),
            size: 1024,
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_should_roundtrip_bucket_record() {
        let (_dir, store) = open_store();
        store
            .put_bucket(&make_bucket("b1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let got = store
            .get_bucket("b1")
            .unwrap_or_else(|e| panic!("get failed: {e}"));
        assert_eq!(got.map(|b| b.name), Some("b1".to_owned()));
        assert!(store.get_bucket("nope").unwrap().is_none());
    }

    #[test]
    fn test_should_list_buckets_in_name_order() {
        let (_dir, store) = open_store();
        for name in ["charlie", "alpha", "bravo"] {
            store
                .put_bucket(&make_bucket(name))
                .unwrap_or_else(|e| panic!("put {name} failed: {e}"));
        }

        let names: Vec<String> = store
            .list_buckets()
            .unwrap_or_else(|e| panic!("list failed: {e}"))
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
        assert_eq!(store.bucket_count().unwrap(), 3);
    }

    #[test]
    fn test_should_roundtrip_current_version() {
        let (_dir, store) = open_store();
        let record = make_version("b", "k", NULL_VERSION_ID);
        store
            .put_current(&record)
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let got = store
            .get_current("b", "k")
            .unwrap_or_else(|e| panic!("get failed: {e}"))
            .unwrap_or_else(|| panic!("missing record"));
        assert_eq!(got.size, 42);
        assert_eq!(got.version_id, NULL_VERSION_ID);

        store
            .remove_current("b", "k")
            .unwrap_or_else(|e| panic!("remove failed: {e}"));
        assert!(store.get_current("b", "k").unwrap().is_none());
    }

    #[test]
    fn test_should_scan_current_in_key_order_with_bound() {
        let (_dir, store) = open_store();
        for key in ["a", "b", "c", "d"] {
            store
                .put_current(&make_version("b", key, NULL_VERSION_ID))
                .unwrap_or_else(|e| panic!("put {key} failed: {e}"));
        }
        // A different bucket must not leak into the scan.
        store
            .put_current(&make_version("bb", "a", NULL_VERSION_ID))
            .unwrap_or_else(|e| panic!("put other bucket failed: {e}"));

        let keys: Vec<String> = store
            .scan_current("b", "")
            .collect::<Result<Vec<_>>>()
            .unwrap_or_else(|e| panic!("scan failed: {e}"))
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);

        let keys: Vec<String> = store
            .scan_current("b", "c")
            .collect::<Result<Vec<_>>>()
            .unwrap_or_else(|e| panic!("bounded scan failed: {e}"))
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["c", "d"]);
    }

    #[test]
    fn test_should_keep_key_versions_isolated() {
        let (_dir, store) = open_store();
        // Key "a" and key "a/b" must not see each other's versions.
        store
            .put_version(&make_version("b", "a", "v1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_version(&make_version("b", "a/b", "v2"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let of_a = store
            .list_key_versions("b", "a")
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(of_a.len(), 1);
        assert_eq!(of_a[0].version_id, "v1");

        let of_ab = store
            .list_key_versions("b", "a/b")
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(of_ab.len(), 1);
        assert_eq!(of_ab[0].version_id, "v2");
    }

    #[test]
    fn test_should_report_version_presence() {
        let (_dir, store) = open_store();
        assert!(!store.has_versions("b").unwrap());
        store
            .put_version(&make_version("b", "k", "v1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        assert!(store.has_versions("b").unwrap());
        store
            .remove_version("b", "k", "v1")
            .unwrap_or_else(|e| panic!("remove failed: {e}"));
        assert!(!store.has_versions("b").unwrap());
    }

    #[test]
    fn test_should_roundtrip_uploads() {
        let (_dir, store) = open_store();
        store
            .put_upload(&make_upload("b", "k", "u1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        assert!(store.get_upload("b", "k", "u1").unwrap().is_some());
        assert!(store.get_upload("b", "k", "u2").unwrap().is_none());
        assert!(store.has_uploads("b").unwrap());

        store
            .remove_upload("b", "k", "u1")
            .unwrap_or_else(|e| panic!("remove failed: {e}"));
        assert!(!store.has_uploads("b").unwrap());
    }

    #[test]
    fn test_should_filter_uploads_by_key_prefix() {
        let (_dir, store) = open_store();
        store
            .put_upload(&make_upload("b", "photos/cat.jpg", "u1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_upload(&make_upload("b", "photos/dog.jpg", "u2"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_upload(&make_upload("b", "docs/a.txt", "u3"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let uploads = store
            .list_uploads("b", "photos/")
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(uploads.len(), 2);

        let all = store
            .list_uploads("b", "")
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_should_list_parts_in_numeric_order() {
        let (_dir, store) = open_store();
        for part_number in [10, 2, 1] {
            store
                .put_part(&make_part("b", "k", "u1", part_number))
                .unwrap_or_else(|e| panic!("put part {part_number} failed: {e}"));
        }

        let parts = store
            .list_upload_parts("b", "k", "u1")
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn test_should_remove_all_parts_of_one_upload() {
        let (_dir, store) = open_store();
        store
            .put_part(&make_part("b", "k", "u1", 1))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_part(&make_part("b", "k", "u1", 2))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_part(&make_part("b", "k", "u2", 1))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        store
            .remove_upload_parts("b", "k", "u1")
            .unwrap_or_else(|e| panic!("remove failed: {e}"));

        assert!(store.list_upload_parts("b", "k", "u1").unwrap().is_empty());
        assert_eq!(store.list_upload_parts("b", "k", "u2").unwrap().len(), 1);
    }

    #[test]
    fn test_should_roundtrip_configs() {
        let (_dir, store) = open_store();
        store
            .put_config("b", ConfigKind::Policy, None, br#"{"Version":"2012-10-17"}"#)
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let got = store
            .get_config("b", ConfigKind::Policy, None)
            .unwrap_or_else(|e| panic!("get failed: {e}"));
        assert_eq!(got.as_deref(), Some(br#"{"Version":"2012-10-17"}"#.as_slice()));

        store
            .remove_config("b", ConfigKind::Policy, None)
            .unwrap_or_else(|e| panic!("remove failed: {e}"));
        assert!(store.get_config("b", ConfigKind::Policy, None).unwrap().is_none());
    }

    #[test]
    fn test_should_list_id_keyed_configs() {
        let (_dir, store) = open_store();
        store
            .put_config("b", ConfigKind::Metrics, Some("m2"), b"two")
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_config("b", ConfigKind::Metrics, Some("m1"), b"one")
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_config("b", ConfigKind::Analytics, Some("a1"), b"other-kind")
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let metrics = store
            .list_configs("b", ConfigKind::Metrics)
            .unwrap_or_else(|e| panic!("list failed: {e}"));
        let ids: Vec<&str> = metrics.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_should_purge_bucket_configs_and_record() {
        let (_dir, store) = open_store();
        store
            .put_bucket(&make_bucket("b"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_config("b", ConfigKind::Cors, None, b"[]")
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_config("b", ConfigKind::Tagging, None, b"{}")
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        store
            .purge_bucket("b")
            .unwrap_or_else(|e| panic!("purge failed: {e}"));

        assert!(store.get_bucket("b").unwrap().is_none());
        assert!(store.get_config("b", ConfigKind::Cors, None).unwrap().is_none());
        assert!(store.get_config("b", ConfigKind::Tagging, None).unwrap().is_none());
    }

    #[test]
    fn test_should_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));

        {
            let store =
                MetaStore::open(dir.path()).unwrap_or_else(|e| panic!("open failed: {e}"));
            store
                .put_bucket(&make_bucket("durable"))
                .unwrap_or_else(|e| panic!("put failed: {e}"));
            store
                .put_current(&make_version("durable", "k", NULL_VERSION_ID))
                .unwrap_or_else(|e| panic!("put failed: {e}"));
        }

        let store = MetaStore::open(dir.path()).unwrap_or_else(|e| panic!("reopen failed: {e}"));
        assert!(store.get_bucket("durable").unwrap().is_some());
        assert!(store.get_current("durable", "k").unwrap().is_some());
    }

    #[test]
    fn test_should_iterate_all_versions_and_parts() {
        let (_dir, store) = open_store();
        store
            .put_version(&make_version("b1", "k", "v1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_version(&make_version("b2", "k", "v1"))
            .unwrap_or_else(|e| panic!("put failed: {e}"));
        store
            .put_part(&make_part("b1", "k", "u", 1))
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let versions: Vec<VersionRecord> = store
            .iter_all_versions()
            .collect::<Result<_>>()
            .unwrap_or_else(|e| panic!("iterate failed: {e}"));
        assert_eq!(versions.len(), 2);

        let parts: Vec<PartRecord> = store
            .iter_all_parts()
            .collect::<Result<_>>()
            .unwrap_or_else(|e| panic!("iterate failed: {e}"));
        assert_eq!(parts.len(), 1);
    }
}
