//! Payload identifiers for the byte store.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifies one payload in the byte store.
///
/// Derived deterministically from the logical coordinates of the data it
/// holds, so the engine never has to persist a separate payload pointer:
/// re-deriving the id from a metadata record always finds the blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobId([u8; 32]);

impl BlobId {
    /// Id of the payload backing an object version.
    #[must_use]
    pub fn for_object(bucket: &str, key: &str, version_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bucket.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(version_id.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Id of a staged multipart part payload.
    #[must_use]
    pub fn for_part(bucket: &str, key: &str, upload_id: &str, part_number: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bucket.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(upload_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(part_number.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// The raw 32 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a blob id back from its 64-character hex form.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl From<[u8; 32]> for BlobId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_derive_stable_object_id() {
        let a = BlobId::for_object("bucket", "key", "v1");
        let b = BlobId::for_object("bucket", "key", "v1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_should_distinguish_coordinates() {
        let base = BlobId::for_object("bucket", "key", "v1");
        assert_ne!(base, BlobId::for_object("bucket", "key", "v2"));
        assert_ne!(base, BlobId::for_object("bucket", "other", "v1"));
        assert_ne!(base, BlobId::for_object("other", "key", "v1"));
    }

    #[test]
    fn test_should_not_collide_on_segment_boundaries() {
        // The separator prevents ("ab", "c") from matching ("a", "bc").
        assert_ne!(
            BlobId::for_object("ab", "c", "v"),
            BlobId::for_object("a", "bc", "v")
        );
    }

    #[test]
    fn test_should_roundtrip_hex() {
        let id = BlobId::for_part("b", "k", "upload-1", 7);
        let hex = id.to_string();
        assert_eq!(hex.len(), 64);
        assert_eq!(BlobId::from_hex(&hex), Some(id));
    }

    #[test]
    fn test_should_reject_bad_hex() {
        assert!(BlobId::from_hex("zz").is_none());
        assert!(BlobId::from_hex("abcd").is_none());
    }
}
