//! Bucket-name and object-key validation.

use crate::error::{EngineError, EngineResult};

/// Longest accepted object key, in bytes.
const MAX_KEY_LEN: usize = 1024;

/// Validate a bucket name against the DNS-label rules.
///
/// 3-63 characters of lowercase letters, digits, hyphens, and dots; must
/// start and end with a letter or digit; no consecutive dots and no dot
/// adjacent to a hyphen. IP-shaped names are accepted.
///
/// # Errors
///
/// Returns [`EngineError::InvalidBucketName`] naming the violated rule.
pub(crate) fn validate_bucket_name(name: &str) -> EngineResult<()> {
    let fail = |reason: &str| {
        Err(EngineError::InvalidBucketName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if name.len() < 3 || name.len() > 63 {
        return fail("must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return fail("may only contain lowercase letters, digits, hyphens, and dots");
    }

    let bytes = name.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(bytes[0]) || !edge_ok(bytes[bytes.len() - 1]) {
        return fail("must start and end with a letter or digit");
    }

    for pair in bytes.windows(2) {
        match pair {
            b".." => return fail("must not contain consecutive dots"),
            b".-" | b"-." => return fail("must not place a dot next to a hyphen"),
            _ => {}
        }
    }

    Ok(())
}

/// Validate an object key.
///
/// # Errors
///
/// Returns [`EngineError::InvalidObjectName`] for empty, oversized, or
/// NUL-containing keys.
pub(crate) fn validate_object_key(key: &str) -> EngineResult<()> {
    let fail = |reason: &str| {
        Err(EngineError::InvalidObjectName {
            key: key.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if key.is_empty() {
        return fail("must not be empty");
    }
    if key.len() > MAX_KEY_LEN {
        return fail("must not exceed 1024 bytes");
    }
    if key.bytes().any(|b| b == 0) {
        return fail("must not contain NUL bytes");
    }
    Ok(())
}
