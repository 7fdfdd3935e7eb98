//! Key layout for the metadata keyspaces.
//!
//! Path segments are joined with `\0`, a byte that cannot appear in bucket
//! names or object keys, so a prefix scan of `bucket \0 key \0` can never
//! match a sibling key that merely shares a textual prefix. Part numbers
//! are zero-padded to keep byte order equal to numeric order.

/// Segment separator.
pub(crate) const SEP: u8 = 0;

/// `bucket \0 key`
pub(crate) fn object_key(bucket: &str, key: &str) -> Vec<u8> {
    join(&[bucket.as_bytes(), key.as_bytes()])
}

/// `bucket \0 key \0 version_id`
pub(crate) fn version_key(bucket: &str, key: &str, version_id: &str) -> Vec<u8> {
    join(&[bucket.as_bytes(), key.as_bytes(), version_id.as_bytes()])
}

/// `bucket \0 key \0 upload_id`
pub(crate) fn upload_key(bucket: &str, key: &str, upload_id: &str) -> Vec<u8> {
    join(&[bucket.as_bytes(), key.as_bytes(), upload_id.as_bytes()])
}

/// `bucket \0 key \0 upload_id \0 zero-padded part number`
pub(crate) fn part_key(bucket: &str, key: &str, upload_id: &str, part_number: u32) -> Vec<u8> {
    let part = format!("{part_number:05}");
    join(&[
        bucket.as_bytes(),
        key.as_bytes(),
        upload_id.as_bytes(),
        part.as_bytes(),
    ])
}

/// `bucket \0 kind` or `bucket \0 kind \0 id`
pub(crate) fn config_key(bucket: &str, kind: &str, id: Option<&str>) -> Vec<u8> {
    match id {
        Some(id) => join(&[bucket.as_bytes(), kind.as_bytes(), id.as_bytes()]),
        None => join(&[bucket.as_bytes(), kind.as_bytes()]),
    }
}

/// Prefix covering every entry under the given segments.
pub(crate) fn prefix(segments: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for segment in segments {
        out.extend_from_slice(segment.as_bytes());
        out.push(SEP);
    }
    out
}

fn join(segments: &[&[u8]]) -> Vec<u8> {
    let total: usize = segments.iter().map(|s| s.len()).sum::<usize>() + segments.len() - 1;
    let mut out = Vec::with_capacity(total);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        out.extend_from_slice(segment);
    }
    out
}
