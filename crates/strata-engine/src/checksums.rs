//! ETag computation.
//!
//! Single-part objects carry the quoted hex MD5 of their bytes; multipart
//! objects carry the MD5 of the concatenated binary part digests with a
//! `-<part_count>` suffix. AWS SDKs test these bit-exactly.

use digest::Digest;

/// Hex-encoded MD5 digest of `data` (unquoted).
#[must_use]
pub(crate) fn compute_md5(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Quote an unquoted hex digest into ETag form.
#[must_use]
pub(crate) fn quote_etag(md5_hex: &str) -> String {
    format!("\"{md5_hex}\"")
}

/// Strip surrounding quotes from a client-supplied ETag.
#[must_use]
pub(crate) fn strip_etag(etag: &str) -> &str {
    etag.trim_matches('"')
}

/// Composite multipart ETag: `"<md5-of-concat-binary-part-md5s>-<count>"`.
///
/// Each entry may be quoted or unquoted hex.
#[must_use]
pub(crate) fn compute_multipart_etag(part_md5_hexes: &[impl AsRef<str>]) -> String {
    let mut combined = Vec::with_capacity(part_md5_hexes.len() * 16);
    for hex_str in part_md5_hexes {
        if let Ok(bytes) = hex::decode(strip_etag(hex_str.as_ref())) {
            combined.extend_from_slice(&bytes);
        }
    }
    let final_md5 = hex::encode(md5::Md5::digest(&combined));
    format!("\"{final_md5}-{}\"", part_md5_hexes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_known_md5() {
        assert_eq!(compute_md5(b"hello"), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            compute_md5(b"Hello, World!"),
            "65a8e27d8879283831b664bd8b7f0ad4"
        );
        assert_eq!(compute_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_should_quote_and_strip_etags() {
        let quoted = quote_etag("abc123");
        assert_eq!(quoted, "\"abc123\"");
        assert_eq!(strip_etag(&quoted), "abc123");
        assert_eq!(strip_etag("abc123"), "abc123");
    }

    #[test]
    fn test_should_compute_composite_etag() {
        // md5(bin(md5("a")) || bin(md5("b"))) with a -2 suffix.
        let parts = [compute_md5(b"a"), compute_md5(b"b")];
        let etag = compute_multipart_etag(&parts);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with("-2\""));

        // Independently recompute the digest portion.
        let mut combined = Vec::new();
        combined.extend_from_slice(&hex::decode(&parts[0]).unwrap());
        combined.extend_from_slice(&hex::decode(&parts[1]).unwrap());
        let expected = hex::encode(md5::Md5::digest(&combined));
        assert_eq!(etag, format!("\"{expected}-2\""));
    }

    #[test]
    fn test_should_accept_quoted_part_etags() {
        let unquoted = [compute_md5(b"x"), compute_md5(b"y")];
        let quoted: Vec<String> = unquoted.iter().map(|h| quote_etag(h)).collect();
        assert_eq!(
            compute_multipart_etag(&unquoted),
            compute_multipart_etag(&quoted)
        );
    }
}
