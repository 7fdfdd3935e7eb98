//! Listing and pagination.
//!
//! Both listings scan the metadata store in key order and emit up to
//! `max_keys` entries. Continuation tokens are the next unread key, so a
//! resumed scan is stable even when keys are inserted concurrently:
//! already-returned keys can never repeat.

use strata_types::VersionRecord;
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::service::ObjectService;
use crate::types::{
    ListObjectsOptions, ListObjectsResult, ListVersionsOptions, ListVersionsResult,
    VersionSummary,
};

impl ObjectService {
    /// List the current objects of a bucket.
    ///
    /// Delete-marker-latest keys are omitted. With a delimiter, keys whose
    /// suffix after the prefix contains it collapse into common prefixes;
    /// collapsed entries count against `max_keys` like objects do.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::NoSuchBucket`] when the bucket does not
    /// exist.
    pub async fn list_objects(
        &self,
        bucket: &str,
        opts: ListObjectsOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<ListObjectsResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let max_keys = self.clamp_max_keys(opts.max_keys);
        let mut result = ListObjectsResult::default();
        if max_keys == 0 {
            return Ok(result);
        }

        let from_key = opts
            .continuation_token
            .clone()
            .unwrap_or_else(|| opts.prefix.clone());

        let mut emitted = 0usize;
        let mut last_common_prefix: Option<String> = None;

        for record in self.meta.scan_current(bucket, &from_key) {
            let record = record?;

            // Keys are sorted; once one falls outside the prefix no later
            // key can match.
            if !record.key.starts_with(&opts.prefix) {
                break;
            }
            if record.is_delete_marker {
                continue;
            }

            // Delimiter roll-up: collapse to the substring up to and
            // including the first delimiter after the prefix.
            if !opts.delimiter.is_empty() {
                let rest = &record.key[opts.prefix.len()..];
                if let Some(pos) = rest.find(&opts.delimiter) {
                    let collapsed = format!(
                        "{}{}",
                        opts.prefix,
                        &rest[..pos + opts.delimiter.len()]
                    );
                    // Members of an already-emitted prefix are skipped for
                    // free; a fresh prefix costs one entry of budget.
                    if last_common_prefix.as_deref() == Some(collapsed.as_str()) {
                        continue;
                    }
                    if emitted == max_keys {
                        result.is_truncated = true;
                        result.next_continuation_token = Some(record.key);
                        break;
                    }
                    last_common_prefix = Some(collapsed.clone());
                    result.common_prefixes.push(collapsed);
                    emitted += 1;
                    continue;
                }
            }

            if emitted == max_keys {
                result.is_truncated = true;
                result.next_continuation_token = Some(record.key);
                break;
            }
            result.objects.push(record);
            emitted += 1;
        }

        Ok(result)
    }

    /// List every version (data and delete markers) of a bucket's keys.
    ///
    /// Entries come in key order, newest first within each key. The marker
    /// pair resumes a truncated listing mid-key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::NoSuchBucket`] when the bucket does not
    /// exist.
    pub async fn list_object_versions(
        &self,
        bucket: &str,
        opts: ListVersionsOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<ListVersionsResult> {
        Self::ensure_live(cancel)?;
        self.require_bucket(bucket)?;

        let max_keys = self.clamp_max_keys(opts.max_keys);
        let mut result = ListVersionsResult::default();
        if max_keys == 0 {
            return Ok(result);
        }

        let from_key = opts
            .key_marker
            .clone()
            .unwrap_or_else(|| opts.prefix.clone());

        // The scan yields versions grouped by key; buffer one key at a time
        // so each group can be reordered newest-first before emission.
        let mut emitter = VersionEmitter {
            max_keys,
            key_marker: opts.key_marker.as_deref(),
            version_id_marker: opts.version_id_marker.as_deref(),
            skip_through_marker: opts.version_id_marker.is_some(),
            result: &mut result,
        };
        let mut group: Vec<VersionRecord> = Vec::new();
        let mut truncated = false;

        for record in self.meta.scan_versions(bucket, &from_key) {
            let record = record?;
            if !record.key.starts_with(&opts.prefix) {
                break;
            }
            if group.last().is_some_and(|g| g.key != record.key)
                && emitter.flush(std::mem::take(&mut group))
            {
                truncated = true;
                break;
            }
            group.push(record);
        }
        if !truncated {
            emitter.flush(group);
        }
        drop(emitter);

        Ok(result)
    }

    /// Apply the default and the configured hard cap to `max_keys`.
    fn clamp_max_keys(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(1000)
            .min(self.config.list_max_keys_cap)
    }
}

/// Emits one key's version group at a time, newest first, honoring the
/// resume markers and the `max_keys` budget.
struct VersionEmitter<'a> {
    max_keys: usize,
    key_marker: Option<&'a str>,
    version_id_marker: Option<&'a str>,
    skip_through_marker: bool,
    result: &'a mut ListVersionsResult,
}

impl VersionEmitter<'_> {
    /// Emit a key's versions. Returns `true` once the listing truncated and
    /// scanning should stop.
    fn flush(&mut self, mut group: Vec<VersionRecord>) -> bool {
        let Some(first) = group.first() else {
            return false;
        };
        let key = first.key.clone();

        // A key marker without a version marker resumes after the whole key.
        if Some(key.as_str()) == self.key_marker && self.version_id_marker.is_none() {
            return false;
        }

        group.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.version_id.cmp(&a.version_id))
        });

        for (index, record) in group.into_iter().enumerate() {
            // Resume mid-key: drop entries up to and including the
            // version-id marker on the marker key.
            if self.skip_through_marker && Some(key.as_str()) == self.key_marker {
                if Some(record.version_id.as_str()) == self.version_id_marker {
                    self.skip_through_marker = false;
                }
                continue;
            }

            if self.result.versions.len() == self.max_keys {
                self.result.is_truncated = true;
                self.result.next_key_marker = self
                    .result
                    .versions
                    .last()
                    .map(|v| v.record.key.clone());
                self.result.next_version_id_marker = self
                    .result
                    .versions
                    .last()
                    .map(|v| v.record.version_id.clone());
                return true;
            }

            self.result.versions.push(VersionSummary {
                is_latest: index == 0,
                record,
            });
        }
        false
    }
}
