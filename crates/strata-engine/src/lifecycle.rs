//! Background lifecycle worker.
//!
//! Periodically applies each bucket's enabled lifecycle rules through the
//! public [`ObjectService`] surface: the worker holds no privileged access
//! and simply loses any race against a foreground mutator. Each pass also
//! sweeps orphan payloads left behind by failed or canceled writes.
//!
//! Passes never overlap, so no bucket is ever scanned twice concurrently;
//! within a pass, buckets are processed in parallel up to the configured
//! concurrency.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use strata_types::{Expiration, LifecycleRule, NoncurrentVersionExpiration, Transition};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::service::ObjectService;
use crate::types::{DeleteObjectOptions, ListObjectsOptions, ListVersionsOptions};

/// Page size the worker uses when scanning objects.
const SCAN_PAGE_SIZE: usize = 1000;

/// Periodic lifecycle processor.
pub struct LifecycleWorker {
    service: Arc<ObjectService>,
    cancel: CancellationToken,
}

impl LifecycleWorker {
    /// Create a worker over `service`; interval and concurrency come from
    /// the engine configuration.
    #[must_use]
    pub fn new(service: Arc<ObjectService>) -> Self {
        Self {
            service,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the worker promptly when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the worker in the background until its token is cancelled.
    ///
    /// The first pass starts immediately; later passes follow the
    /// configured interval.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval = ?self.service.config().lifecycle_interval,
                "lifecycle worker started"
            );
            let mut ticker = tokio::time::interval(self.service.config().lifecycle_interval);
            loop {
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    _ = ticker.tick() => self.run_once().await,
                }
            }
            info!("lifecycle worker stopped");
        })
    }

    /// Execute one full pass over every bucket, then sweep orphan payloads.
    ///
    /// Public so tests (and operators) can drive passes deterministically.
    pub async fn run_once(&self) {
        let buckets = match self.service.list_buckets(&self.cancel).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(error = %e, "lifecycle pass could not list buckets");
                return;
            }
        };

        let semaphore = Arc::new(Semaphore::new(
            self.service.config().lifecycle_concurrency.max(1),
        ));
        let mut tasks = JoinSet::new();

        for bucket in buckets {
            if self.cancel.is_cancelled() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let service = Arc::clone(&self.service);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                if let Err(e) = process_bucket(&service, &bucket.name, &cancel).await {
                    warn!(bucket = %bucket.name, error = %e, "lifecycle pass failed for bucket");
                }
            });
        }
        while tasks.join_next().await.is_some() {}

        match self.service.sweep_orphan_payloads(&self.cancel).await {
            Ok(0) => {}
            Ok(reclaimed) => debug!(reclaimed, "orphan payloads reclaimed"),
            Err(EngineError::Canceled) => {}
            Err(e) => warn!(error = %e, "orphan sweep failed"),
        }
    }
}

/// Apply a bucket's enabled rules.
async fn process_bucket(
    service: &ObjectService,
    bucket: &str,
    cancel: &CancellationToken,
) -> EngineResult<()> {
    let Some(rules) = service.get_bucket_lifecycle(bucket, cancel).await? else {
        return Ok(());
    };
    let now = service.clock().now();

    for rule in rules.iter().filter(|r| r.is_enabled()) {
        if cancel.is_cancelled() {
            return Ok(());
        }
        if let Some(expiration) = &rule.expiration {
            apply_expiration(service, bucket, rule, expiration, now, cancel).await?;
        }
        if !rule.transitions.is_empty() {
            apply_transitions(service, bucket, rule, now, cancel).await?;
        }
        if let Some(noncurrent) = &rule.noncurrent_version_expiration {
            apply_noncurrent_expiration(service, bucket, rule, noncurrent, now, cancel).await?;
        }
    }
    Ok(())
}

/// Delete current objects past their expiration age or date.
async fn apply_expiration(
    service: &ObjectService,
    bucket: &str,
    rule: &LifecycleRule,
    expiration: &Expiration,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> EngineResult<()> {
    let mut token: Option<String> = None;
    loop {
        let page = service
            .list_objects(
                bucket,
                ListObjectsOptions {
                    prefix: rule.prefix.clone(),
                    max_keys: Some(SCAN_PAGE_SIZE),
                    continuation_token: token.clone(),
                    ..ListObjectsOptions::default()
                },
                cancel,
            )
            .await?;

        for object in &page.objects {
            if !expiration_due(expiration, object.last_modified, now) {
                continue;
            }
            match service
                .delete_object(bucket, &object.key, DeleteObjectOptions::default(), cancel)
                .await
            {
                Ok(_) => {
                    info!(bucket, key = %object.key, rule = %rule.id, "expired object")
                }
                Err(EngineError::InvalidObjectLockState { .. }) => {
                    debug!(bucket, key = %object.key, "expiration blocked by object lock");
                }
                Err(e) => warn!(bucket, key = %object.key, error = %e, "expiration failed"),
            }
        }

        if !page.is_truncated {
            break;
        }
        token = page.next_continuation_token;
    }

    if expiration.expired_object_delete_marker {
        remove_expired_delete_markers(service, bucket, rule, cancel).await?;
    }
    Ok(())
}

fn expiration_due(expiration: &Expiration, last_modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    if let Some(days) = expiration.days {
        if days > 0 && now >= last_modified + Duration::days(i64::from(days)) {
            return true;
        }
    }
    if let Some(date) = expiration.date {
        if now >= date {
            return true;
        }
    }
    false
}

/// Remove delete markers for keys that have no data versions left.
async fn remove_expired_delete_markers(
    service: &ObjectService,
    bucket: &str,
    rule: &LifecycleRule,
    cancel: &CancellationToken,
) -> EngineResult<()> {
    let mut key_marker: Option<String> = None;
    let mut version_marker: Option<String> = None;

    loop {
        let page = service
            .list_object_versions(
                bucket,
                ListVersionsOptions {
                    prefix: rule.prefix.clone(),
                    key_marker: key_marker.clone(),
                    version_id_marker: version_marker.clone(),
                    max_keys: Some(SCAN_PAGE_SIZE),
                },
                cancel,
            )
            .await?;

        // Group this page's entries per key; only keys whose versions are
        // all delete markers are eligible. A key split across pages is
        // skipped this pass and caught on the next one.
        let mut index = 0;
        while index < page.versions.len() {
            let key = page.versions[index].record.key.clone();
            let group_end = page.versions[index..]
                .iter()
                .position(|v| v.record.key != key)
                .map_or(page.versions.len(), |offset| index + offset);
            let group = &page.versions[index..group_end];
            index = group_end;

            if group.iter().any(|v| !v.record.is_delete_marker) {
                continue;
            }
            for summary in group {
                let opts = DeleteObjectOptions {
                    version_id: Some(summary.record.version_id.clone()),
                    bypass_governance: false,
                };
                match service.delete_object(bucket, &key, opts, cancel).await {
                    Ok(_) => info!(bucket, key = %key, rule = %rule.id, "removed expired delete marker"),
                    Err(e) => warn!(bucket, key = %key, error = %e, "delete marker removal failed"),
                }
            }
        }

        if !page.is_truncated {
            break;
        }
        key_marker = page.next_key_marker;
        version_marker = page.next_version_id_marker;
    }
    Ok(())
}

/// Rewrite the storage class of current objects whose transition is due.
async fn apply_transitions(
    service: &ObjectService,
    bucket: &str,
    rule: &LifecycleRule,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> EngineResult<()> {
    let mut token: Option<String> = None;
    loop {
        let page = service
            .list_objects(
                bucket,
                ListObjectsOptions {
                    prefix: rule.prefix.clone(),
                    max_keys: Some(SCAN_PAGE_SIZE),
                    continuation_token: token.clone(),
                    ..ListObjectsOptions::default()
                },
                cancel,
            )
            .await?;

        for object in &page.objects {
            for transition in &rule.transitions {
                if !transition_due(transition, object.last_modified, now) {
                    continue;
                }
                if object.storage_class == transition.storage_class {
                    continue;
                }
                match service
                    .transition_storage_class(
                        bucket,
                        &object.key,
                        None,
                        &transition.storage_class,
                        cancel,
                    )
                    .await
                {
                    Ok(true) => info!(
                        bucket,
                        key = %object.key,
                        storage_class = %transition.storage_class,
                        rule = %rule.id,
                        "transitioned storage class"
                    ),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(bucket, key = %object.key, error = %e, "transition failed");
                    }
                }
            }
        }

        if !page.is_truncated {
            break;
        }
        token = page.next_continuation_token;
    }
    Ok(())
}

fn transition_due(transition: &Transition, last_modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    if let Some(days) = transition.days {
        if days > 0 && now >= last_modified + Duration::days(i64::from(days)) {
            return true;
        }
    }
    if let Some(date) = transition.date {
        if now >= date {
            return true;
        }
    }
    false
}

/// Delete non-latest data versions whose time since being superseded
/// exceeds the rule's window.
///
/// A version becomes non-current the instant its successor is written, so
/// the successor's `last_modified` is the age baseline.
async fn apply_noncurrent_expiration(
    service: &ObjectService,
    bucket: &str,
    rule: &LifecycleRule,
    noncurrent: &NoncurrentVersionExpiration,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> EngineResult<()> {
    if noncurrent.noncurrent_days == 0 {
        return Ok(());
    }
    let window = Duration::days(i64::from(noncurrent.noncurrent_days));

    let mut key_marker: Option<String> = None;
    let mut version_marker: Option<String> = None;

    loop {
        let page = service
            .list_object_versions(
                bucket,
                ListVersionsOptions {
                    prefix: rule.prefix.clone(),
                    key_marker: key_marker.clone(),
                    version_id_marker: version_marker.clone(),
                    max_keys: Some(SCAN_PAGE_SIZE),
                },
                cancel,
            )
            .await?;

        // Entries arrive newest-first within a key, so each entry's
        // successor is the previous same-key entry.
        let mut successor_modified: Option<(String, DateTime<Utc>)> = None;
        for summary in &page.versions {
            let record = &summary.record;
            let superseded_at = match &successor_modified {
                Some((key, modified)) if *key == record.key && !summary.is_latest => {
                    Some(*modified)
                }
                _ => None,
            };
            successor_modified = Some((record.key.clone(), record.last_modified));

            let Some(superseded_at) = superseded_at else {
                continue;
            };
            if record.is_delete_marker || now < superseded_at + window {
                continue;
            }

            let opts = DeleteObjectOptions {
                version_id: Some(record.version_id.clone()),
                bypass_governance: false,
            };
            match service.delete_object(bucket, &record.key, opts, cancel).await {
                Ok(_) => info!(
                    bucket,
                    key = %record.key,
                    version_id = %record.version_id,
                    rule = %rule.id,
                    "expired noncurrent version"
                ),
                Err(EngineError::InvalidObjectLockState { .. }) => {
                    debug!(bucket, key = %record.key, "noncurrent expiry blocked by object lock");
                }
                Err(e) => {
                    warn!(bucket, key = %record.key, error = %e, "noncurrent expiry failed");
                }
            }
        }

        if !page.is_truncated {
            break;
        }
        key_marker = page.next_key_marker;
        version_marker = page.next_version_id_marker;
    }
    Ok(())
}
