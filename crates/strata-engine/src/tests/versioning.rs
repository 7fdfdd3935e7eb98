//! Versioning state machine: unset, enabled, and suspended behavior.

use strata_types::{VersioningStatus, NULL_VERSION_ID};

use crate::error::EngineError;
use crate::types::{DeleteObjectOptions, GetObjectOptions, ListObjectsOptions, ListVersionsOptions};

use super::helpers::*;

#[tokio::test]
async fn test_should_mint_versions_when_enabled() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    let v1 = put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    let v2 = put_object(&engine, "b", "k", b"v2").await;

    assert_ne!(v1.version_id, NULL_VERSION_ID);
    assert_ne!(v2.version_id, NULL_VERSION_ID);
    assert_ne!(v1.version_id, v2.version_id);

    // The listing shows one entry: the latest.
    let listing = engine
        .service
        .list_objects("b", ListObjectsOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list failed: {e}"));
    assert_eq!(listing.objects.len(), 1);
    assert_eq!(listing.objects[0].version_id, v2.version_id);

    // Both versions remain individually addressable.
    let old = engine
        .service
        .get_object(
            "b",
            "k",
            GetObjectOptions {
                version_id: Some(v1.version_id.clone()),
                ..GetObjectOptions::default()
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("get v1 failed: {e}"));
    assert_eq!(read_body(old).await, b"v1");
    assert_eq!(get_bytes(&engine, "b", "k").await, b"v2");
}

#[tokio::test]
async fn test_should_insert_delete_marker_when_enabled() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    let v1 = put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    put_object(&engine, "b", "k", b"v2").await;
    engine.clock().advance(chrono::Duration::seconds(1));

    let deleted = engine
        .service
        .delete_object("b", "k", DeleteObjectOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("delete failed: {e}"));
    assert!(deleted.delete_marker);

    // Three versions: two data plus the marker; the listing shows nothing.
    let versions = engine
        .service
        .list_object_versions("b", ListVersionsOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list versions failed: {e}"));
    assert_eq!(versions.versions.len(), 3);
    assert_eq!(
        versions
            .versions
            .iter()
            .filter(|v| v.record.is_delete_marker)
            .count(),
        1
    );

    let listing = engine
        .service
        .list_objects("b", ListObjectsOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list failed: {e}"));
    assert!(listing.objects.is_empty());

    // Reads of the key fail; reads of a named data version still work.
    let result = engine
        .service
        .get_object("b", "k", GetObjectOptions::default(), &engine.cancel)
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchKey { .. })));

    let old = engine
        .service
        .get_object(
            "b",
            "k",
            GetObjectOptions {
                version_id: Some(v1.version_id.clone()),
                ..GetObjectOptions::default()
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("get v1 failed: {e}"));
    assert_eq!(read_body(old).await, b"v1");
}

#[tokio::test]
async fn test_should_promote_previous_version_after_named_delete() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    let v2 = put_object(&engine, "b", "k", b"v2").await;

    engine
        .service
        .delete_object(
            "b",
            "k",
            DeleteObjectOptions {
                version_id: Some(v2.version_id),
                bypass_governance: false,
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("named delete failed: {e}"));

    // The chronologically previous version is current again.
    assert_eq!(get_bytes(&engine, "b", "k").await, b"v1");
}

#[tokio::test]
async fn test_should_keep_latest_after_deleting_old_version() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    let v1 = put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    put_object(&engine, "b", "k", b"v2").await;

    engine
        .service
        .delete_object(
            "b",
            "k",
            DeleteObjectOptions {
                version_id: Some(v1.version_id.clone()),
                bypass_governance: false,
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("named delete failed: {e}"));

    assert_eq!(get_bytes(&engine, "b", "k").await, b"v2");
    let result = engine
        .service
        .get_object(
            "b",
            "k",
            GetObjectOptions {
                version_id: Some(v1.version_id),
                ..GetObjectOptions::default()
            },
            &engine.cancel,
        )
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchVersion { .. })));
}

#[tokio::test]
async fn test_should_remove_delete_marker_by_version_id() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    let deleted = engine
        .service
        .delete_object("b", "k", DeleteObjectOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("delete failed: {e}"));
    let marker_id = deleted
        .version_id
        .unwrap_or_else(|| panic!("marker version id missing"));

    // Removing the marker restores the object.
    engine
        .service
        .delete_object(
            "b",
            "k",
            DeleteObjectOptions {
                version_id: Some(marker_id),
                bypass_governance: false,
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("marker delete failed: {e}"));
    assert_eq!(get_bytes(&engine, "b", "k").await, b"v1");
}

#[tokio::test]
async fn test_should_overwrite_null_slot_when_suspended() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    let v1 = put_object(&engine, "b", "k", b"versioned").await;
    engine.clock().advance(chrono::Duration::seconds(1));

    set_versioning(&engine, "b", VersioningStatus::Suspended).await;
    let s1 = put_object(&engine, "b", "k", b"null-one").await;
    assert_eq!(s1.version_id, NULL_VERSION_ID);
    engine.clock().advance(chrono::Duration::seconds(1));
    let s2 = put_object(&engine, "b", "k", b"null-two").await;
    assert_eq!(s2.version_id, NULL_VERSION_ID);

    // The historical version survives; the null slot was overwritten.
    let versions = engine
        .service
        .list_object_versions("b", ListVersionsOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list versions failed: {e}"));
    assert_eq!(versions.versions.len(), 2);
    assert_eq!(get_bytes(&engine, "b", "k").await, b"null-two");

    let old = engine
        .service
        .get_object(
            "b",
            "k",
            GetObjectOptions {
                version_id: Some(v1.version_id),
                ..GetObjectOptions::default()
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("get versioned failed: {e}"));
    assert_eq!(read_body(old).await, b"versioned");
}

#[tokio::test]
async fn test_should_replace_null_slot_with_marker_when_suspended() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Suspended).await;

    put_object(&engine, "b", "k", b"data").await;
    engine.clock().advance(chrono::Duration::seconds(1));

    let deleted = engine
        .service
        .delete_object("b", "k", DeleteObjectOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("delete failed: {e}"));
    assert!(deleted.delete_marker);
    assert_eq!(deleted.version_id.as_deref(), Some(NULL_VERSION_ID));

    // One version remains for the key: the null delete marker.
    let versions = engine
        .service
        .list_object_versions("b", ListVersionsOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list versions failed: {e}"));
    assert_eq!(versions.versions.len(), 1);
    assert!(versions.versions[0].record.is_delete_marker);

    let result = engine
        .service
        .get_object("b", "k", GetObjectOptions::default(), &engine.cancel)
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchKey { .. })));
}

#[tokio::test]
async fn test_should_reject_foreign_version_ids_on_unversioned_bucket() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    put_object(&engine, "b", "k", b"data").await;

    let result = engine
        .service
        .delete_object(
            "b",
            "k",
            DeleteObjectOptions {
                version_id: Some("not-null".to_owned()),
                bypass_governance: false,
            },
            &engine.cancel,
        )
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchVersion { .. })));

    // The null sentinel addresses the only slot there is.
    engine
        .service
        .delete_object(
            "b",
            "k",
            DeleteObjectOptions {
                version_id: Some(NULL_VERSION_ID.to_owned()),
                bypass_governance: false,
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("null delete failed: {e}"));
    let result = engine
        .service
        .get_object("b", "k", GetObjectOptions::default(), &engine.cancel)
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchKey { .. })));
}

#[tokio::test]
async fn test_should_read_delete_marker_version_as_missing() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    set_versioning(&engine, "b", VersioningStatus::Enabled).await;

    put_object(&engine, "b", "k", b"v1").await;
    engine.clock().advance(chrono::Duration::seconds(1));
    let deleted = engine
        .service
        .delete_object("b", "k", DeleteObjectOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("delete failed: {e}"));

    let marker_id = deleted
        .version_id
        .unwrap_or_else(|| panic!("marker version id missing"));
    let result = engine
        .service
        .get_object(
            "b",
            "k",
            GetObjectOptions {
                version_id: Some(marker_id),
                ..GetObjectOptions::default()
            },
            &engine.cancel,
        )
        .await;
    assert!(matches!(result, Err(EngineError::NoSuchKey { .. })));
}
