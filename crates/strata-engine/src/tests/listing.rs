//! Prefix/delimiter roll-up and pagination stability.

use crate::types::ListObjectsOptions;

use super::helpers::*;

async fn list(
    engine: &TestEngine,
    bucket: &str,
    opts: ListObjectsOptions,
) -> crate::types::ListObjectsResult {
    engine
        .service
        .list_objects(bucket, opts, &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("list_objects failed: {e}"))
}

fn keys(result: &crate::types::ListObjectsResult) -> Vec<&str> {
    result.objects.iter().map(|o| o.key.as_str()).collect()
}

#[tokio::test]
async fn test_should_roll_up_delimited_prefixes() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    for key in ["a/1", "a/2", "b/1", "c"] {
        put_object(&engine, "b", key, b"x").await;
    }

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            delimiter: "/".to_owned(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(result.common_prefixes, vec!["a/", "b/"]);
    assert_eq!(keys(&result), vec!["c"]);

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            prefix: "a/".to_owned(),
            delimiter: "/".to_owned(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert!(result.common_prefixes.is_empty());
    assert_eq!(keys(&result), vec!["a/1", "a/2"]);
}

#[tokio::test]
async fn test_should_separate_directories_from_objects() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    for key in ["dir1/a", "dir1/b", "dir2/c"] {
        put_object(&engine, "b", key, b"content").await;
    }

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            delimiter: "/".to_owned(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(result.common_prefixes, vec!["dir1/", "dir2/"]);
    assert!(result.objects.is_empty());

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            prefix: "dir1/".to_owned(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(keys(&result), vec!["dir1/a", "dir1/b"]);
}

#[tokio::test]
async fn test_should_sort_keys_and_respect_prefix_bounds() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    // "a" and "ab" must not leak into a listing for prefix "a/".
    for key in ["a", "a/x", "a/y", "ab", "b"] {
        put_object(&engine, "b", key, b"x").await;
    }

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            prefix: "a/".to_owned(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(keys(&result), vec!["a/x", "a/y"]);

    let all = list(&engine, "b", ListObjectsOptions::default()).await;
    assert_eq!(keys(&all), vec!["a", "a/x", "a/y", "ab", "b"]);
}

#[tokio::test]
async fn test_should_paginate_with_stable_tokens() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    for i in 0..10 {
        put_object(&engine, "b", &format!("key-{i:02}"), b"x").await;
    }

    let page1 = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(4),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(page1.objects.len(), 4);
    assert!(page1.is_truncated);
    let token = page1
        .next_continuation_token
        .clone()
        .unwrap_or_else(|| panic!("missing token"));

    let page2 = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(4),
            continuation_token: Some(token),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(keys(&page2), vec!["key-04", "key-05", "key-06", "key-07"]);

    let page3 = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(4),
            continuation_token: page2.next_continuation_token.clone(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(keys(&page3), vec!["key-08", "key-09"]);
    assert!(!page3.is_truncated);
    assert!(page3.next_continuation_token.is_none());
}

#[tokio::test]
async fn test_should_not_repeat_keys_after_concurrent_insert() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    for key in ["c", "e", "g", "i"] {
        put_object(&engine, "b", key, b"x").await;
    }

    let page1 = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(2),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(keys(&page1), vec!["c", "e"]);
    let token = page1
        .next_continuation_token
        .clone()
        .unwrap_or_else(|| panic!("missing token"));

    // Keys inserted behind the cursor while paging.
    put_object(&engine, "b", "a", b"late").await;
    put_object(&engine, "b", "f", b"late").await;

    let page2 = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(10),
            continuation_token: Some(token),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    // The token is the next unread key ("g"), so nothing already returned
    // can repeat and inserts behind the cursor stay invisible.
    assert_eq!(keys(&page2), vec!["g", "i"]);
    for page in [&page1, &page2] {
        assert!(!keys(page).contains(&"a"));
    }
}

#[tokio::test]
async fn test_should_count_common_prefixes_against_max_keys() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    for key in ["a/1", "b/1", "c/1", "d/1"] {
        put_object(&engine, "b", key, b"x").await;
    }

    let page1 = list(
        &engine,
        "b",
        ListObjectsOptions {
            delimiter: "/".to_owned(),
            max_keys: Some(2),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(page1.common_prefixes, vec!["a/", "b/"]);
    assert!(page1.is_truncated);

    let page2 = list(
        &engine,
        "b",
        ListObjectsOptions {
            delimiter: "/".to_owned(),
            max_keys: Some(10),
            continuation_token: page1.next_continuation_token.clone(),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(page2.common_prefixes, vec!["c/", "d/"]);
    assert!(!page2.is_truncated);
}

#[tokio::test]
async fn test_should_clamp_max_keys_to_cap() {
    let engine = make_engine_custom(|c| c.list_max_keys_cap = 3);
    create_bucket(&engine, "b").await;
    for i in 0..6 {
        put_object(&engine, "b", &format!("k{i}"), b"x").await;
    }

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(100),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert_eq!(result.objects.len(), 3);
    assert!(result.is_truncated);
}

#[tokio::test]
async fn test_should_return_empty_page_for_zero_max_keys() {
    let engine = make_engine();
    create_bucket(&engine, "b").await;
    put_object(&engine, "b", "k", b"x").await;

    let result = list(
        &engine,
        "b",
        ListObjectsOptions {
            max_keys: Some(0),
            ..ListObjectsOptions::default()
        },
    )
    .await;
    assert!(result.objects.is_empty());
    assert!(!result.is_truncated);
}
