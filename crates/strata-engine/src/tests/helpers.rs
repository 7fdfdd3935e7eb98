//! Shared test fixtures.

use std::sync::Arc;

use chrono::Utc;
use strata_meta::MetaStore;
use strata_store::{BodyReader, FsBlobStore};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::types::{GetObjectOptions, GetObjectResult, PutObjectOptions, PutObjectResult};
use crate::{Clock, EngineConfig, ObjectService};

/// A fresh engine over a temporary data directory with a manual clock.
pub(crate) struct TestEngine {
    pub(crate) service: Arc<ObjectService>,
    pub(crate) cancel: CancellationToken,
    dir: tempfile::TempDir,
}

impl TestEngine {
    pub(crate) fn clock(&self) -> &Clock {
        self.service.clock()
    }

    /// Drop the engine and reopen both stores from the same directory.
    pub(crate) fn reopen(self) -> TestEngine {
        let TestEngine { service, cancel, dir } = self;
        let config = service.config().clone();
        drop(service);
        let service = open_service(config);
        TestEngine {
            service,
            cancel,
            dir,
        }
    }
}

/// Engine with default test configuration.
pub(crate) fn make_engine() -> TestEngine {
    make_engine_custom(|_| {})
}

/// Engine with tweaked configuration. The test default shrinks the minimum
/// multipart part size so parts stay small.
pub(crate) fn make_engine_custom(tweak: impl FnOnce(&mut EngineConfig)) -> TestEngine {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
    let mut config = EngineConfig::default();
    config.data_dir = dir.path().to_path_buf();
    config.multipart_min_part_size = 5;
    tweak(&mut config);

    TestEngine {
        service: open_service(config),
        cancel: CancellationToken::new(),
        dir,
    }
}

fn open_service(config: EngineConfig) -> Arc<ObjectService> {
    let blob = FsBlobStore::open(config.data_dir.join("blobs"))
        .unwrap_or_else(|e| panic!("blob store open failed: {e}"));
    let meta = MetaStore::open(config.data_dir.join("meta"))
        .unwrap_or_else(|e| panic!("meta store open failed: {e}"));
    Arc::new(ObjectService::new(
        config,
        Arc::new(blob),
        Arc::new(meta),
        Clock::manual(Utc::now()),
    ))
}

/// Wrap bytes as a streaming request body.
pub(crate) fn body(data: impl Into<Vec<u8>>) -> BodyReader {
    Box::new(std::io::Cursor::new(data.into()))
}

/// Drain a get result's stream.
pub(crate) async fn read_body(result: GetObjectResult) -> Vec<u8> {
    let mut reader = result.body;
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .await
        .unwrap_or_else(|e| panic!("reading body failed: {e}"));
    out
}

pub(crate) async fn create_bucket(engine: &TestEngine, bucket: &str) {
    engine
        .service
        .create_bucket(bucket, &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("create_bucket {bucket} failed: {e}"));
}

pub(crate) async fn put_object(
    engine: &TestEngine,
    bucket: &str,
    key: &str,
    data: &[u8],
) -> PutObjectResult {
    engine
        .service
        .put_object(
            bucket,
            key,
            body(data.to_vec()),
            PutObjectOptions::default(),
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("put_object {bucket}/{key} failed: {e}"))
}

pub(crate) async fn get_bytes(engine: &TestEngine, bucket: &str, key: &str) -> Vec<u8> {
    let result = engine
        .service
        .get_object(bucket, key, GetObjectOptions::default(), &engine.cancel)
        .await
        .unwrap_or_else(|e| panic!("get_object {bucket}/{key} failed: {e}"));
    read_body(result).await
}

pub(crate) async fn set_versioning(
    engine: &TestEngine,
    bucket: &str,
    status: strata_types::VersioningStatus,
) {
    engine
        .service
        .put_bucket_versioning(
            bucket,
            strata_types::VersioningConfig {
                status,
                mfa_delete: false,
            },
            &engine.cancel,
        )
        .await
        .unwrap_or_else(|e| panic!("put_bucket_versioning failed: {e}"));
}
