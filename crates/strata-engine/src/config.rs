//! Engine configuration.
//!
//! All fields default to the documented values and can be overridden from
//! `STRATA_`-prefixed environment variables via [`EngineConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Configuration consumed by the engine.
///
/// # Examples
///
/// ```
/// use strata_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.max_buckets, 100);
/// assert_eq!(config.multipart_min_part_size, 5 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct EngineConfig {
    /// Root directory holding the two persistent stores (`blobs/`, `meta/`).
    #[builder(default = PathBuf::from("/var/lib/strata"))]
    pub data_dir: PathBuf,

    /// Maximum object size in bytes (default 5 GiB).
    #[builder(default = 5 * 1024 * 1024 * 1024)]
    pub max_object_size: u64,

    /// Maximum number of buckets (default 100).
    #[builder(default = 100)]
    pub max_buckets: usize,

    /// Minimum size of a non-final multipart part in bytes (default 5 MiB).
    #[builder(default = 5 * 1024 * 1024)]
    pub multipart_min_part_size: u64,

    /// Highest allowed part number (default 10000).
    #[builder(default = 10_000)]
    pub max_parts_per_upload: u32,

    /// Delay between lifecycle worker passes (default 5 minutes).
    #[builder(default = Duration::from_secs(300))]
    pub lifecycle_interval: Duration,

    /// Minimum age before a payload without metadata is considered orphaned
    /// (default 1 hour).
    #[builder(default = Duration::from_secs(3600))]
    pub orphan_grace_window: Duration,

    /// Hard cap on `max_keys` for listings (default 10000).
    #[builder(default = 10_000)]
    pub list_max_keys_cap: usize,

    /// How many buckets the lifecycle worker processes in parallel.
    #[builder(default = 4)]
    pub lifecycle_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `STRATA_DATA_DIR` | data directory |
    /// | `STRATA_MAX_OBJECT_SIZE` | bytes |
    /// | `STRATA_MAX_BUCKETS` | count |
    /// | `STRATA_MULTIPART_MIN_PART_SIZE` | bytes |
    /// | `STRATA_MAX_PARTS_PER_UPLOAD` | count |
    /// | `STRATA_LIFECYCLE_INTERVAL_SECS` | seconds |
    /// | `STRATA_ORPHAN_GRACE_WINDOW_SECS` | seconds |
    /// | `STRATA_LIST_MAX_KEYS_CAP` | count |
    /// | `STRATA_LIFECYCLE_CONCURRENCY` | count |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("STRATA_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse("STRATA_MAX_OBJECT_SIZE") {
            config.max_object_size = v;
        }
        if let Some(v) = env_parse("STRATA_MAX_BUCKETS") {
            config.max_buckets = v;
        }
        if let Some(v) = env_parse("STRATA_MULTIPART_MIN_PART_SIZE") {
            config.multipart_min_part_size = v;
        }
        if let Some(v) = env_parse("STRATA_MAX_PARTS_PER_UPLOAD") {
            config.max_parts_per_upload = v;
        }
        if let Some(v) = env_parse("STRATA_LIFECYCLE_INTERVAL_SECS") {
            config.lifecycle_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_parse("STRATA_ORPHAN_GRACE_WINDOW_SECS") {
            config.orphan_grace_window = Duration::from_secs(v);
        }
        if let Some(v) = env_parse("STRATA_LIST_MAX_KEYS_CAP") {
            config.list_max_keys_cap = v;
        }
        if let Some(v) = env_parse("STRATA_LIFECYCLE_CONCURRENCY") {
            config.lifecycle_concurrency = v;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
