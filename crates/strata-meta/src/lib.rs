//! Durable metadata index.
//!
//! A typed, prefix-scannable key-value store over an embedded LSM database.
//! Each logical name-space (buckets, object versions, multipart uploads,
//! parts, per-bucket configurations) lives in its own keyspace; keys are
//! `\0`-separated paths so ordered prefix scans never bleed across buckets
//! or object keys.
//!
//! Single-key writes are atomic. Multi-key sequences belonging to one
//! logical engine operation are ordered by the engine (payload first,
//! history record next, current pointer last) under its per-key lock, which
//! makes the current-pointer write the commit point.

mod error;
mod keys;
mod store;

pub use error::MetaError;
pub use store::{ConfigKind, MetaStore};
