//! Operation handlers for [`crate::ObjectService`], split by concern.
//!
//! - [`bucket`]: create/delete/list buckets
//! - [`object`]: put/get/head/delete/copy and storage-class transitions
//! - [`multipart`]: upload lifecycle from initiation to completion
//! - [`list`]: prefix/delimiter listings with stable continuation tokens
//! - [`bucket_config`]: per-bucket configuration documents
//! - [`object_config`]: per-object retention and legal hold

mod bucket;
mod bucket_config;
mod list;
mod multipart;
mod object;
mod object_config;
