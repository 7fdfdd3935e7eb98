//! Shared data model for the strata object storage engine.
//!
//! Everything in this crate is a persisted record or an identifier: the
//! metadata store serializes these types verbatim, and the engine exchanges
//! them with both persistence layers. Operation inputs and outputs live with
//! the engine facade, not here.

mod blob;
mod bucket;
mod multipart;
mod object;

pub use blob::BlobId;
pub use bucket::{
    BucketEncryption, BucketRecord, CorsRule, DefaultRetention, Expiration, LifecycleRule,
    LifecycleRuleStatus, NoncurrentVersionExpiration, ObjectLockConfig, OwnershipControls,
    PublicAccessBlockConfig, Transition, VersioningConfig, VersioningStatus,
};
pub use multipart::{PartRecord, UploadRecord};
pub use object::{
    LegalHoldStatus, Owner, ParseRetentionModeError, PartInfo, RetentionMode, RetentionRecord,
    VersionRecord, NULL_VERSION_ID,
};
