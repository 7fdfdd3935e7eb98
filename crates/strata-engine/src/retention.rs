//! Retention and legal-hold gate.
//!
//! Consulted before any destructive or retention-weakening operation on a
//! specific version: explicit version deletes, lifecycle expiration, and
//! retention rewrites. The check order is legal hold, then COMPLIANCE,
//! then GOVERNANCE.

use chrono::{DateTime, Utc};
use strata_types::{RetentionMode, RetentionRecord, VersionRecord};

use crate::error::{EngineError, EngineResult};

/// Whether `record` may be destroyed at `now`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidObjectLockState`] when a legal hold is
/// active, when COMPLIANCE retention has not lapsed, or when GOVERNANCE
/// retention has not lapsed and the caller carries no bypass capability.
pub(crate) fn check_destroy(
    record: &VersionRecord,
    now: DateTime<Utc>,
    bypass_governance: bool,
) -> EngineResult<()> {
    if record.has_active_legal_hold() {
        return Err(EngineError::InvalidObjectLockState {
            reason: "legal hold is active".to_owned(),
        });
    }

    let Some(retention) = record.retention else {
        return Ok(());
    };
    if retention.retain_until <= now {
        return Ok(());
    }

    match retention.mode {
        RetentionMode::Compliance => Err(EngineError::InvalidObjectLockState {
            reason: format!(
                "version is under COMPLIANCE retention until {}",
                retention.retain_until
            ),
        }),
        RetentionMode::Governance if bypass_governance => Ok(()),
        RetentionMode::Governance => Err(EngineError::InvalidObjectLockState {
            reason: format!(
                "version is under GOVERNANCE retention until {}",
                retention.retain_until
            ),
        }),
    }
}

/// Whether `existing` retention may be replaced with `new` at `now`.
///
/// COMPLIANCE may only be extended, never shortened, removed, or switched to
/// GOVERNANCE, and no caller is exempt. Active GOVERNANCE retention may only
/// be weakened by a caller with the bypass capability.
///
/// # Errors
///
/// Returns [`EngineError::InvalidObjectLockState`] for any forbidden rewrite.
pub(crate) fn check_rewrite(
    existing: Option<&RetentionRecord>,
    new: &RetentionRecord,
    now: DateTime<Utc>,
    bypass_governance: bool,
) -> EngineResult<()> {
    let Some(existing) = existing else {
        return Ok(());
    };
    if existing.retain_until <= now {
        return Ok(());
    }

    match existing.mode {
        RetentionMode::Compliance => {
            let weakened = new.mode != RetentionMode::Compliance
                || new.retain_until < existing.retain_until;
            if weakened {
                return Err(EngineError::InvalidObjectLockState {
                    reason: "COMPLIANCE retention may only be extended".to_owned(),
                });
            }
            Ok(())
        }
        RetentionMode::Governance => {
            let weakened = new.retain_until < existing.retain_until
                || new.mode != existing.mode && new.mode != RetentionMode::Compliance;
            if weakened && !bypass_governance {
                return Err(EngineError::InvalidObjectLockState {
                    reason: "weakening GOVERNANCE retention requires bypass".to_owned(),
                });
            }
            Ok(())
        }
    }
}
