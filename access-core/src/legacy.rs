//! Folding of the legacy approval/auto-lock fields into [`AccessPolicy`].
//!
//! Older schemas described access policy with two loose attributes,
//! `approval_mode` and `usage_based_autolock_duration_days`. The current
//! schema has a single access policy object. The migrator converts one into
//! the other; it never produces a value that carries both.

use serde::Serialize;
use thiserror::Error;

use crate::access::{
    AccessGroup, AccessPolicy, AccessPolicyError, AccessPolicyMode, ApprovalMode,
    LegacyAccessGroup,
};
use crate::duration::format_hours;

const HOURS_PER_DAY: i64 = 24;

/// Operator-facing text for the legacy access policy attributes.
pub const LEGACY_ACCESS_POLICY_SUMMARY: &str =
    "Please use new access_policy block instead of approval_mode and usage_based_autolock_duration_days attributes.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyMigrationError {
    #[error("invalid legacy approval_mode: {0}")]
    ApprovalMode(#[from] AccessPolicyError),
    #[error("usage_based_autolock_duration_days must not be negative, got {days}")]
    NegativeDuration { days: i64 },
    #[error("usage_based_autolock_duration_days {days} is too large")]
    DurationOverflow { days: i64 },
}

/// Informational diagnostic attached to a successful migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationWarning {
    pub summary: String,
    pub detail: String,
}

impl MigrationWarning {
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn legacy_access_policy(detail: impl Into<String>) -> Self {
        Self::new(LEGACY_ACCESS_POLICY_SUMMARY, detail)
    }
}

/// Result of folding the two legacy attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFold {
    pub policy: Option<AccessPolicy>,
    pub warning: Option<MigrationWarning>,
}

/// Convert `approval_mode` and `usage_based_autolock_duration_days` into an access policy.
///
/// Nothing set gives no policy and no warning. Otherwise the mode is `MANUAL`,
/// or `AUTO_LOCK` once the duration reaches one day, and the duration is the
/// day count expressed in hours.
pub fn migrate_approval_mode(
    approval_mode: Option<&str>,
    usage_based_duration_days: Option<i64>,
) -> Result<LegacyFold, LegacyMigrationError> {
    if approval_mode.is_none() && usage_based_duration_days.is_none() {
        return Ok(LegacyFold::default());
    }

    let mut policy = AccessPolicy {
        mode: Some(AccessPolicyMode::Manual),
        duration: None,
        approval_mode: approval_mode.map(str::parse::<ApprovalMode>).transpose()?,
    };

    if let Some(days) = usage_based_duration_days {
        if days < 0 {
            return Err(LegacyMigrationError::NegativeDuration { days });
        }
        let hours = days
            .checked_mul(HOURS_PER_DAY)
            .ok_or(LegacyMigrationError::DurationOverflow { days })?;
        policy.duration = Some(format_hours(hours));
        if days >= 1 {
            policy.mode = Some(AccessPolicyMode::AutoLock);
        }
    }

    Ok(LegacyFold {
        policy: Some(policy),
        warning: Some(MigrationWarning::legacy_access_policy(
            "approval_mode and usage_based_autolock_duration_days were folded into access_policy",
        )),
    })
}

/// Convert a legacy group access entry into the current shape.
///
/// A populated nested policy is kept as is and the legacy fields are dropped.
/// The flag reports whether any legacy field was populated.
pub fn migrate_legacy_access_group(
    group: LegacyAccessGroup,
) -> Result<(AccessGroup, bool), LegacyMigrationError> {
    let had_legacy = group.has_legacy_fields();

    let access_policy = match group.access_policy {
        Some(explicit) if !explicit.is_empty() => Some(explicit),
        _ => {
            migrate_approval_mode(
                group.approval_mode.as_deref(),
                group.usage_based_duration_days,
            )?
            .policy
        }
    };

    let migrated = AccessGroup {
        group_id: group.group_id,
        security_policy_id: group.security_policy_id,
        access_policy,
    };
    Ok((migrated, had_legacy))
}
