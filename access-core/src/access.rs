//! Access policies and group access assignments.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::{parse_duration, DurationParseError};

const ONE_HOUR: Duration = Duration::from_secs(60 * 60);
const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessPolicyError {
    #[error("invalid mode: {value}")]
    InvalidMode { value: String },
    #[error("invalid approval_mode: {value}")]
    InvalidApprovalMode { value: String },
    #[error("mode is required")]
    ModeRequired,
    #[error("duration and approval_mode are required")]
    AutoLockIncomplete,
    #[error("minimum duration is 1 day")]
    DurationBelowDay,
    #[error("approval_mode is required")]
    ApprovalModeRequired,
    #[error("minimum duration is 1 hour")]
    DurationBelowHour,
    #[error("invalid access policy duration: {0}")]
    Duration(#[from] DurationParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessPolicyMode {
    Manual,
    AutoLock,
    AccessRequest,
}

impl AccessPolicyMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            AccessPolicyMode::Manual => "MANUAL",
            AccessPolicyMode::AutoLock => "AUTO_LOCK",
            AccessPolicyMode::AccessRequest => "ACCESS_REQUEST",
        }
    }
}

impl Display for AccessPolicyMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessPolicyMode {
    type Err = AccessPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(AccessPolicyMode::Manual),
            "AUTO_LOCK" => Ok(AccessPolicyMode::AutoLock),
            "ACCESS_REQUEST" => Ok(AccessPolicyMode::AccessRequest),
            other => Err(AccessPolicyError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    Automatic,
    Manual,
}

impl ApprovalMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ApprovalMode::Automatic => "AUTOMATIC",
            ApprovalMode::Manual => "MANUAL",
        }
    }
}

impl Display for ApprovalMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalMode {
    type Err = AccessPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTOMATIC" => Ok(ApprovalMode::Automatic),
            "MANUAL" => Ok(ApprovalMode::Manual),
            other => Err(AccessPolicyError::InvalidApprovalMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Approval workflow and auto-lock duration for granted access.
///
/// `duration` keeps the text the operator wrote (`"72h"`, `"3d"`); it is only
/// parsed for validation and comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessPolicy {
    #[serde(default)]
    pub mode: Option<AccessPolicyMode>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub approval_mode: Option<ApprovalMode>,
}

impl AccessPolicy {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.duration.is_none() && self.approval_mode.is_none()
    }

    pub fn parsed_duration(&self) -> Result<Option<Duration>, DurationParseError> {
        self.duration.as_deref().map(parse_duration).transpose()
    }

    /// Check the mode-specific requirements.
    ///
    /// `AUTO_LOCK` needs a duration of at least a day and an approval mode,
    /// `ACCESS_REQUEST` needs an approval mode and allows an optional duration
    /// of at least an hour.
    pub fn validate(&self) -> Result<(), AccessPolicyError> {
        let duration = self.parsed_duration()?;

        let Some(mode) = self.mode else {
            if duration.is_some() || self.approval_mode.is_some() {
                return Err(AccessPolicyError::ModeRequired);
            }
            return Ok(());
        };

        match mode {
            AccessPolicyMode::Manual => Ok(()),
            AccessPolicyMode::AutoLock => {
                let (Some(duration), Some(_)) = (duration, self.approval_mode) else {
                    return Err(AccessPolicyError::AutoLockIncomplete);
                };
                if duration < ONE_DAY {
                    return Err(AccessPolicyError::DurationBelowDay);
                }
                Ok(())
            }
            AccessPolicyMode::AccessRequest => {
                if self.approval_mode.is_none() {
                    return Err(AccessPolicyError::ApprovalModeRequired);
                }
                if duration.is_some_and(|duration| duration < ONE_HOUR) {
                    return Err(AccessPolicyError::DurationBelowHour);
                }
                Ok(())
            }
        }
    }

    /// Same mode, approval mode and duration, comparing durations by length.
    ///
    /// A duration that does not parse is compared by its text.
    pub fn semantically_equal(&self, other: &AccessPolicy) -> bool {
        if self.mode != other.mode || self.approval_mode != other.approval_mode {
            return false;
        }

        match (self.parsed_duration(), other.parsed_duration()) {
            (Ok(left), Ok(right)) => left == right,
            _ => self.duration == other.duration,
        }
    }
}

/// A group granted access to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGroup {
    pub group_id: String,
    #[serde(default)]
    pub security_policy_id: Option<String>,
    #[serde(default)]
    pub access_policy: Option<AccessPolicy>,
}

impl AccessGroup {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            security_policy_id: None,
            access_policy: None,
        }
    }

    /// Whether both entries grant the same access to the same group.
    ///
    /// Security policy ids compare case-insensitively.
    pub fn same_assignment(&self, other: &AccessGroup) -> bool {
        self.group_id == other.group_id
            && equal_optional_str(
                self.security_policy_id.as_deref(),
                other.security_policy_id.as_deref(),
            )
            && match (&self.access_policy, &other.access_policy) {
                (None, None) => true,
                (Some(left), Some(right)) => left.semantically_equal(right),
                _ => false,
            }
    }
}

fn equal_optional_str(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left.eq_ignore_ascii_case(right),
        _ => false,
    }
}

/// A group access entry from a schema that still carried the split
/// approval/duration fields next to (or instead of) a nested policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyAccessGroup {
    pub group_id: String,
    pub security_policy_id: Option<String>,
    pub approval_mode: Option<String>,
    pub usage_based_duration_days: Option<i64>,
    pub access_policy: Option<AccessPolicy>,
}

impl LegacyAccessGroup {
    pub fn has_legacy_fields(&self) -> bool {
        self.approval_mode.is_some() || self.usage_based_duration_days.is_some()
    }
}
