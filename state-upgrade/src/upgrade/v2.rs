use access_core::legacy::{migrate_approval_mode, LegacyFold};
use access_core::{AccessPolicy, Configured, MigrationWarning};

use super::{StepError, StepOutput};
use crate::records::{AccessGroupV2, AccessGroupV3, ResourceV2, ResourceV3};

/// Fold the split approval/auto-lock attributes into `access_policy` sets.
///
/// Both the resource-level attributes and those of every access group are
/// folded and then cleared.
pub fn upgrade_resource_v2(prior: ResourceV2) -> Result<StepOutput<ResourceV3>, StepError> {
    let resource_fold = fold(&prior.approval_mode, &prior.usage_based_autolock_duration_days)?;
    let mut folded_groups = 0usize;

    let access_group = match prior.access_group {
        Configured::Value(groups) => {
            let mut upgraded = Vec::with_capacity(groups.len());
            for group in groups {
                let (group, folded) = upgrade_group(group)?;
                folded_groups += usize::from(folded);
                upgraded.push(group);
            }
            Configured::Value(upgraded)
        }
        Configured::Unknown => Configured::Unknown,
        Configured::Unset => Configured::Unset,
    };

    let mut folded = Vec::new();
    if resource_fold.warning.is_some() {
        folded.push("resource".to_string());
    }
    if folded_groups > 0 {
        folded.push(format!("{folded_groups} access group(s)"));
    }

    let record = ResourceV3 {
        id: prior.id,
        name: prior.name,
        address: prior.address,
        remote_network_id: prior.remote_network_id,
        is_active: prior.is_active,
        is_authoritative: prior.is_authoritative,
        is_visible: prior.is_visible,
        is_browser_shortcut_enabled: prior.is_browser_shortcut_enabled,
        alias: prior.alias,
        security_policy_id: prior.security_policy_id,
        protocols: prior.protocols,
        access_group,
        access_service: prior.access_service,
        access_policy: policy_set(resource_fold.policy),
        tags: prior.tags,
        tags_all: prior.tags_all,
        approval_mode: Configured::Unset,
        usage_based_autolock_duration_days: Configured::Unset,
    };

    let warning = (!folded.is_empty()).then(|| {
        MigrationWarning::legacy_access_policy(format!(
            "approval_mode and usage_based_autolock_duration_days folded into access_policy for {}",
            folded.join(" and ")
        ))
    });
    Ok(StepOutput::new(record, warning))
}

fn upgrade_group(group: AccessGroupV2) -> Result<(AccessGroupV3, bool), StepError> {
    let group_fold = fold(&group.approval_mode, &group.usage_based_autolock_duration_days)?;
    let folded = group_fold.warning.is_some();

    let upgraded = AccessGroupV3 {
        group_id: group.group_id,
        security_policy_id: group.security_policy_id,
        usage_based_autolock_duration_days: Configured::Unset,
        approval_mode: Configured::Unset,
        access_policy: policy_set(group_fold.policy),
    };
    Ok((upgraded, folded))
}

/// Only known, non-empty legacy values count as populated.
pub(super) fn fold(
    approval_mode: &Configured<String>,
    usage_based_duration_days: &Configured<i64>,
) -> Result<LegacyFold, StepError> {
    let days = usage_based_duration_days.value().copied();
    Ok(migrate_approval_mode(populated_mode(approval_mode), days)?)
}

/// Whether [`fold`] would find anything to migrate, without validating it.
pub(super) fn has_legacy_values(
    approval_mode: &Configured<String>,
    usage_based_duration_days: &Configured<i64>,
) -> bool {
    populated_mode(approval_mode).is_some() || usage_based_duration_days.is_value()
}

fn populated_mode(approval_mode: &Configured<String>) -> Option<&str> {
    approval_mode
        .value()
        .map(String::as_str)
        .filter(|mode| !mode.is_empty())
}

fn policy_set(policy: Option<AccessPolicy>) -> Configured<Vec<AccessPolicy>> {
    match policy {
        Some(policy) => Configured::Value(vec![policy]),
        None => Configured::Unset,
    }
}
