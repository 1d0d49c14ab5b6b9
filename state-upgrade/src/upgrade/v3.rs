use access_core::legacy::migrate_legacy_access_group;
use access_core::{AccessGroup, AccessPolicy, Configured, LegacyAccessGroup, MigrationWarning};

use super::v2::{fold, has_legacy_values};
use super::{single_element, StepError, StepOutput};
use crate::attr::Attr;
use crate::records::{AccessGroupV3, ResourceV3, ResourceV4};

/// Access policy sets become single objects and the split attributes go away.
///
/// An explicit access policy always wins; the split attributes are only
/// folded when no policy was set. `dlp_policy_id` starts out null.
pub fn upgrade_resource_v3(prior: ResourceV3) -> Result<StepOutput<ResourceV4>, StepError> {
    let resource_legacy =
        has_legacy_values(&prior.approval_mode, &prior.usage_based_autolock_duration_days);

    let explicit = match &prior.access_policy {
        Configured::Value(policies) => {
            single_element(Attr::AccessPolicy.name(), policies.clone())?
                .filter(|policy| !policy.is_empty())
        }
        Configured::Unset | Configured::Unknown => None,
    };

    let access_policy = match explicit {
        Some(policy) => Configured::Value(policy),
        None => {
            match fold(&prior.approval_mode, &prior.usage_based_autolock_duration_days)?.policy {
                Some(policy) => Configured::Value(policy),
                None if prior.access_policy.is_unknown() => Configured::Unknown,
                None => Configured::Unset,
            }
        }
    };

    let mut legacy_groups = 0usize;
    let access_group = match prior.access_group {
        Configured::Value(groups) => {
            let mut upgraded = Vec::with_capacity(groups.len());
            for group in groups {
                let (group, had_legacy) = upgrade_group(group)?;
                legacy_groups += usize::from(had_legacy);
                upgraded.push(group);
            }
            Configured::Value(upgraded)
        }
        Configured::Unknown => Configured::Unknown,
        Configured::Unset => Configured::Unset,
    };

    let mut sources = Vec::new();
    if resource_legacy {
        sources.push("resource".to_string());
    }
    if legacy_groups > 0 {
        sources.push(format!("{legacy_groups} access group(s)"));
    }

    let record = ResourceV4 {
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
        dlp_policy_id: Configured::Unset,
        protocols: prior.protocols,
        access_group,
        access_service: prior.access_service,
        access_policy,
        tags: prior.tags,
        tags_all: prior.tags_all,
    };

    let warning = (!sources.is_empty()).then(|| {
        MigrationWarning::legacy_access_policy(format!(
            "approval_mode and usage_based_autolock_duration_days removed from {}",
            sources.join(" and ")
        ))
    });
    Ok(StepOutput::new(record, warning))
}

fn upgrade_group(group: AccessGroupV3) -> Result<(AccessGroup, bool), StepError> {
    let access_policy: Option<AccessPolicy> = single_element(
        Attr::AccessGroup.nested(Attr::AccessPolicy),
        group.access_policy.into_value().unwrap_or_default(),
    )?;

    let legacy = LegacyAccessGroup {
        group_id: group.group_id,
        security_policy_id: group
            .security_policy_id
            .unset_if(String::is_empty)
            .into_value(),
        approval_mode: group
            .approval_mode
            .unset_if(String::is_empty)
            .into_value(),
        usage_based_duration_days: group.usage_based_autolock_duration_days.into_value(),
        access_policy,
    };
    Ok(migrate_legacy_access_group(legacy)?)
}
