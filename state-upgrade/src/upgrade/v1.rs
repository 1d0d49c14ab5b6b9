use std::collections::BTreeSet;

use access_core::{Configured, MigrationWarning};

use super::{single_element, StepError, StepOutput};
use crate::attr::Attr;
use crate::records::{AccessGroupV2, AccessService, ResourceV1, ResourceV2};

/// The `access` block splits into `access_group` and `access_service` sets.
///
/// Tags and the split approval/auto-lock attributes start out null.
pub fn upgrade_resource_v1(prior: ResourceV1) -> Result<StepOutput<ResourceV2>, StepError> {
    let block = single_element(
        Attr::Access.name(),
        prior.access.into_value().unwrap_or_default(),
    )?
    .unwrap_or_default();

    let group_ids = unique(block.group_ids.into_value().unwrap_or_default());
    let service_account_ids = unique(block.service_account_ids.into_value().unwrap_or_default());
    let used_access = !group_ids.is_empty() || !service_account_ids.is_empty();

    let access_group = non_empty(
        group_ids
            .into_iter()
            .map(|group_id| AccessGroupV2 {
                group_id,
                ..AccessGroupV2::default()
            })
            .collect(),
    );
    let access_service = non_empty(
        service_account_ids
            .into_iter()
            .map(AccessService::new)
            .collect(),
    );

    let record = ResourceV2 {
        id: prior.id,
        name: prior.name,
        address: prior.address,
        remote_network_id: prior.remote_network_id,
        is_active: prior.is_active,
        is_authoritative: prior.is_authoritative,
        is_visible: prior.is_visible,
        is_browser_shortcut_enabled: prior.is_browser_shortcut_enabled,
        alias: prior.alias.unset_if(String::is_empty),
        security_policy_id: prior.security_policy_id.unset_if(String::is_empty),
        protocols: prior.protocols,
        access_group,
        access_service,
        tags: Configured::Unset,
        tags_all: Configured::Unset,
        approval_mode: Configured::Unset,
        usage_based_autolock_duration_days: Configured::Unset,
    };

    let warning = used_access.then(|| {
        MigrationWarning::new(
            "Please update the access blocks.",
            "access was split into access_group and access_service",
        )
    });
    Ok(StepOutput::new(record, warning))
}

fn unique(ids: Vec<String>) -> Vec<String> {
    ids.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn non_empty<T>(items: Vec<T>) -> Configured<Vec<T>> {
    if items.is_empty() {
        Configured::Unset
    } else {
        Configured::Value(items)
    }
}
