use access_core::MigrationWarning;

use super::{StepError, StepOutput};
use crate::records::{GroupV0, GroupV1};

/// Security policies no longer live on groups; the attribute is dropped.
pub fn upgrade_group_v0(prior: GroupV0) -> Result<StepOutput<GroupV1>, StepError> {
    let dropped = prior
        .security_policy_id
        .value()
        .is_some_and(|id| !id.is_empty());

    let record = GroupV1 {
        id: prior.id,
        name: prior.name,
        is_authoritative: prior.is_authoritative,
        user_ids: prior.user_ids,
    };

    let warning = dropped.then(|| {
        MigrationWarning::new(
            "Group security_policy_id is no longer supported",
            "security_policy_id was removed from the group; assign security policies on resources instead",
        )
    });
    Ok(StepOutput::new(record, warning))
}
