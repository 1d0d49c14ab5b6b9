//! Reconciliation between persisted state and the remote service.
//!
//! Access collections are either authoritative or not. An authoritative
//! record owns the whole remote set: reads surface everything the service
//! reports, and updates revoke whatever the plan no longer lists. A
//! non-authoritative record only asserts its own entries: reads intersect the
//! remote set with what was declared, so grants made elsewhere never show up
//! as drift, and updates only revoke entries the record itself used to list.
//!
//! Additions are always computed against the remote set as just read, never
//! against the prior plan, so grants added out of band between two runs are
//! not sent twice.

use access_core::protocol::protocols_equal;
use access_core::{
    check_global_id, sets, AccessGroup, AccessPolicy, AccessPolicyError, Configured,
    GlobalIdError, ProtocolError, Protocols,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::{ClientError, RemoteClient};
use crate::model::{AccessInput, Group, Resource};
use crate::records::{AccessService, GroupState, ProtocolsState, ResourceState, Tags};

#[cfg(test)]
mod tests;

/// Knobs shared by every reconciliation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Used when a record leaves `is_authoritative` unset.
    pub default_authoritative: bool,
    /// Require planned group and service account ids to be encoded node ids.
    pub check_global_ids: bool,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to update resource access: {source}")]
    Access { source: ClientError },
    #[error("invalid protocols: {0}")]
    Protocols(#[from] ProtocolError),
    #[error("invalid access_policy: {0}")]
    AccessPolicy(#[from] AccessPolicyError),
    #[error("invalid access_policy for group {group_id}: {source}")]
    GroupAccessPolicy {
        group_id: String,
        source: AccessPolicyError,
    },
    #[error("access_group entries require a group_id")]
    MissingGroupId,
    #[error(transparent)]
    GlobalId(#[from] GlobalIdError),
    #[error("browser shortcut cannot be enabled for wildcard address {address}")]
    WildcardAddressWithShortcut { address: String },
}

/// Grants to revoke and to add for one update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessChanges {
    /// Group and service account ids whose grants are revoked.
    pub ids_to_delete: Vec<String>,
    pub service_accounts_to_add: Vec<String>,
    pub groups_to_add: Vec<AccessGroup>,
}

impl AccessChanges {
    pub fn is_empty(&self) -> bool {
        self.ids_to_delete.is_empty()
            && self.service_accounts_to_add.is_empty()
            && self.groups_to_add.is_empty()
    }

    pub fn access_inputs(&self) -> Vec<AccessInput> {
        self.groups_to_add
            .iter()
            .cloned()
            .map(AccessInput::Group)
            .chain(
                self.service_accounts_to_add
                    .iter()
                    .map(|id| AccessInput::ServiceAccount {
                        service_account_id: id.clone(),
                    }),
            )
            .collect()
    }
}

/// What [`apply_plan`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutcome {
    /// Refreshed state, or `None` when the resource is gone remotely.
    pub state: Option<ResourceState>,
    pub access: AccessChanges,
    /// Whether non-access attributes were sent to the service.
    pub updated: bool,
}

/// Read the remote resource behind `state` and derive the new state.
///
/// A resource that no longer exists yields `Ok(None)`; the caller drops the
/// local record instead of failing.
pub fn refresh_resource<C: RemoteClient + ?Sized>(
    client: &C,
    state: &ResourceState,
    options: ReconcileOptions,
) -> Result<Option<ResourceState>, ReconcileError> {
    let Some(mut remote) = read_or_gone(client.read_resource(&state.id))? else {
        info!(id = %state.id, "resource gone remotely, clearing state");
        return Ok(None);
    };

    keep_empty_policy_ids(&mut remote, state);
    Ok(Some(state_from_remote(&remote, state, state, options)))
}

/// Derive persisted state from what the remote service returned.
///
/// `prior` is the state being replaced and `reference` the configuration the
/// caller holds (the plan on update, the prior state itself on read).
pub fn state_from_remote(
    remote: &Resource,
    prior: &ResourceState,
    reference: &ResourceState,
    options: ReconcileOptions,
) -> ResourceState {
    let authoritative = reference.authoritative(options.default_authoritative);
    let (groups, service_accounts) = if authoritative {
        (remote.groups_access.clone(), remote.service_accounts.clone())
    } else {
        let groups = sets::intersection_by_key(
            &reference.declared_groups(),
            &remote.groups_access,
            |group| group.group_id.clone(),
        );
        let service_accounts =
            sets::intersection(&reference.declared_service_accounts(), &remote.service_accounts);
        debug!(
            id = %remote.id,
            remote_groups = remote.groups_access.len(),
            kept_groups = groups.len(),
            remote_service_accounts = remote.service_accounts.len(),
            kept_service_accounts = service_accounts.len(),
            "hid externally managed access"
        );
        (groups, service_accounts)
    };

    // Optional attributes the operator never set stay unset while the plan
    // still has them unknown.
    let tracked = |prior_unset: bool, reference_unknown: bool| !prior_unset || !reference_unknown;

    let is_visible = if tracked(prior.is_visible.is_unset(), reference.is_visible.is_unknown()) {
        Configured::from_option(remote.is_visible)
    } else {
        prior.is_visible.clone()
    };
    let is_browser_shortcut_enabled = if tracked(
        prior.is_browser_shortcut_enabled.is_unset(),
        reference.is_browser_shortcut_enabled.is_unknown(),
    ) {
        Configured::from_option(remote.is_browser_shortcut_enabled)
    } else {
        prior.is_browser_shortcut_enabled.clone()
    };
    let alias = if tracked(prior.alias.is_unset(), reference.alias.is_unknown()) {
        reference.alias.clone()
    } else {
        prior.alias.clone()
    };
    let dlp_policy_id = if tracked(
        prior.dlp_policy_id.is_unset(),
        reference.dlp_policy_id.is_unknown(),
    ) {
        reference.dlp_policy_id.clone()
    } else {
        prior.dlp_policy_id.clone()
    };
    let protocols = if tracked(prior.protocols.is_unset(), reference.protocols.is_unknown()) {
        refreshed_protocols(remote, prior, reference)
    } else {
        prior.protocols.clone()
    };

    ResourceState {
        id: remote.id.clone(),
        name: Configured::Value(remote.name.clone()),
        address: Configured::Value(remote.address.clone()),
        remote_network_id: Configured::Value(remote.remote_network_id.clone()),
        is_active: Configured::Value(remote.is_active),
        is_authoritative: Configured::Value(authoritative),
        is_visible,
        is_browser_shortcut_enabled,
        alias,
        security_policy_id: Configured::from_option(remote.security_policy_id.clone()),
        dlp_policy_id,
        protocols,
        access_group: non_empty(groups),
        access_service: non_empty(
            service_accounts
                .into_iter()
                .map(AccessService::new)
                .collect(),
        ),
        access_policy: refreshed_access_policy(remote, reference),
        tags: declared_tags(&remote.tags, reference),
        tags_all: non_empty_tags(remote.tags.clone()),
    }
}

/// Work out which grants to revoke and which to add.
///
/// Revocations compare the plan against the last-known remote set for
/// authoritative records and against the prior state otherwise; a
/// non-authoritative record whose access did not change revokes nothing.
/// Additions compare the plan against the remote set.
pub fn access_changes(
    plan: &ResourceState,
    state: &ResourceState,
    remote: &Resource,
    options: ReconcileOptions,
) -> AccessChanges {
    let new_groups = plan.declared_groups();
    let new_service_accounts = plan.declared_service_accounts();

    let (old_group_ids, old_service_accounts) = if plan.authoritative(options.default_authoritative)
    {
        (remote.group_ids(), remote.service_accounts.clone())
    } else {
        let groups = if plan.access_group != state.access_group {
            state.declared_group_ids()
        } else {
            Vec::new()
        };
        let service_accounts = if plan.access_service != state.access_service {
            state.declared_service_accounts()
        } else {
            Vec::new()
        };
        (groups, service_accounts)
    };

    let mut ids_to_delete = sets::difference(&old_group_ids, &plan.declared_group_ids());
    ids_to_delete.extend(sets::difference(
        &old_service_accounts,
        &new_service_accounts,
    ));

    let changes = AccessChanges {
        ids_to_delete,
        service_accounts_to_add: sets::difference(
            &new_service_accounts,
            &remote.service_accounts,
        ),
        groups_to_add: sets::difference_by(
            &new_groups,
            &remote.groups_access,
            |group| group.group_id.clone(),
            AccessGroup::same_assignment,
        ),
    };
    debug!(
        id = %remote.id,
        delete = changes.ids_to_delete.len(),
        add_groups = changes.groups_to_add.len(),
        add_service_accounts = changes.service_accounts_to_add.len(),
        "computed access changes"
    );
    changes
}

/// Revoke, then grant.
pub fn apply_access_changes<C: RemoteClient + ?Sized>(
    client: &mut C,
    resource_id: &str,
    changes: &AccessChanges,
) -> Result<(), ReconcileError> {
    if !changes.ids_to_delete.is_empty() {
        client
            .remove_resource_access(resource_id, &changes.ids_to_delete)
            .map_err(|source| ReconcileError::Access { source })?;
    }

    let inputs = changes.access_inputs();
    if !inputs.is_empty() {
        client
            .set_resource_access(resource_id, &inputs)
            .map_err(|source| ReconcileError::Access { source })?;
    }
    Ok(())
}

/// Build the domain object the service expects from a planned state.
///
/// Protocols are normalized and access policies validated here, so nothing
/// invalid reaches the client.
pub fn resource_from_plan(
    plan: &ResourceState,
    options: ReconcileOptions,
) -> Result<Resource, ReconcileError> {
    let protocols = match &plan.protocols {
        Configured::Value(protocols) => protocols.normalize()?,
        Configured::Unset | Configured::Unknown => Protocols::default(),
    };

    let access_policy = plan
        .access_policy
        .value()
        .filter(|policy| !policy.is_empty())
        .cloned();
    if let Some(policy) = &access_policy {
        policy.validate()?;
    }

    let groups_access = plan.declared_groups();
    for group in &groups_access {
        if group.group_id.trim().is_empty() {
            return Err(ReconcileError::MissingGroupId);
        }
        if options.check_global_ids {
            check_global_id(&group.group_id)?;
        }
        if let Some(policy) = &group.access_policy {
            policy
                .validate()
                .map_err(|source| ReconcileError::GroupAccessPolicy {
                    group_id: group.group_id.clone(),
                    source,
                })?;
        }
    }

    let service_accounts = plan.declared_service_accounts();
    if options.check_global_ids {
        for id in &service_accounts {
            check_global_id(id)?;
        }
    }

    let address = plan.address.value().cloned().unwrap_or_default();
    let is_browser_shortcut_enabled = plan.is_browser_shortcut_enabled.value().copied();
    if is_browser_shortcut_enabled == Some(true) && is_wildcard_address(&address) {
        return Err(ReconcileError::WildcardAddressWithShortcut { address });
    }

    Ok(Resource {
        id: plan.id.clone(),
        name: plan.name.value().cloned().unwrap_or_default(),
        address,
        remote_network_id: plan.remote_network_id.value().cloned().unwrap_or_default(),
        is_active: plan.is_active.value().copied().unwrap_or(true),
        protocols: Some(protocols),
        is_authoritative: plan.authoritative(options.default_authoritative),
        access_policy,
        groups_access,
        service_accounts,
        is_visible: plan.is_visible.value().copied(),
        is_browser_shortcut_enabled,
        alias: plan.alias.value().cloned(),
        security_policy_id: plan.security_policy_id.value().cloned(),
        dlp_policy_id: plan.dlp_policy_id.value().cloned(),
        tags: plan.tags.value().cloned().unwrap_or_default(),
    })
}

/// Push a planned state to the service and return the refreshed state.
pub fn apply_plan<C: RemoteClient + ?Sized>(
    client: &mut C,
    plan: &ResourceState,
    state: &ResourceState,
    options: ReconcileOptions,
) -> Result<PlanOutcome, ReconcileError> {
    let mut input = resource_from_plan(plan, options)?;
    input.id = state.id.clone();

    let mut access = AccessChanges::default();
    if plan.access_group != state.access_group || plan.access_service != state.access_service {
        let Some(remote) = read_or_gone(client.read_resource(&input.id))? else {
            return Ok(gone(&input.id, access));
        };
        access = access_changes(plan, state, &remote, options);
        apply_access_changes(client, &input.id, &access)?;
    }

    let updated = resource_changed(plan, state);
    let result = if updated {
        client.update_resource(&input)
    } else {
        client.read_resource(&input.id)
    };
    let Some(mut remote) = read_or_gone(result)? else {
        return Ok(gone(&input.id, access));
    };
    keep_empty_policy_ids(&mut remote, plan);

    info!(
        id = %input.id,
        updated,
        revoked = access.ids_to_delete.len(),
        granted = access.groups_to_add.len() + access.service_accounts_to_add.len(),
        "applied plan"
    );
    Ok(PlanOutcome {
        state: Some(state_from_remote(&remote, state, plan, options)),
        access,
        updated,
    })
}

/// Read the remote group behind `state` and derive the new state.
pub fn refresh_group<C: RemoteClient + ?Sized>(
    client: &C,
    state: &GroupState,
    options: ReconcileOptions,
) -> Result<Option<GroupState>, ReconcileError> {
    let Some(remote) = read_or_gone(client.read_group(&state.id))? else {
        info!(id = %state.id, "group gone remotely, clearing state");
        return Ok(None);
    };
    Ok(Some(group_state_from_remote(&remote, state, options)))
}

fn group_state_from_remote(
    remote: &Group,
    state: &GroupState,
    options: ReconcileOptions,
) -> GroupState {
    let authoritative = state.authoritative(options.default_authoritative);
    let users = if authoritative {
        remote.users.clone()
    } else {
        sets::intersection(&state.declared_user_ids(), &remote.users)
    };

    GroupState {
        id: remote.id.clone(),
        name: Configured::Value(remote.name.clone()),
        is_authoritative: Configured::Value(authoritative),
        user_ids: if state.user_ids.is_unset() {
            Configured::Unset
        } else {
            Configured::Value(users)
        },
    }
}

fn read_or_gone<T>(result: Result<T, ClientError>) -> Result<Option<T>, ReconcileError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn gone(id: &str, access: AccessChanges) -> PlanOutcome {
    info!(%id, "resource gone remotely, clearing state");
    PlanOutcome {
        state: None,
        access,
        updated: false,
    }
}

/// An empty policy id in configuration means "service default"; keep it empty
/// instead of reporting the id the service filled in.
fn keep_empty_policy_ids(remote: &mut Resource, reference: &ResourceState) {
    if reference.security_policy_id.value().is_some_and(String::is_empty) {
        remote.security_policy_id = Some(String::new());
    }
    if reference.dlp_policy_id.value().is_some_and(String::is_empty) {
        remote.dlp_policy_id = Some(String::new());
    }
}

fn refreshed_protocols(
    remote: &Resource,
    prior: &ResourceState,
    reference: &ResourceState,
) -> Configured<ProtocolsState> {
    let computed =
        ProtocolsState::from_protocols(&remote.protocols_or_default(), reference.protocols.value());
    match &prior.protocols {
        Configured::Value(stored) if protocols_state_equal(stored, &computed) => {
            prior.protocols.clone()
        }
        _ => Configured::Value(computed),
    }
}

fn protocols_state_equal(left: &ProtocolsState, right: &ProtocolsState) -> bool {
    match (left.normalize(), right.normalize()) {
        (Ok(left), Ok(right)) => protocols_equal(&left, &right),
        _ => left == right,
    }
}

fn refreshed_access_policy(
    remote: &Resource,
    reference: &ResourceState,
) -> Configured<AccessPolicy> {
    match (&remote.access_policy, reference.access_policy.value()) {
        (Some(remote_policy), Some(declared)) if declared.semantically_equal(remote_policy) => {
            reference.access_policy.clone()
        }
        (Some(remote_policy), _) => Configured::Value(remote_policy.clone()),
        (None, _) => Configured::Unset,
    }
}

/// Remote tags restricted to the keys the reference declares.
fn declared_tags(remote: &Tags, reference: &ResourceState) -> Configured<Tags> {
    match reference.tags.value() {
        Some(declared) => Configured::Value(
            remote
                .iter()
                .filter(|(key, _)| declared.contains_key(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => Configured::Unset,
    }
}

fn non_empty_tags(tags: Tags) -> Configured<Tags> {
    if tags.is_empty() {
        Configured::Unset
    } else {
        Configured::Value(tags)
    }
}

fn non_empty<T>(items: Vec<T>) -> Configured<Vec<T>> {
    if items.is_empty() {
        Configured::Unset
    } else {
        Configured::Value(items)
    }
}

fn resource_changed(plan: &ResourceState, state: &ResourceState) -> bool {
    let protocols_changed = match (&plan.protocols, &state.protocols) {
        (Configured::Value(planned), Configured::Value(stored)) => {
            !protocols_state_equal(planned, stored)
        }
        (planned, stored) => planned != stored,
    };

    plan.remote_network_id != state.remote_network_id
        || plan.name != state.name
        || plan.address != state.address
        || protocols_changed
        || plan.is_active != state.is_active
        || plan.is_visible != state.is_visible
        || plan.is_browser_shortcut_enabled != state.is_browser_shortcut_enabled
        || plan.alias != state.alias
        || plan.security_policy_id != state.security_policy_id
        || plan.dlp_policy_id != state.dlp_policy_id
        || plan.access_policy != state.access_policy
        || plan.tags != state.tags
}

/// Wildcard DNS names and CIDR ranges cannot back a browser shortcut.
fn is_wildcard_address(address: &str) -> bool {
    address.contains(['*', '?', '/'])
}
