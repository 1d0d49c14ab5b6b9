use std::collections::BTreeMap;

use access_core::{AccessPolicyMode, ApprovalMode, GlobalIdError, Policy, PortRange, Protocol};
use pretty_assertions::assert_eq;

use super::*;
use crate::client::{Snapshot, SnapshotClient};
use crate::records::ProtocolState;
use crate::settings::Settings;

const NON_AUTHORITATIVE: ReconcileOptions = ReconcileOptions {
    default_authoritative: false,
    check_global_ids: false,
};

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|id| id.to_string()).collect()
}

fn groups(raw: &[&str]) -> Vec<AccessGroup> {
    raw.iter().copied().map(AccessGroup::new).collect()
}

fn state(authoritative: bool, group_ids: &[&str], service_accounts: &[&str]) -> ResourceState {
    ResourceState {
        id: "r1".to_string(),
        name: Configured::Value("db".to_string()),
        address: Configured::Value("db.internal".to_string()),
        remote_network_id: Configured::Value("rn1".to_string()),
        is_active: Configured::Value(true),
        is_authoritative: Configured::Value(authoritative),
        protocols: Configured::Value(ProtocolsState::allow_all()),
        access_group: non_empty(groups(group_ids)),
        access_service: non_empty(
            service_accounts
                .iter()
                .copied()
                .map(AccessService::new)
                .collect(),
        ),
        ..ResourceState::default()
    }
}

fn remote(group_ids: &[&str], service_accounts: &[&str]) -> Resource {
    Resource {
        id: "r1".to_string(),
        name: "db".to_string(),
        address: "db.internal".to_string(),
        remote_network_id: "rn1".to_string(),
        is_active: true,
        protocols: Some(Protocols::default()),
        groups_access: groups(group_ids),
        service_accounts: ids(service_accounts),
        ..Resource::default()
    }
}

fn client_with(resource: Resource) -> SnapshotClient {
    SnapshotClient::new(Snapshot {
        resources: vec![resource],
        groups: Vec::new(),
    })
}

fn restricted(ranges: &[(u16, u16)]) -> Protocol {
    Protocol::new(
        Policy::Restricted,
        ranges
            .iter()
            .map(|(start, end)| PortRange::new(*start, *end).expect("valid range"))
            .collect(),
    )
}

#[test]
fn non_authoritative_read_hides_external_grants() {
    let state = state(false, &["g1", "g3"], &["sa1"]);
    let remote = remote(&["g1", "g2"], &["sa1", "sa2"]);

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);

    assert_eq!(refreshed.access_group, Configured::Value(groups(&["g1"])));
    assert_eq!(
        refreshed.access_service,
        Configured::Value(vec![AccessService::new("sa1")])
    );
}

#[test]
fn authoritative_read_surfaces_remote_set() {
    let state = state(true, &["g1"], &[]);
    let remote = remote(&["g1", "g2"], &["sa2"]);

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);

    assert_eq!(refreshed.declared_group_ids(), ids(&["g1", "g2"]));
    assert_eq!(refreshed.declared_service_accounts(), ids(&["sa2"]));
}

#[test]
fn unset_authoritative_flag_uses_default() {
    let mut state = state(false, &["g1"], &[]);
    state.is_authoritative = Configured::Unset;
    let remote = remote(&["g1", "g2"], &[]);

    let refreshed = state_from_remote(
        &remote,
        &state,
        &state,
        ReconcileOptions {
            default_authoritative: true,
            ..NON_AUTHORITATIVE
        },
    );

    assert_eq!(refreshed.is_authoritative, Configured::Value(true));
    assert_eq!(refreshed.declared_group_ids(), ids(&["g1", "g2"]));
}

#[test]
fn unknown_authoritative_flag_counts_as_authoritative() {
    let mut plan = state(false, &["g1"], &[]);
    plan.is_authoritative = Configured::Unknown;
    let remote = remote(&["g1", "g9"], &[]);

    let defaults = Settings::default().reconcile_options();
    assert!(!defaults.default_authoritative);
    let changes = access_changes(&plan, &plan, &remote, defaults);
    assert_eq!(changes.ids_to_delete, ids(&["g9"]));

    plan.is_authoritative = Configured::Unset;
    let changes = access_changes(&plan, &plan, &remote, defaults);
    assert!(changes.ids_to_delete.is_empty());

    let group = GroupState {
        id: "g1".to_string(),
        is_authoritative: Configured::Unknown,
        ..GroupState::default()
    };
    assert!(group.authoritative(false));
}

#[test]
fn missing_remote_resource_clears_state() {
    let client = SnapshotClient::default();
    let refreshed = refresh_resource(&client, &state(false, &[], &[]), NON_AUTHORITATIVE)
        .expect("not found is not an error");
    assert_eq!(refreshed, None);
}

#[test]
fn stored_port_text_survives_refresh() {
    let mut state = state(false, &[], &[]);
    state.protocols = Configured::Value(ProtocolsState {
        allow_icmp: Configured::Value(true),
        tcp: Configured::Value(ProtocolState {
            policy: Configured::Value("RESTRICTED".to_string()),
            ports: Configured::Value(ids(&["81", "80-80"])),
        }),
        udp: Configured::Value(ProtocolState {
            policy: Configured::Value("ALLOW_ALL".to_string()),
            ports: Configured::Value(Vec::new()),
        }),
    });
    let mut remote = remote(&[], &[]);
    remote.protocols = Some(Protocols {
        allow_icmp: true,
        tcp: restricted(&[(80, 81)]),
        udp: Protocol::default(),
    });

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    assert_eq!(refreshed.protocols, state.protocols);

    remote.protocols = Some(Protocols {
        allow_icmp: true,
        tcp: restricted(&[(80, 90)]),
        udp: Protocol::default(),
    });
    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    let tcp = refreshed
        .protocols
        .value()
        .and_then(|protocols| protocols.tcp.value())
        .expect("tcp");
    assert_eq!(tcp.ports, Configured::Value(ids(&["80-90"])));
}

#[test]
fn empty_restricted_remote_reads_back_as_deny_all() {
    let state = state(false, &[], &[]);
    let mut remote = remote(&[], &[]);
    remote.protocols = Some(Protocols {
        allow_icmp: false,
        tcp: Protocol::new(Policy::Restricted, Vec::new()),
        udp: Protocol::default(),
    });

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    let tcp = refreshed
        .protocols
        .value()
        .and_then(|protocols| protocols.tcp.value())
        .expect("tcp");
    assert_eq!(tcp.policy, Configured::Value("DENY_ALL".to_string()));
}

#[test]
fn unknown_optional_attributes_stay_unset() {
    let state = state(false, &[], &[]);
    let mut plan = state.clone();
    plan.is_visible = Configured::Unknown;
    plan.alias = Configured::Unknown;
    let mut remote = remote(&[], &[]);
    remote.is_visible = Some(true);

    let refreshed = state_from_remote(&remote, &state, &plan, NON_AUTHORITATIVE);
    assert!(refreshed.is_visible.is_unset());
    assert!(refreshed.alias.is_unset());

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    assert_eq!(refreshed.is_visible, Configured::Value(true));
}

#[test]
fn equivalent_access_policy_keeps_declared_text() {
    let mut state = state(false, &[], &[]);
    state.access_policy = Configured::Value(AccessPolicy {
        mode: Some(AccessPolicyMode::AutoLock),
        duration: Some("3d".to_string()),
        approval_mode: Some(ApprovalMode::Manual),
    });
    let mut remote = remote(&[], &[]);
    remote.access_policy = Some(AccessPolicy {
        mode: Some(AccessPolicyMode::AutoLock),
        duration: Some("72h".to_string()),
        approval_mode: Some(ApprovalMode::Manual),
    });

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    assert_eq!(refreshed.access_policy, state.access_policy);
}

#[test]
fn declared_tags_are_filtered() {
    let mut state = state(false, &[], &[]);
    state.tags = Configured::Value(BTreeMap::from([("env".to_string(), "prod".to_string())]));
    let mut remote = remote(&[], &[]);
    remote.tags = BTreeMap::from([
        ("env".to_string(), "prod".to_string()),
        ("owner".to_string(), "ops".to_string()),
    ]);

    let refreshed = state_from_remote(&remote, &state, &state, NON_AUTHORITATIVE);
    assert_eq!(refreshed.tags, state.tags);
    assert_eq!(refreshed.tags_all, Configured::Value(remote.tags.clone()));
}

#[test]
fn authoritative_changes_use_remote_set() {
    let plan = state(true, &["g1", "g3"], &["sa1"]);
    let prior = state(true, &["g1"], &["sa1"]);
    let remote = remote(&["g1", "g2"], &["sa1", "sa9"]);

    let changes = access_changes(&plan, &prior, &remote, NON_AUTHORITATIVE);

    assert_eq!(changes.ids_to_delete, ids(&["g2", "sa9"]));
    assert_eq!(changes.groups_to_add, groups(&["g3"]));
    assert!(changes.service_accounts_to_add.is_empty());
}

#[test]
fn non_authoritative_changes_only_revoke_own_entries() {
    let plan = state(false, &["g1", "g3"], &[]);
    let prior = state(false, &["g1", "g4"], &[]);
    let remote = remote(&["g1", "g2", "g4"], &["sa7"]);

    let changes = access_changes(&plan, &prior, &remote, NON_AUTHORITATIVE);

    assert_eq!(changes.ids_to_delete, ids(&["g4"]));
    assert_eq!(changes.groups_to_add, groups(&["g3"]));
    assert!(changes.service_accounts_to_add.is_empty());
}

#[test]
fn unchanged_non_authoritative_access_revokes_nothing() {
    let plan = state(false, &["g1"], &["sa1"]);
    let remote = remote(&[], &["sa2"]);

    let changes = access_changes(&plan, &plan, &remote, NON_AUTHORITATIVE);

    assert!(changes.ids_to_delete.is_empty());
    assert_eq!(changes.groups_to_add, groups(&["g1"]));
    assert_eq!(changes.service_accounts_to_add, ids(&["sa1"]));
}

#[test]
fn changed_group_policy_is_granted_again() {
    let mut plan = state(false, &[], &[]);
    let mut planned = AccessGroup::new("g1");
    planned.security_policy_id = Some("SP1".to_string());
    plan.access_group = Configured::Value(vec![planned.clone()]);

    let mut remote = remote(&[], &[]);
    let mut granted = AccessGroup::new("g1");
    granted.security_policy_id = Some("sp1".to_string());
    remote.groups_access = vec![granted];

    let changes = access_changes(&plan, &plan, &remote, NON_AUTHORITATIVE);
    assert!(changes.is_empty(), "security policy ids compare case-insensitively");

    planned.security_policy_id = Some("sp2".to_string());
    plan.access_group = Configured::Value(vec![planned.clone()]);
    let changes = access_changes(&plan, &plan, &remote, NON_AUTHORITATIVE);
    assert_eq!(changes.groups_to_add, vec![planned]);
    assert!(changes.ids_to_delete.is_empty());
}

#[test]
fn plan_with_invalid_protocols_is_rejected() {
    let mut plan = state(false, &[], &[]);
    plan.protocols = Configured::Value(ProtocolsState {
        allow_icmp: Configured::Value(true),
        tcp: Configured::Value(ProtocolState {
            policy: Configured::Value("ALLOW_ALL".to_string()),
            ports: Configured::Value(ids(&["80"])),
        }),
        udp: Configured::Unset,
    });

    let err = resource_from_plan(&plan, NON_AUTHORITATIVE).expect_err("ports with ALLOW_ALL");
    assert!(matches!(
        err,
        ReconcileError::Protocols(ProtocolError::PortsWithPolicyAllowAll)
    ));
}

#[test]
fn plan_with_incomplete_access_policy_is_rejected() {
    let mut plan = state(false, &[], &[]);
    plan.access_policy = Configured::Value(AccessPolicy {
        mode: Some(AccessPolicyMode::AutoLock),
        duration: Some("2d".to_string()),
        approval_mode: None,
    });

    let err = resource_from_plan(&plan, NON_AUTHORITATIVE).expect_err("auto lock without approval");
    assert!(matches!(
        err,
        ReconcileError::AccessPolicy(AccessPolicyError::AutoLockIncomplete)
    ));

    let mut plan = state(false, &[], &[]);
    let mut group = AccessGroup::new("g1");
    group.access_policy = Some(AccessPolicy {
        mode: Some(AccessPolicyMode::AccessRequest),
        duration: None,
        approval_mode: None,
    });
    plan.access_group = Configured::Value(vec![group]);
    let err = resource_from_plan(&plan, NON_AUTHORITATIVE).expect_err("request without approval");
    assert_eq!(
        err.to_string(),
        format!(
            "invalid access_policy for group g1: {}",
            AccessPolicyError::ApprovalModeRequired
        )
    );
}

#[test]
fn browser_shortcut_needs_concrete_address() {
    let mut plan = state(false, &[], &[]);
    plan.address = Configured::Value("*.internal".to_string());
    plan.is_browser_shortcut_enabled = Configured::Value(true);

    let err = resource_from_plan(&plan, NON_AUTHORITATIVE).expect_err("wildcard");
    assert!(matches!(err, ReconcileError::WildcardAddressWithShortcut { .. }));

    plan.address = Configured::Value("10.0.0.0/24".to_string());
    assert!(resource_from_plan(&plan, NON_AUTHORITATIVE).is_err());

    plan.is_browser_shortcut_enabled = Configured::Value(false);
    assert!(resource_from_plan(&plan, NON_AUTHORITATIVE).is_ok());
}

#[test]
fn global_ids_are_checked_when_enabled() {
    let strict = ReconcileOptions {
        check_global_ids: true,
        ..NON_AUTHORITATIVE
    };

    let plan = state(false, &["R3JvdXA6MQ=="], &["U2VydmljZUFjY291bnQ6Mg=="]);
    assert!(resource_from_plan(&plan, strict).is_ok());

    let plan = state(false, &["g1"], &[]);
    assert!(resource_from_plan(&plan, NON_AUTHORITATIVE).is_ok());
    let err = resource_from_plan(&plan, strict).expect_err("opaque group id");
    assert_eq!(err.to_string(), "unable to parse global ID \"g1\"");

    let plan = state(false, &["R3JvdXA6MQ=="], &["UmVzb3VyY2U6Mw=="]);
    let err = resource_from_plan(&plan, strict).expect_err("resource id as service account");
    assert!(matches!(err, ReconcileError::GlobalId(GlobalIdError { id }) if id == "UmVzb3VyY2U6Mw=="));
}

#[test]
fn plan_defaults_missing_protocols() {
    let mut plan = state(false, &["g1"], &["sa1"]);
    plan.protocols = Configured::Unset;
    plan.is_active = Configured::Unset;

    let resource = resource_from_plan(&plan, NON_AUTHORITATIVE).expect("valid plan");
    assert_eq!(resource.protocols, Some(Protocols::default()));
    assert!(resource.is_active);
    assert_eq!(resource.group_ids(), ids(&["g1"]));
    assert_eq!(resource.service_accounts, ids(&["sa1"]));
}

#[test]
fn apply_plan_updates_attributes_and_access() {
    let mut client = client_with(remote(&["g1", "g2"], &["sa1"]));
    let prior = state(false, &["g1"], &["sa1"]);
    let mut plan = state(false, &["g1", "g3"], &[]);
    plan.name = Configured::Value("db-2".to_string());

    let outcome = apply_plan(&mut client, &plan, &prior, NON_AUTHORITATIVE).expect("apply");

    assert!(outcome.updated);
    assert_eq!(outcome.access.ids_to_delete, ids(&["sa1"]));
    assert_eq!(outcome.access.groups_to_add, groups(&["g3"]));

    let refreshed = outcome.state.expect("resource still exists");
    assert_eq!(refreshed.name, Configured::Value("db-2".to_string()));
    assert_eq!(refreshed.declared_group_ids(), ids(&["g1", "g3"]));
    assert!(refreshed.access_service.is_unset());

    let remote = client.read_resource("r1").expect("read");
    assert_eq!(remote.group_ids(), ids(&["g1", "g2", "g3"]));
    assert!(remote.service_accounts.is_empty());
}

#[test]
fn apply_plan_without_changes_only_reads() {
    let mut client = client_with(remote(&["g1"], &[]));
    let prior = state(false, &["g1"], &[]);

    let outcome = apply_plan(&mut client, &prior, &prior, NON_AUTHORITATIVE).expect("apply");

    assert!(!outcome.updated);
    assert!(outcome.access.is_empty());
    assert_eq!(outcome.state, Some(prior));
}

#[test]
fn apply_plan_on_deleted_resource_clears_state() {
    let mut client = SnapshotClient::default();
    let prior = state(false, &["g1"], &[]);
    let plan = state(false, &["g2"], &[]);

    let outcome = apply_plan(&mut client, &plan, &prior, NON_AUTHORITATIVE).expect("apply");
    assert_eq!(outcome.state, None);
}

#[test]
fn non_authoritative_group_keeps_declared_users() {
    let client = SnapshotClient::new(Snapshot {
        resources: Vec::new(),
        groups: vec![Group {
            id: "g1".to_string(),
            name: "eng".to_string(),
            users: ids(&["u1", "u2", "u3"]),
            ..Group::default()
        }],
    });
    let state = GroupState {
        id: "g1".to_string(),
        name: Configured::Value("eng".to_string()),
        is_authoritative: Configured::Value(false),
        user_ids: Configured::Value(ids(&["u1", "u4"])),
    };

    let refreshed = refresh_group(&client, &state, NON_AUTHORITATIVE)
        .expect("refresh")
        .expect("group exists");
    assert_eq!(refreshed.user_ids, Configured::Value(ids(&["u1"])));

    let authoritative = GroupState {
        is_authoritative: Configured::Value(true),
        ..state.clone()
    };
    let refreshed = refresh_group(&client, &authoritative, NON_AUTHORITATIVE)
        .expect("refresh")
        .expect("group exists");
    assert_eq!(refreshed.user_ids, Configured::Value(ids(&["u1", "u2", "u3"])));

    let untracked = GroupState {
        user_ids: Configured::Unset,
        ..state
    };
    let refreshed = refresh_group(&client, &untracked, NON_AUTHORITATIVE)
        .expect("refresh")
        .expect("group exists");
    assert!(refreshed.user_ids.is_unset());
}
