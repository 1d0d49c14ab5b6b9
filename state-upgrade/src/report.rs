use access_core::{MigrationWarning, Protocol, Protocols};
use colored::Colorize;

use crate::reconcile::{AccessChanges, PlanOutcome};
use crate::records::GroupState;
use crate::upgrade::RecordKind;

/// Render one deprecation warning.
pub fn render_warning(warning: &MigrationWarning) -> String {
    format!(
        "{} {}\n  {}",
        "warning:".yellow().bold(),
        warning.summary.yellow(),
        warning.detail
    )
}

/// Render the one-line result of an upgrade.
pub fn render_upgrade_summary(kind: RecordKind, from: u32, to: u32, warnings: usize) -> String {
    let line = if from == to {
        format!("{kind} state already at version {to}")
    } else {
        format!("upgraded {kind} state from version {from} to {to}")
    };
    format!("{line} warnings={warnings}").cyan().to_string()
}

/// Render normalized protocols, one direction per line.
pub fn render_protocols(protocols: &Protocols) -> String {
    [
        format!("allow_icmp={}", protocols.allow_icmp),
        render_protocol("tcp", &protocols.tcp),
        render_protocol("udp", &protocols.udp),
    ]
    .join("\n")
}

fn render_protocol(name: &str, protocol: &Protocol) -> String {
    format!(
        "{name} policy={} ports={}",
        protocol.state_policy(),
        protocol.port_strings().join(",")
    )
}

/// Render grants to revoke and add.
pub fn render_access_changes(changes: &AccessChanges) -> String {
    let mut out = Vec::new();
    for id in &changes.ids_to_delete {
        out.push(format!("- revoke {id}").red().to_string());
    }
    for group in &changes.groups_to_add {
        out.push(format!("+ grant group {}", group.group_id).green().to_string());
    }
    for id in &changes.service_accounts_to_add {
        out.push(format!("+ grant service account {id}").green().to_string());
    }
    if out.is_empty() {
        out.push("access unchanged".to_string());
    }
    out.join("\n")
}

/// Render the result of applying a plan.
pub fn render_plan_outcome(outcome: &PlanOutcome) -> String {
    let mut out = vec![render_access_changes(&outcome.access)];
    let summary = match &outcome.state {
        Some(state) => format!(
            "resource {} reconciled updated={} revoked={} granted={}",
            state.id,
            outcome.updated,
            outcome.access.ids_to_delete.len(),
            outcome.access.groups_to_add.len() + outcome.access.service_accounts_to_add.len()
        )
        .cyan()
        .to_string(),
        None => "resource gone remotely, state cleared".red().to_string(),
    };
    out.push(summary);
    out.join("\n")
}

/// Render the result of refreshing a group.
pub fn render_group_refresh(id: &str, state: Option<&GroupState>) -> String {
    match state {
        Some(state) => {
            let users = state.user_ids.value().map_or(0, Vec::len);
            format!("group {id} reconciled users={users}").cyan().to_string()
        }
        None => format!("group {id} gone remotely, state cleared")
            .red()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use access_core::protocol::normalize_protocol;
    use access_core::AccessGroup;
    use pretty_assertions::assert_eq;

    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn protocols_render_state_policy() {
        plain();
        let protocols = Protocols {
            allow_icmp: false,
            tcp: normalize_protocol("RESTRICTED", &["443", "80-82"]).expect("tcp"),
            udp: normalize_protocol("DENY_ALL", &[] as &[&str]).expect("udp"),
        };
        assert_eq!(
            render_protocols(&protocols),
            "allow_icmp=false\ntcp policy=RESTRICTED ports=443,80-82\nudp policy=DENY_ALL ports="
        );
    }

    #[test]
    fn access_changes_list_revocations_first() {
        plain();
        let changes = AccessChanges {
            ids_to_delete: vec!["g2".to_string()],
            service_accounts_to_add: vec!["sa1".to_string()],
            groups_to_add: vec![AccessGroup::new("g3")],
        };
        assert_eq!(
            render_access_changes(&changes),
            "- revoke g2\n+ grant group g3\n+ grant service account sa1"
        );
        assert_eq!(
            render_access_changes(&AccessChanges::default()),
            "access unchanged"
        );
    }

    #[test]
    fn summary_notes_current_records() {
        plain();
        assert_eq!(
            render_upgrade_summary(RecordKind::Group, 1, 1, 0),
            "group state already at version 1 warnings=0"
        );
        assert_eq!(
            render_upgrade_summary(RecordKind::Resource, 0, 4, 1),
            "upgraded resource state from version 0 to 4 warnings=1"
        );
    }

    #[test]
    fn group_refresh_reports_tracked_users() {
        plain();
        let state = GroupState {
            id: "g1".to_string(),
            user_ids: access_core::Configured::Value(vec!["u1".to_string(), "u2".to_string()]),
            ..GroupState::default()
        };
        assert_eq!(
            render_group_refresh("g1", Some(&state)),
            "group g1 reconciled users=2"
        );
        assert_eq!(
            render_group_refresh("g1", None),
            "group g1 gone remotely, state cleared"
        );
    }
}
