//! Domain objects exchanged with the remote service.
//!
//! These are what a [`RemoteClient`](crate::client::RemoteClient) reads and
//! writes: fully normalized, no tri-state attributes. Converting between them
//! and the persisted record shapes is the job of [`reconcile`](crate::reconcile).

use std::collections::BTreeMap;

use access_core::{AccessGroup, AccessPolicy, Protocols};
use serde::{Deserialize, Serialize};

/// A network-accessible resource as the remote service reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub address: String,
    pub remote_network_id: String,
    pub is_active: bool,
    pub protocols: Option<Protocols>,
    /// Local-only flag; the remote service never stores it.
    #[serde(skip)]
    pub is_authoritative: bool,
    pub access_policy: Option<AccessPolicy>,
    pub groups_access: Vec<AccessGroup>,
    pub service_accounts: Vec<String>,
    pub is_visible: Option<bool>,
    pub is_browser_shortcut_enabled: Option<bool>,
    pub alias: Option<String>,
    pub security_policy_id: Option<String>,
    pub dlp_policy_id: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn group_ids(&self) -> Vec<String> {
        self.groups_access
            .iter()
            .map(|group| group.group_id.clone())
            .collect()
    }

    /// Protocols, with the defaults substituted when the remote sent none.
    pub fn protocols_or_default(&self) -> Protocols {
        self.protocols.clone().unwrap_or_default()
    }
}

/// A group of users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub is_authoritative: bool,
    pub users: Vec<String>,
}

/// One grant sent to the remote service when access is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccessInput {
    Group(AccessGroup),
    ServiceAccount { service_account_id: String },
}

impl AccessInput {
    pub fn principal_id(&self) -> &str {
        match self {
            AccessInput::Group(group) => &group.group_id,
            AccessInput::ServiceAccount { service_account_id } => service_account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_protocols_fall_back_to_defaults() {
        let resource: Resource =
            serde_json::from_value(json!({ "id": "r1", "name": "db" })).expect("decode");

        assert_eq!(resource.protocols, None);
        assert_eq!(resource.protocols_or_default(), Protocols::default());
    }

    #[test]
    fn authoritative_flag_is_not_serialized() {
        let resource = Resource {
            id: "r1".to_string(),
            is_authoritative: true,
            ..Resource::default()
        };
        let encoded = serde_json::to_value(&resource).expect("encode");
        assert!(encoded.get("is_authoritative").is_none());
    }

    #[test]
    fn access_inputs_name_their_principal() {
        let group = AccessInput::Group(AccessGroup::new("g1"));
        let account = AccessInput::ServiceAccount {
            service_account_id: "sa1".to_string(),
        };
        assert_eq!(group.principal_id(), "g1");
        assert_eq!(account.principal_id(), "sa1");
    }
}
