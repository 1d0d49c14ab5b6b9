use access_core::{AccessGroup, AccessPolicy, Configured};
use serde::{Deserialize, Serialize};

use super::common::{AccessService, ProtocolsState, Tags};

/// Current resource state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceV4 {
    pub id: String,
    #[serde(default)]
    pub name: Configured<String>,
    #[serde(default)]
    pub address: Configured<String>,
    #[serde(default)]
    pub remote_network_id: Configured<String>,
    #[serde(default)]
    pub is_active: Configured<bool>,
    #[serde(default)]
    pub is_authoritative: Configured<bool>,
    #[serde(default)]
    pub is_visible: Configured<bool>,
    #[serde(default)]
    pub is_browser_shortcut_enabled: Configured<bool>,
    #[serde(default)]
    pub alias: Configured<String>,
    #[serde(default)]
    pub security_policy_id: Configured<String>,
    #[serde(default)]
    pub dlp_policy_id: Configured<String>,
    #[serde(default)]
    pub protocols: Configured<ProtocolsState>,
    #[serde(default)]
    pub access_group: Configured<Vec<AccessGroup>>,
    #[serde(default)]
    pub access_service: Configured<Vec<AccessService>>,
    #[serde(default)]
    pub access_policy: Configured<AccessPolicy>,
    #[serde(default)]
    pub tags: Configured<Tags>,
    #[serde(default)]
    pub tags_all: Configured<Tags>,
}

impl ResourceV4 {
    /// `is_authoritative`, or `default` when it is unset. A value not yet
    /// known at plan time counts as authoritative.
    pub fn authoritative(&self, default: bool) -> bool {
        match self.is_authoritative {
            Configured::Value(value) => value,
            Configured::Unknown => true,
            Configured::Unset => default,
        }
    }

    pub fn declared_groups(&self) -> Vec<AccessGroup> {
        self.access_group.value().cloned().unwrap_or_default()
    }

    pub fn declared_group_ids(&self) -> Vec<String> {
        self.declared_groups()
            .into_iter()
            .map(|group| group.group_id)
            .collect()
    }

    pub fn declared_service_accounts(&self) -> Vec<String> {
        self.access_service
            .value()
            .map(|services| {
                services
                    .iter()
                    .map(|service| service.service_account_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
