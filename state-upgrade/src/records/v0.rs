use access_core::Configured;
use serde::{Deserialize, Serialize};

use super::common::{AccessBlock, ProtocolsBlock};

/// Resource state as first persisted: protocols and access are block lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceV0 {
    pub id: String,
    #[serde(default)]
    pub name: Configured<String>,
    #[serde(default)]
    pub address: Configured<String>,
    #[serde(default)]
    pub remote_network_id: Configured<String>,
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
    pub access: Configured<Vec<AccessBlock>>,
    #[serde(default)]
    pub protocols: Configured<Vec<ProtocolsBlock>>,
}
