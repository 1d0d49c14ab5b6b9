use access_core::Configured;
use serde::{Deserialize, Serialize};

use super::common::{AccessGroupV2, AccessService, ProtocolsState, Tags};

/// Access split into `access_group` and `access_service` sets, tags added,
/// and the resource-level approval/auto-lock attributes introduced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceV2 {
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
    pub protocols: Configured<ProtocolsState>,
    #[serde(default)]
    pub access_group: Configured<Vec<AccessGroupV2>>,
    #[serde(default)]
    pub access_service: Configured<Vec<AccessService>>,
    #[serde(default)]
    pub tags: Configured<Tags>,
    #[serde(default)]
    pub tags_all: Configured<Tags>,
    #[serde(default)]
    pub approval_mode: Configured<String>,
    #[serde(default)]
    pub usage_based_autolock_duration_days: Configured<i64>,
}
