use access_core::Configured;
use serde::{Deserialize, Serialize};

/// Group state before security policies moved off groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupV0 {
    pub id: String,
    #[serde(default)]
    pub name: Configured<String>,
    #[serde(default)]
    pub is_authoritative: Configured<bool>,
    #[serde(default)]
    pub user_ids: Configured<Vec<String>>,
    #[serde(default)]
    pub security_policy_id: Configured<String>,
}

/// Current group state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupV1 {
    pub id: String,
    #[serde(default)]
    pub name: Configured<String>,
    #[serde(default)]
    pub is_authoritative: Configured<bool>,
    #[serde(default)]
    pub user_ids: Configured<Vec<String>>,
}

impl GroupV1 {
    pub fn authoritative(&self, default: bool) -> bool {
        match self.is_authoritative {
            Configured::Value(value) => value,
            Configured::Unknown => true,
            Configured::Unset => default,
        }
    }

    pub fn declared_user_ids(&self) -> Vec<String> {
        self.user_ids.value().cloned().unwrap_or_default()
    }
}
