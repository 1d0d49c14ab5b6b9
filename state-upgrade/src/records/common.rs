use std::collections::BTreeMap;

use access_core::protocol::{
    normalize_protocols, prefer_stored_ports, Protocol, ProtocolError, ProtocolInput, Protocols,
    ProtocolsInput,
};
use access_core::{AccessPolicy, Configured};
use serde::{Deserialize, Serialize};

pub type Tags = BTreeMap<String, String>;

/// One protocol direction in object form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolState {
    #[serde(default)]
    pub policy: Configured<String>,
    #[serde(default)]
    pub ports: Configured<Vec<String>>,
}

impl ProtocolState {
    pub fn to_input(&self) -> ProtocolInput {
        ProtocolInput {
            policy: self.policy.value().cloned(),
            ports: self.ports.value().cloned().unwrap_or_default(),
        }
    }

    /// State form of a normalized protocol.
    ///
    /// When `stored` lists the same ports in a different textual form, the
    /// stored text is kept.
    pub fn from_protocol(protocol: &Protocol, stored: Option<&ProtocolState>) -> Self {
        let computed = protocol.port_strings();
        let ports = match stored.and_then(|stored| stored.ports.value()) {
            Some(stored_ports) => prefer_stored_ports(stored_ports, &computed),
            None => computed,
        };

        Self {
            policy: Configured::Value(protocol.state_policy().to_string()),
            ports: Configured::Value(ports),
        }
    }
}

/// The protocols attribute in object form (schema version 1 and later).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolsState {
    #[serde(default)]
    pub allow_icmp: Configured<bool>,
    #[serde(default)]
    pub tcp: Configured<ProtocolState>,
    #[serde(default)]
    pub udp: Configured<ProtocolState>,
}

impl ProtocolsState {
    pub fn to_input(&self) -> ProtocolsInput {
        ProtocolsInput {
            allow_icmp: self.allow_icmp.value().copied(),
            tcp: self.tcp.value().map(ProtocolState::to_input),
            udp: self.udp.value().map(ProtocolState::to_input),
        }
    }

    pub fn normalize(&self) -> Result<Protocols, ProtocolError> {
        normalize_protocols(Some(&self.to_input()))
    }

    pub fn from_protocols(protocols: &Protocols, stored: Option<&ProtocolsState>) -> Self {
        Self {
            allow_icmp: Configured::Value(protocols.allow_icmp),
            tcp: Configured::Value(ProtocolState::from_protocol(
                &protocols.tcp,
                stored.and_then(|stored| stored.tcp.value()),
            )),
            udp: Configured::Value(ProtocolState::from_protocol(
                &protocols.udp,
                stored.and_then(|stored| stored.udp.value()),
            )),
        }
    }

    /// State form of the default protocols.
    pub fn allow_all() -> Self {
        Self::from_protocols(&Protocols::default(), None)
    }
}

/// Entry of the `access` block list used before access was split into
/// `access_group` and `access_service`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessBlock {
    #[serde(default)]
    pub group_ids: Configured<Vec<String>>,
    #[serde(default)]
    pub service_account_ids: Configured<Vec<String>>,
}

/// Entry of the `protocols` block list of schema version 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolsBlock {
    #[serde(default)]
    pub allow_icmp: Configured<bool>,
    #[serde(default)]
    pub tcp: Configured<Vec<ProtocolState>>,
    #[serde(default)]
    pub udp: Configured<Vec<ProtocolState>>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessService {
    pub service_account_id: String,
}

impl AccessService {
    pub fn new(service_account_id: impl Into<String>) -> Self {
        Self {
            service_account_id: service_account_id.into(),
        }
    }
}

/// Group access entry carrying the split approval/duration attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGroupV2 {
    pub group_id: String,
    #[serde(default)]
    pub security_policy_id: Configured<String>,
    #[serde(default)]
    pub usage_based_autolock_duration_days: Configured<i64>,
    #[serde(default)]
    pub approval_mode: Configured<String>,
}

/// Group access entry with both the split attributes and an access policy set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGroupV3 {
    pub group_id: String,
    #[serde(default)]
    pub security_policy_id: Configured<String>,
    #[serde(default)]
    pub usage_based_autolock_duration_days: Configured<i64>,
    #[serde(default)]
    pub approval_mode: Configured<String>,
    #[serde(default)]
    pub access_policy: Configured<Vec<AccessPolicy>>,
}
