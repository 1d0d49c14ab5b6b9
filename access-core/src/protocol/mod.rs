//! Protocol policies for resource traffic.
//!
//! A resource restricts TCP and UDP traffic separately. Each direction carries
//! a [`Policy`] and, for [`Policy::Restricted`], the port ranges that are let
//! through. ICMP is a single on/off switch.
//!
//! ## Local and remote policy names
//!
//! The remote service only knows `ALLOW_ALL` and `RESTRICTED`. `DENY_ALL` is a
//! configuration-side alias for "restricted to nothing": it is accepted on
//! input (without ports) and normalized to `RESTRICTED` with no ports, and it
//! is produced again when state is derived from a remote `RESTRICTED` protocol
//! with no ports. See [`Protocol::state_policy`].

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{format_ports, port_ranges_equal, PortRange, PortRangeParseError};

mod normalize;

pub use normalize::{
    normalize_protocol, normalize_protocols, prefer_stored_ports, protocols_equal, ProtocolInput,
    ProtocolsInput,
};


#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("ALLOW_ALL policy does not allow specifying ports")]
    PortsWithPolicyAllowAll,
    #[error("DENY_ALL policy does not allow specifying ports")]
    PortsWithPolicyDenyAll,
    #[error("RESTRICTED policy requires specifying ports")]
    PolicyRestrictedWithoutPorts,
    #[error("unknown protocol policy `{value}`, expected one of ALLOW_ALL, DENY_ALL, RESTRICTED")]
    InvalidPolicy { value: String },
    #[error(transparent)]
    Port(#[from] PortRangeParseError),
}

/// Traffic policy of one protocol direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Policy {
    #[default]
    AllowAll,
    DenyAll,
    Restricted,
}

impl Policy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Policy::AllowAll => "ALLOW_ALL",
            Policy::DenyAll => "DENY_ALL",
            Policy::Restricted => "RESTRICTED",
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW_ALL" => Ok(Policy::AllowAll),
            "DENY_ALL" => Ok(Policy::DenyAll),
            "RESTRICTED" => Ok(Policy::Restricted),
            other => Err(ProtocolError::InvalidPolicy {
                value: other.to_string(),
            }),
        }
    }
}

/// Normalized policy of one direction, as sent to the remote service.
///
/// After normalization `policy` is never [`Policy::DenyAll`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Protocol {
    pub policy: Policy,
    #[serde(default)]
    pub ports: Vec<PortRange>,
}

impl Protocol {
    pub fn new(policy: Policy, ports: Vec<PortRange>) -> Self {
        Self { policy, ports }
    }

    /// Policy name to persist in local state.
    ///
    /// A restricted protocol with no ports reads back as `DENY_ALL`.
    pub fn state_policy(&self) -> Policy {
        if self.policy == Policy::Restricted && self.ports.is_empty() {
            Policy::DenyAll
        } else {
            self.policy
        }
    }

    /// Ports in their configuration form.
    pub fn port_strings(&self) -> Vec<String> {
        format_ports(&self.ports)
    }

    /// Same policy and same covered ports, regardless of how ranges are written.
    pub fn semantically_equal(&self, other: &Protocol) -> bool {
        self.policy == other.policy && port_ranges_equal(&self.ports, &other.ports)
    }
}

/// TCP, UDP and ICMP settings of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocols {
    pub allow_icmp: bool,
    pub tcp: Protocol,
    pub udp: Protocol,
}

impl Default for Protocols {
    /// Everything allowed; used whenever configuration omits the block.
    fn default() -> Self {
        Self {
            allow_icmp: true,
            tcp: Protocol::default(),
            udp: Protocol::default(),
        }
    }
}
