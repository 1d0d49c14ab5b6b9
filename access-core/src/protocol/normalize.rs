use serde::{Deserialize, Serialize};

use super::{Policy, Protocol, ProtocolError, Protocols};
use crate::ports::{parse_ports, ports_equal};

/// One protocol direction as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInput {
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
}

impl ProtocolInput {
    pub fn new(policy: &str, ports: &[&str]) -> Self {
        Self {
            policy: Some(policy.to_string()),
            ports: ports.iter().map(|port| port.to_string()).collect(),
        }
    }

    /// Configuration form of a normalized protocol, using the read-side policy name.
    pub fn from_protocol(protocol: &Protocol) -> Self {
        Self {
            policy: Some(protocol.state_policy().to_string()),
            ports: protocol.port_strings(),
        }
    }
}

/// The protocols block as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolsInput {
    #[serde(default)]
    pub allow_icmp: Option<bool>,
    #[serde(default)]
    pub tcp: Option<ProtocolInput>,
    #[serde(default)]
    pub udp: Option<ProtocolInput>,
}

impl ProtocolsInput {
    pub fn from_protocols(protocols: &Protocols) -> Self {
        Self {
            allow_icmp: Some(protocols.allow_icmp),
            tcp: Some(ProtocolInput::from_protocol(&protocols.tcp)),
            udp: Some(ProtocolInput::from_protocol(&protocols.udp)),
        }
    }
}

/// Parse and validate one protocol direction.
///
/// Ports are parsed first so a malformed token is reported even when the
/// policy would also reject it. `DENY_ALL` comes back as `RESTRICTED` with no
/// ports.
pub fn normalize_protocol<S: AsRef<str>>(
    policy: &str,
    raw_ports: &[S],
) -> Result<Protocol, ProtocolError> {
    let ports = parse_ports(raw_ports)?;
    let policy: Policy = policy.parse()?;

    match policy {
        Policy::AllowAll if !ports.is_empty() => Err(ProtocolError::PortsWithPolicyAllowAll),
        Policy::DenyAll if !ports.is_empty() => Err(ProtocolError::PortsWithPolicyDenyAll),
        Policy::Restricted if ports.is_empty() => Err(ProtocolError::PolicyRestrictedWithoutPorts),
        Policy::DenyAll => Ok(Protocol::new(Policy::Restricted, ports)),
        _ => Ok(Protocol::new(policy, ports)),
    }
}

/// Build the normalized protocols of a resource.
///
/// An absent block yields [`Protocols::default`]. Inside a present block a
/// missing direction is allowed traffic, a missing `allow_icmp` is `true`, and
/// a direction without a policy is `ALLOW_ALL`.
pub fn normalize_protocols(input: Option<&ProtocolsInput>) -> Result<Protocols, ProtocolError> {
    let Some(input) = input else {
        return Ok(Protocols::default());
    };

    Ok(Protocols {
        allow_icmp: input.allow_icmp.unwrap_or(true),
        tcp: normalize_direction(input.tcp.as_ref())?,
        udp: normalize_direction(input.udp.as_ref())?,
    })
}

fn normalize_direction(input: Option<&ProtocolInput>) -> Result<Protocol, ProtocolError> {
    match input {
        None => Ok(Protocol::default()),
        Some(direction) => normalize_protocol(
            direction.policy.as_deref().unwrap_or(Policy::AllowAll.as_str()),
            &direction.ports,
        ),
    }
}

/// Keep the stored port text when it covers the same ports as the computed one.
pub fn prefer_stored_ports(stored: &[String], computed: &[String]) -> Vec<String> {
    if ports_equal(stored, computed) {
        stored.to_vec()
    } else {
        computed.to_vec()
    }
}

pub fn protocols_equal(left: &Protocols, right: &Protocols) -> bool {
    left.allow_icmp == right.allow_icmp
        && left.tcp.semantically_equal(&right.tcp)
        && left.udp.semantically_equal(&right.udp)
}
