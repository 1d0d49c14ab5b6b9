use access_core::{Configured, MigrationWarning};

use super::{single_element, StepError, StepOutput};
use crate::attr::Attr;
use crate::records::{ProtocolsBlock, ProtocolsState, ResourceV0, ResourceV1};

/// Protocols move from a block list to a single object.
///
/// A missing or empty block list becomes the default protocols. Empty
/// `alias` and `security_policy_id` strings become null.
pub fn upgrade_resource_v0(prior: ResourceV0) -> Result<StepOutput<ResourceV1>, StepError> {
    let blocks = prior.protocols.into_value().unwrap_or_default();
    let used_blocks = !blocks.is_empty();

    let protocols = match single_element(Attr::Protocols.name(), blocks)? {
        Some(block) => {
            let stored = protocols_object(block)?;
            let normalized = stored.normalize()?;
            ProtocolsState::from_protocols(&normalized, Some(&stored))
        }
        None => ProtocolsState::allow_all(),
    };

    let record = ResourceV1 {
        id: prior.id,
        name: prior.name,
        address: prior.address,
        remote_network_id: prior.remote_network_id,
        is_active: Configured::Unset,
        is_authoritative: prior.is_authoritative,
        is_visible: prior.is_visible,
        is_browser_shortcut_enabled: prior.is_browser_shortcut_enabled,
        alias: prior.alias.unset_if(String::is_empty),
        security_policy_id: prior.security_policy_id.unset_if(String::is_empty),
        access: prior.access,
        protocols: Configured::Value(protocols),
    };

    let warning = used_blocks.then(|| {
        MigrationWarning::new(
            "Please upgrade protocols sections",
            "protocols moved from a block list to a single object attribute",
        )
    });
    Ok(StepOutput::new(record, warning))
}

fn protocols_object(block: ProtocolsBlock) -> Result<ProtocolsState, StepError> {
    let tcp = single_element(
        Attr::Protocols.nested(Attr::Tcp),
        block.tcp.into_value().unwrap_or_default(),
    )?;
    let udp = single_element(
        Attr::Protocols.nested(Attr::Udp),
        block.udp.into_value().unwrap_or_default(),
    )?;

    Ok(ProtocolsState {
        allow_icmp: block.allow_icmp,
        tcp: Configured::from_option(tcp),
        udp: Configured::from_option(udp),
    })
}
