//! Schema upgrades for persisted records.
//!
//! A record is stored with the schema version it was written under. [`upgrade`]
//! decodes it at that version and walks it forward one step at a time until it
//! reaches the current shape. Each step is a pure function from one version's
//! struct to the next and may report one deprecation notice; the notices of a
//! run are merged into at most one warning.
//!
//! An error at any step aborts the whole run. Nothing is returned for a
//! partially upgraded record, so a caller never persists a half-migrated
//! state.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use access_core::legacy::LegacyMigrationError;
use access_core::{MigrationWarning, ProtocolError};

use crate::records::{
    GroupV0, GroupV1, ResourceV0, ResourceV1, ResourceV2, ResourceV3, ResourceV4,
};

mod group;
mod v0;
mod v1;
mod v2;
mod v3;

pub use group::upgrade_group_v0;
pub use v0::upgrade_resource_v0;
pub use v1::upgrade_resource_v1;
pub use v2::upgrade_resource_v2;
pub use v3::upgrade_resource_v3;


/// Kind of persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Resource,
    Group,
}

impl RecordKind {
    /// Schema version at the head of the chain.
    pub const fn current_version(self) -> u32 {
        match self {
            RecordKind::Resource => 4,
            RecordKind::Group => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Resource => "resource",
            RecordKind::Group => "group",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single upgrade step.
///
/// Errors from the port, protocol and legacy policy migrators are carried
/// unchanged.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Legacy(#[from] LegacyMigrationError),
    #[error("{attr} holds {count} elements, expected at most one")]
    TooManyElements { attr: String, count: usize },
}

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("unsupported {kind} schema version {version}, expected 0 to {current}")]
    UnsupportedVersion {
        kind: RecordKind,
        version: u32,
        current: u32,
    },
    #[error("failed to decode {kind} state at version {version}: {source}")]
    Decode {
        kind: RecordKind,
        version: u32,
        source: serde_json::Error,
    },
    #[error("failed to encode upgraded {kind} state: {source}")]
    Encode {
        kind: RecordKind,
        source: serde_json::Error,
    },
    #[error("during upgrade from version {version}: {source}")]
    Step { version: u32, source: StepError },
}

/// Result of one step: the next-version record and an optional notice.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput<T> {
    pub record: T,
    pub warning: Option<MigrationWarning>,
}

impl<T> StepOutput<T> {
    pub fn new(record: T, warning: Option<MigrationWarning>) -> Self {
        Self { record, warning }
    }
}

/// A record at the head of the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Upgraded {
    pub version: u32,
    pub record: Value,
    pub warnings: Vec<MigrationWarning>,
}

/// Upgrade a raw record of `kind` persisted at `version` to the current shape.
///
/// A record already at the current version is decoded and re-encoded, which
/// validates it without changing it.
pub fn upgrade(kind: RecordKind, version: u32, raw: Value) -> Result<Upgraded, UpgradeError> {
    let current = kind.current_version();
    if version > current {
        return Err(UpgradeError::UnsupportedVersion {
            kind,
            version,
            current,
        });
    }

    let mut notices = Vec::new();
    let record = match kind {
        RecordKind::Resource => {
            let upgraded = upgrade_resource(version, raw, &mut notices)?;
            encode(kind, &upgraded)?
        }
        RecordKind::Group => {
            let upgraded = upgrade_group(version, raw, &mut notices)?;
            encode(kind, &upgraded)?
        }
    };

    let warnings: Vec<MigrationWarning> = consolidate(notices).into_iter().collect();
    for warning in &warnings {
        warn!(%kind, summary = %warning.summary, "deprecated attributes migrated");
    }
    info!(%kind, from = version, to = current, "record upgraded");

    Ok(Upgraded {
        version: current,
        record,
        warnings,
    })
}

enum ResourceStage {
    V0(ResourceV0),
    V1(ResourceV1),
    V2(ResourceV2),
    V3(ResourceV3),
    V4(ResourceV4),
}

/// Decode a resource at `version` and walk it to the current shape.
pub fn upgrade_resource(
    version: u32,
    raw: Value,
    notices: &mut Vec<(u32, MigrationWarning)>,
) -> Result<ResourceV4, UpgradeError> {
    let kind = RecordKind::Resource;
    let mut stage = match version {
        0 => ResourceStage::V0(decode(kind, version, raw)?),
        1 => ResourceStage::V1(decode(kind, version, raw)?),
        2 => ResourceStage::V2(decode(kind, version, raw)?),
        3 => ResourceStage::V3(decode(kind, version, raw)?),
        4 => ResourceStage::V4(decode(kind, version, raw)?),
        _ => {
            return Err(UpgradeError::UnsupportedVersion {
                kind,
                version,
                current: kind.current_version(),
            })
        }
    };

    loop {
        stage = match stage {
            ResourceStage::V0(record) => {
                ResourceStage::V1(apply_step(0, upgrade_resource_v0(record), notices)?)
            }
            ResourceStage::V1(record) => {
                ResourceStage::V2(apply_step(1, upgrade_resource_v1(record), notices)?)
            }
            ResourceStage::V2(record) => {
                ResourceStage::V3(apply_step(2, upgrade_resource_v2(record), notices)?)
            }
            ResourceStage::V3(record) => {
                ResourceStage::V4(apply_step(3, upgrade_resource_v3(record), notices)?)
            }
            ResourceStage::V4(record) => return Ok(record),
        };
    }
}

/// Decode a group at `version` and walk it to the current shape.
pub fn upgrade_group(
    version: u32,
    raw: Value,
    notices: &mut Vec<(u32, MigrationWarning)>,
) -> Result<GroupV1, UpgradeError> {
    let kind = RecordKind::Group;
    match version {
        0 => {
            let record: GroupV0 = decode(kind, version, raw)?;
            apply_step(0, upgrade_group_v0(record), notices)
        }
        1 => decode(kind, version, raw),
        _ => Err(UpgradeError::UnsupportedVersion {
            kind,
            version,
            current: kind.current_version(),
        }),
    }
}

fn apply_step<T>(
    version: u32,
    step: Result<StepOutput<T>, StepError>,
    notices: &mut Vec<(u32, MigrationWarning)>,
) -> Result<T, UpgradeError> {
    let output = step.map_err(|source| UpgradeError::Step { version, source })?;
    debug!(
        from = version,
        to = version + 1,
        deprecated = output.warning.is_some(),
        "applied upgrade step"
    );
    if let Some(warning) = output.warning {
        notices.push((version, warning));
    }
    Ok(output.record)
}

fn decode<T: serde::de::DeserializeOwned>(
    kind: RecordKind,
    version: u32,
    raw: Value,
) -> Result<T, UpgradeError> {
    serde_json::from_value(raw).map_err(|source| UpgradeError::Decode {
        kind,
        version,
        source,
    })
}

fn encode<T: Serialize>(kind: RecordKind, record: &T) -> Result<Value, UpgradeError> {
    serde_json::to_value(record).map_err(|source| UpgradeError::Encode { kind, source })
}

/// Merge the notices of one run into a single warning.
///
/// The summary is taken from the first notice and the detail lists every
/// step that reported one.
pub fn consolidate(notices: Vec<(u32, MigrationWarning)>) -> Option<MigrationWarning> {
    let summary = notices.first()?.1.summary.clone();
    let detail = notices
        .iter()
        .map(|(version, notice)| format!("v{version} -> v{}: {}", version + 1, notice.detail))
        .collect::<Vec<_>>()
        .join("; ");
    Some(MigrationWarning::new(summary, detail))
}

/// Reject lists that the schema allowed to hold at most one element.
pub(crate) fn single_element<T>(
    attr: impl Into<String>,
    items: Vec<T>,
) -> Result<Option<T>, StepError> {
    if items.len() > 1 {
        return Err(StepError::TooManyElements {
            attr: attr.into(),
            count: items.len(),
        });
    }
    Ok(items.into_iter().next())
}
