//! Persisted record shapes, one struct per schema version.
//!
//! Every shape is a plain data holder decoded from the `attributes` object of
//! a state file. Optional attributes are [`Configured`](access_core::Configured)
//! so that null, unknown and known values stay distinct across upgrades.
//! Unknown keys are rejected, which keeps a record from being decoded with
//! the wrong version.
//!
//! | Version | `protocols` | access | access policy |
//! |---|---|---|---|
//! | 0 | block list | `access` block list | none |
//! | 1 | object | `access` block list | none |
//! | 2 | object | `access_group` / `access_service` sets | split `approval_mode` / `usage_based_autolock_duration_days` |
//! | 3 | object | sets | `access_policy` set plus the split attributes |
//! | 4 | object | sets | `access_policy` object |

mod common;
mod group;
mod v0;
mod v1;
mod v2;
mod v3;
mod v4;

pub use common::{
    AccessBlock, AccessGroupV2, AccessGroupV3, AccessService, ProtocolState, ProtocolsBlock,
    ProtocolsState, Tags,
};
pub use group::{GroupV0, GroupV1};
pub use v0::ResourceV0;
pub use v1::ResourceV1;
pub use v2::ResourceV2;
pub use v3::ResourceV3;
pub use v4::ResourceV4;

/// Resource shape at the head of the upgrade chain.
pub type ResourceState = ResourceV4;
/// Group shape at the head of the upgrade chain.
pub type GroupState = GroupV1;
