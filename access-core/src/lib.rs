//! Typed access-control primitives shared by state upgrades and reconciliation.
//!
//! ```
//! use access_core::ports::ports_equal;
//!
//! assert!(ports_equal(&["80-81", "70"], &["70", "80", "81"]));
//! ```

pub mod access;
pub mod configured;
pub mod duration;
pub mod global_id;
pub mod legacy;
pub mod ports;
pub mod protocol;
pub mod sets;

pub use access::{
    AccessGroup, AccessPolicy, AccessPolicyError, AccessPolicyMode, ApprovalMode, LegacyAccessGroup,
};
pub use configured::Configured;
pub use global_id::{check_global_id, GlobalIdError, GlobalIdKind};
pub use legacy::{migrate_approval_mode, migrate_legacy_access_group, MigrationWarning};
pub use ports::{ports_equal, PortRange, PortRangeParseError};
pub use protocol::{Policy, Protocol, ProtocolError, Protocols};
