//! Versioned access-state migration and reconciliation.
//!
//! Persisted resource and group records carry the schema version they were
//! written under. This crate upgrades them to the current shape and keeps
//! them in step with the remote access-control service.
//!
//! # Architecture
//!
//! ## State
//!
//! - [`attr`]: Attribute names, one constant per persisted attribute
//! - [`records`]: Record shapes, one struct per schema version
//! - [`state_file`]: The `{schema_version, attributes}` envelope on disk
//!
//! ## Upgrades
//!
//! - [`upgrade`]: Step-by-step upgrade chain with consolidated deprecation warnings
//!
//! ## Reconciliation
//!
//! - [`model`]: Domain objects exchanged with the remote service
//! - [`client`]: Remote client contract and the snapshot-backed client
//! - [`reconcile`]: Refresh, access-change computation and plan application
//!
//! ## Tooling
//!
//! - [`settings`]: TOML settings with embedded defaults
//! - [`logging`]: `tracing` subscriber setup
//! - [`report`]: Terminal rendering
//!
//! Port ranges, protocol normalization, set algebra and the legacy access
//! policy migrator live in `access-core`.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use state_upgrade::upgrade::{upgrade, RecordKind};
//!
//! let upgraded = upgrade(
//!     RecordKind::Resource,
//!     2,
//!     json!({ "id": "r1", "usage_based_autolock_duration_days": 3 }),
//! )?;
//! assert_eq!(upgraded.version, 4);
//! assert_eq!(upgraded.record["access_policy"]["duration"], "72h");
//! assert_eq!(upgraded.warnings.len(), 1);
//! # Ok::<(), state_upgrade::upgrade::UpgradeError>(())
//! ```

pub mod attr;
pub mod client;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod records;
pub mod report;
pub mod settings;
pub mod state_file;
pub mod upgrade;
