//! Contract with the remote access-control service.
//!
//! The transport itself lives elsewhere. [`SnapshotClient`] implements the
//! contract over a JSON document so reconciliation can run offline and in
//! tests.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{AccessInput, Group, Resource};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The object does not exist remotely. Callers clear local state on this.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("failed to {operation}: {message}")]
    Request { operation: String, message: String },
    #[error("failed to read remote snapshot {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode remote snapshot {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    fn resource_not_found(id: &str) -> Self {
        ClientError::NotFound {
            kind: "resource",
            id: id.to_string(),
        }
    }
}

/// Remote operations used by reconciliation.
pub trait RemoteClient {
    fn read_resource(&self, id: &str) -> Result<Resource, ClientError>;
    fn create_resource(&mut self, resource: &Resource) -> Result<Resource, ClientError>;
    /// Update every attribute except access grants.
    fn update_resource(&mut self, resource: &Resource) -> Result<Resource, ClientError>;
    fn delete_resource(&mut self, id: &str) -> Result<(), ClientError>;
    /// Add or replace grants. Existing grants for other principals are kept.
    fn set_resource_access(
        &mut self,
        resource_id: &str,
        access: &[AccessInput],
    ) -> Result<(), ClientError>;
    /// Revoke the grants of the given groups and service accounts.
    fn remove_resource_access(
        &mut self,
        resource_id: &str,
        principal_ids: &[String],
    ) -> Result<(), ClientError>;
    fn read_group(&self, id: &str) -> Result<Group, ClientError>;
}

/// Serialized remote state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub resources: Vec<Resource>,
    pub groups: Vec<Group>,
}

/// In-memory remote backed by a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotClient {
    snapshot: Snapshot,
    created: usize,
}

impl SnapshotClient {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            created: 0,
        }
    }

    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let raw = fs::read_to_string(path).map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&raw).map_err(|source| ClientError::Decode {
                path: path.display().to_string(),
                source,
            })?;
        debug!(
            path = %path.display(),
            resources = snapshot.resources.len(),
            groups = snapshot.groups.len(),
            "loaded remote snapshot"
        );

        Ok(Self::new(snapshot))
    }

    fn resource_mut(&mut self, id: &str) -> Result<&mut Resource, ClientError> {
        self.snapshot
            .resources
            .iter_mut()
            .find(|resource| resource.id == id)
            .ok_or_else(|| ClientError::resource_not_found(id))
    }
}

impl RemoteClient for SnapshotClient {
    fn read_resource(&self, id: &str) -> Result<Resource, ClientError> {
        self.snapshot
            .resources
            .iter()
            .find(|resource| resource.id == id)
            .cloned()
            .ok_or_else(|| ClientError::resource_not_found(id))
    }

    fn create_resource(&mut self, resource: &Resource) -> Result<Resource, ClientError> {
        let mut created = resource.clone();
        if created.id.is_empty() {
            self.created += 1;
            created.id = format!("resource-{}", self.created);
        }
        if self.read_resource(&created.id).is_ok() {
            return Err(ClientError::Request {
                operation: "create resource".to_string(),
                message: format!("resource {} already exists", created.id),
            });
        }
        created.protocols = Some(created.protocols_or_default());
        created.is_authoritative = false;

        self.snapshot.resources.push(created.clone());
        Ok(created)
    }

    fn update_resource(&mut self, resource: &Resource) -> Result<Resource, ClientError> {
        let stored = self.resource_mut(&resource.id)?;
        let groups_access = std::mem::take(&mut stored.groups_access);
        let service_accounts = std::mem::take(&mut stored.service_accounts);

        *stored = Resource {
            protocols: Some(resource.protocols_or_default()),
            is_authoritative: false,
            groups_access,
            service_accounts,
            ..resource.clone()
        };
        Ok(stored.clone())
    }

    fn delete_resource(&mut self, id: &str) -> Result<(), ClientError> {
        let before = self.snapshot.resources.len();
        self.snapshot.resources.retain(|resource| resource.id != id);
        if self.snapshot.resources.len() == before {
            return Err(ClientError::resource_not_found(id));
        }
        Ok(())
    }

    fn set_resource_access(
        &mut self,
        resource_id: &str,
        access: &[AccessInput],
    ) -> Result<(), ClientError> {
        let stored = self.resource_mut(resource_id)?;
        for input in access {
            match input {
                AccessInput::Group(group) => {
                    match stored
                        .groups_access
                        .iter_mut()
                        .find(|existing| existing.group_id == group.group_id)
                    {
                        Some(existing) => *existing = group.clone(),
                        None => stored.groups_access.push(group.clone()),
                    }
                }
                AccessInput::ServiceAccount { service_account_id } => {
                    if !stored.service_accounts.contains(service_account_id) {
                        stored.service_accounts.push(service_account_id.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_resource_access(
        &mut self,
        resource_id: &str,
        principal_ids: &[String],
    ) -> Result<(), ClientError> {
        let stored = self.resource_mut(resource_id)?;
        stored
            .groups_access
            .retain(|group| !principal_ids.contains(&group.group_id));
        stored
            .service_accounts
            .retain(|account| !principal_ids.contains(account));
        Ok(())
    }

    fn read_group(&self, id: &str) -> Result<Group, ClientError> {
        self.snapshot
            .groups
            .iter()
            .find(|group| group.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "group",
                id: id.to_string(),
            })
    }
}
