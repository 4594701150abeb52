use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::authz::Principal;
use crate::errors::{AuthzError, AuthzResult};
use crate::models::{system_roles, Group, Membership, Reference, Role, RoleRecord};
use crate::store::InMemoryDirectory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryOwnerRecord {
    pub reference: Reference,
    pub owner: Principal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceGroupsRecord {
    pub reference: Reference,
    pub groups: Vec<String>,
}

/// JSON snapshot of everything the engine reads: roles, memberships,
/// ownership and group attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default = "default_true")]
    pub include_system_roles: bool,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub primary_owners: Vec<PrimaryOwnerRecord>,
    #[serde(default)]
    pub reference_groups: Vec<ReferenceGroupsRecord>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

fn default_true() -> bool {
    true
}

impl Default for DirectoryFixture {
    fn default() -> Self {
        Self {
            include_system_roles: true,
            roles: Vec::new(),
            memberships: Vec::new(),
            primary_owners: Vec::new(),
            reference_groups: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl DirectoryFixture {
    pub fn from_json(json: &str) -> AuthzResult<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(deserializer)
            .map_err(|err| AuthzError::fixture(format!("{} at {}", err.inner(), err.path())))
    }

    pub fn from_path(path: impl AsRef<Path>) -> AuthzResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| AuthzError::fixture(format!("failed to read {}: {err}", path.display())))?;
        Self::from_json(&json)
    }

    /// Validates every role and loads the snapshot. Malformed grants fail here,
    /// never at evaluation time.
    pub fn into_directory(self) -> AuthzResult<InMemoryDirectory> {
        let roles = self
            .roles
            .into_iter()
            .map(Role::try_from)
            .collect::<AuthzResult<Vec<_>>>()?;

        let directory = InMemoryDirectory::new();
        if self.include_system_roles {
            for role in system_roles() {
                directory.upsert_role(role);
            }
        }
        for role in roles {
            directory.upsert_role(role);
        }
        for membership in self.memberships {
            directory.add_membership(membership);
        }
        for record in self.primary_owners {
            directory.set_primary_owner(record.reference, record.owner);
        }
        for record in self.reference_groups {
            for group in record.groups {
                directory.attach_group(record.reference.clone(), group);
            }
        }
        for group in self.groups {
            directory.upsert_group(group);
        }

        tracing::debug!("directory fixture loaded");
        Ok(directory)
    }
}
