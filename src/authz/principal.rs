use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{PermissionAction, PermissionGrant, PermissionResourceType, Reference, ReferenceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberType {
    User,
    Group,
}

/// The subject of a permission check: a user or a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "type")]
    pub kind: MemberType,
    pub id: String,
}

impl Principal {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: MemberType::User,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: MemberType::Group,
            id: id.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.kind == MemberType::User
    }

    pub fn is_group(&self) -> bool {
        self.kind == MemberType::Group
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberType::User => write!(f, "user:{}", self.id),
            MemberType::Group => write!(f, "group:{}", self.id),
        }
    }
}

/// What is being asked for: actions on a resource type of one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    pub reference: Reference,
    pub resource_type: PermissionResourceType,
    pub required: PermissionGrant,
}

impl PermissionRequest {
    pub fn new(
        reference_type: ReferenceType,
        reference_id: impl Into<String>,
        resource_type: PermissionResourceType,
    ) -> Self {
        Self {
            reference: Reference::new(reference_type, reference_id),
            resource_type,
            required: PermissionGrant::empty(),
        }
    }

    #[must_use]
    pub fn requiring(mut self, actions: impl IntoIterator<Item = PermissionAction>) -> Self {
        self.required = self.required.union(PermissionGrant::of(actions));
        self
    }

    #[must_use]
    pub fn requiring_grant(mut self, grant: PermissionGrant) -> Self {
        self.required = self.required.union(grant);
        self
    }
}
