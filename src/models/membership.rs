use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::authz::Principal;
use crate::models::{ReferenceType, RoleKey, RoleScope};

// =============================================================================
// REFERENCE
// =============================================================================

/// An entity instance memberships can point at, e.g. `APPLICATION:app-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    pub id: String,
}

impl Reference {
    pub fn new(reference_type: ReferenceType, id: impl Into<String>) -> Self {
        Self {
            reference_type,
            id: id.into(),
        }
    }

    pub fn api(id: impl Into<String>) -> Self {
        Self::new(ReferenceType::Api, id)
    }

    pub fn application(id: impl Into<String>) -> Self {
        Self::new(ReferenceType::Application, id)
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::new(ReferenceType::Group, id)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference_type, self.id)
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Binding of a principal to a named role on a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub member: Principal,
    pub reference: Reference,
    pub scope: RoleScope,
    pub role: String,
}

impl Membership {
    pub fn new(
        member: Principal,
        reference: Reference,
        scope: RoleScope,
        role: impl Into<String>,
    ) -> Self {
        Self {
            member,
            reference,
            scope,
            role: role.into(),
        }
    }

    pub fn role_key(&self) -> RoleKey {
        RoleKey::new(self.scope, self.role.clone())
    }
}

/// A group principals can belong to, with the role its members receive per scope
/// when the group stands in for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub roles: BTreeMap<RoleScope, String>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, scope: RoleScope, role: impl Into<String>) -> Self {
        self.roles.insert(scope, role.into());
        self
    }

    pub fn role_for(&self, scope: RoleScope) -> Option<&str> {
        self.roles.get(&scope).map(String::as_str)
    }
}

// =============================================================================
// RESOLVED ROLES
// =============================================================================

/// Where a held role came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipOrigin {
    /// An explicit membership record on the reference.
    Direct,
    /// Synthesized from primary ownership of the reference.
    Ownership,
    /// Inherited through a group attached to the reference.
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldRole {
    #[serde(flatten)]
    pub key: RoleKey,
    pub origin: MembershipOrigin,
}

/// Set of `(scope, role)` pairs a principal holds on one reference.
///
/// Duplicates collapse; the first origin recorded for a key is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldRoles {
    roles: BTreeMap<RoleKey, MembershipOrigin>,
}

impl HeldRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RoleKey, origin: MembershipOrigin) -> bool {
        if self.roles.contains_key(&key) {
            return false;
        }
        self.roles.insert(key, origin);
        true
    }

    pub fn contains(&self, key: &RoleKey) -> bool {
        self.roles.contains_key(key)
    }

    pub fn origin(&self, key: &RoleKey) -> Option<MembershipOrigin> {
        self.roles.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RoleKey> {
        self.roles.keys()
    }

    pub fn in_scope(&self, scope: RoleScope) -> impl Iterator<Item = &RoleKey> {
        self.roles.keys().filter(move |key| key.scope == scope)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn to_vec(&self) -> Vec<HeldRole> {
        self.roles
            .iter()
            .map(|(key, origin)| HeldRole {
                key: key.clone(),
                origin: *origin,
            })
            .collect()
    }
}

impl FromIterator<RoleKey> for HeldRoles {
    fn from_iter<I: IntoIterator<Item = RoleKey>>(iter: I) -> Self {
        let mut held = HeldRoles::new();
        for key in iter {
            held.insert(key, MembershipOrigin::Direct);
        }
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_and_keep_first_origin() {
        let mut held = HeldRoles::new();
        let key = RoleKey::new(RoleScope::Api, "PRIMARY_OWNER");

        assert!(held.insert(key.clone(), MembershipOrigin::Direct));
        assert!(!held.insert(key.clone(), MembershipOrigin::Ownership));
        assert_eq!(held.len(), 1);
        assert_eq!(held.origin(&key), Some(MembershipOrigin::Direct));
    }

    #[test]
    fn scope_filter_ignores_other_scopes() {
        let held: HeldRoles = [
            RoleKey::new(RoleScope::Api, "OWNER"),
            RoleKey::new(RoleScope::Application, "OWNER"),
        ]
        .into_iter()
        .collect();

        let api: Vec<_> = held.in_scope(RoleScope::Api).collect();
        assert_eq!(api, vec![&RoleKey::new(RoleScope::Api, "OWNER")]);
    }

    #[test]
    fn reference_serializes_with_type_tag() {
        let json = serde_json::to_value(Reference::application("app-1")).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "APPLICATION", "id": "app-1"}));
    }
}
