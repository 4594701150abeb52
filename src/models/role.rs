use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AuthzError, AuthzResult};
use crate::models::{PermissionGrant, PermissionResourceType, RoleScope};

// =============================================================================
// ROLE KEY
// =============================================================================

/// Identity of a role: names are unique only within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleKey {
    pub scope: RoleScope,
    pub name: String,
}

impl RoleKey {
    pub fn new(scope: RoleScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.name)
    }
}

// =============================================================================
// SYSTEM ROLES
// =============================================================================

/// Roles the console creates itself and reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRole {
    Admin,
    PrimaryOwner,
    User,
}

impl SystemRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemRole::Admin => "ADMIN",
            SystemRole::PrimaryOwner => "PRIMARY_OWNER",
            SystemRole::User => "USER",
        }
    }

    pub fn is_system(name: &str) -> bool {
        [SystemRole::Admin, SystemRole::PrimaryOwner, SystemRole::User]
            .iter()
            .any(|role| role.as_str() == name)
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// A named, scoped bundle of grants.
///
/// Roles are immutable once built; `with_grant` and friends return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    scope: RoleScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    default_role: bool,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    permissions: BTreeMap<PermissionResourceType, PermissionGrant>,
}

impl Role {
    pub fn new(scope: RoleScope, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope,
            description: None,
            default_role: false,
            system: false,
            permissions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_grant(mut self, resource_type: PermissionResourceType, grant: PermissionGrant) -> Self {
        if grant.is_empty() {
            self.permissions.remove(&resource_type);
        } else {
            self.permissions.insert(resource_type, grant);
        }
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default_role = true;
        self
    }

    #[must_use]
    pub(crate) fn as_system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Builds a role from `(resource type, grant code)` pairs as administrators
    /// store them, e.g. `("DOCUMENTATION", "CRUD")`.
    pub fn from_codes<'a>(
        scope: RoleScope,
        name: impl Into<String>,
        codes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> AuthzResult<Self> {
        let mut role = Role::new(scope, name);
        for (resource_type, code) in codes {
            let resource_type: PermissionResourceType = resource_type.parse()?;
            let grant: PermissionGrant = code.parse()?;
            role = role.with_grant(resource_type, grant);
        }
        Ok(role)
    }

    /// Builds a role from its packed storage form. Masks sharing a resource
    /// type are unioned.
    pub fn from_masks(
        scope: RoleScope,
        name: impl Into<String>,
        masks: impl IntoIterator<Item = i64>,
    ) -> AuthzResult<Self> {
        let mut role = Role::new(scope, name);
        for mask in masks {
            let (resource_type, grant) = PermissionGrant::unpack(mask)?;
            let merged = role.grant_for(resource_type) | grant;
            role = role.with_grant(resource_type, merged);
        }
        Ok(role)
    }

    pub fn to_masks(&self) -> Vec<i64> {
        self.permissions
            .iter()
            .map(|(resource_type, grant)| grant.pack(*resource_type))
            .collect()
    }

    pub fn key(&self) -> RoleKey {
        RoleKey::new(self.scope, self.name.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> RoleScope {
        self.scope
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.default_role
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Grant for `resource_type`; an unmapped type grants nothing.
    pub fn grant_for(&self, resource_type: PermissionResourceType) -> PermissionGrant {
        self.permissions
            .get(&resource_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn permissions(&self) -> &BTreeMap<PermissionResourceType, PermissionGrant> {
        &self.permissions
    }
}

/// Stored shape of a role: resource types and grants as plain strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub scope: RoleScope,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
}

impl TryFrom<RoleRecord> for Role {
    type Error = AuthzError;

    fn try_from(value: RoleRecord) -> Result<Self, Self::Error> {
        let mut role = Role::from_codes(
            value.scope,
            value.name,
            value
                .permissions
                .iter()
                .map(|(resource_type, code)| (resource_type.as_str(), code.as_str())),
        )?;
        if let Some(description) = value.description {
            role = role.with_description(description);
        }
        if value.default {
            role = role.as_default();
        }
        Ok(role)
    }
}

/// The built-in roles: full rights on every resource type of their scope.
pub fn system_roles() -> Vec<Role> {
    let full = |scope: RoleScope, name: SystemRole, skip: &[PermissionResourceType]| {
        PermissionResourceType::for_scope(scope)
            .filter(|resource_type| !skip.contains(resource_type))
            .fold(Role::new(scope, name.as_str()), |role, resource_type| {
                role.with_grant(resource_type, PermissionGrant::all())
            })
            .with_description("System role")
            .as_system()
    };

    vec![
        full(RoleScope::Organization, SystemRole::Admin, &[]),
        full(RoleScope::Environment, SystemRole::Admin, &[]),
        full(
            RoleScope::Api,
            SystemRole::PrimaryOwner,
            &[PermissionResourceType::Reviews],
        ),
        full(RoleScope::Application, SystemRole::PrimaryOwner, &[]),
        full(RoleScope::Integration, SystemRole::PrimaryOwner, &[]),
        full(RoleScope::Group, SystemRole::Admin, &[]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PermissionAction;

    fn owner() -> Role {
        Role::new(RoleScope::Application, "OWNER")
            .with_grant(PermissionResourceType::Documentation, PermissionGrant::all())
    }

    #[test]
    fn unmapped_resource_type_grants_nothing() {
        let role = owner();
        assert_eq!(role.grant_for(PermissionResourceType::Documentation), PermissionGrant::all());
        assert!(role.grant_for(PermissionResourceType::Plan).is_empty());
    }

    #[test]
    fn updates_produce_new_values() {
        let original = owner();
        let updated = original
            .clone()
            .with_grant(PermissionResourceType::Plan, PermissionAction::Read.into());

        assert!(original.grant_for(PermissionResourceType::Plan).is_empty());
        assert!(updated.grant_for(PermissionResourceType::Plan).contains(PermissionAction::Read));
    }

    #[test]
    fn empty_grant_removes_mapping() {
        let role = owner().with_grant(PermissionResourceType::Documentation, PermissionGrant::empty());
        assert!(role.permissions().is_empty());
    }

    #[test]
    fn from_codes_rejects_bad_codes() {
        let err = Role::from_codes(RoleScope::Api, "WRITER", [("PLAN", "CRX")]).unwrap_err();
        assert_eq!(err, AuthzError::invalid_grant("CRX", 'X'));

        let err = Role::from_codes(RoleScope::Api, "WRITER", [("PAGES", "R")]).unwrap_err();
        assert_eq!(err, AuthzError::UnknownResourceType("PAGES".into()));
    }

    #[test]
    fn packed_form_round_trips() {
        let role = Role::from_codes(
            RoleScope::Api,
            "WRITER",
            [("DEFINITION", "RU"), ("DOCUMENTATION", "CRUD")],
        )
        .expect("valid role");

        let restored = Role::from_masks(RoleScope::Api, "WRITER", role.to_masks()).expect("valid masks");
        assert_eq!(restored.permissions(), role.permissions());
    }

    #[test]
    fn masks_for_the_same_type_are_unioned() {
        let read = PermissionGrant::from(PermissionAction::Read).pack(PermissionResourceType::Plan);
        let update = PermissionGrant::from(PermissionAction::Update).pack(PermissionResourceType::Plan);

        let role = Role::from_masks(RoleScope::Api, "PLANNER", [read, update]).expect("valid masks");
        assert_eq!(role.grant_for(PermissionResourceType::Plan).to_string(), "RU");
        assert_eq!(role.to_masks().len(), 1);
    }

    #[test]
    fn record_conversion_keeps_flags() {
        let record = RoleRecord {
            scope: RoleScope::Api,
            name: "USER".into(),
            description: Some("Read only".into()),
            default: true,
            permissions: BTreeMap::from([("DEFINITION".to_string(), "R".to_string())]),
        };
        let role = Role::try_from(record).expect("valid record");
        assert!(role.is_default());
        assert_eq!(role.description(), Some("Read only"));
        assert_eq!(role.grant_for(PermissionResourceType::Definition).to_string(), "R");
    }

    #[test]
    fn api_primary_owner_excludes_reviews() {
        let roles = system_roles();
        let api_owner = roles
            .iter()
            .find(|role| role.key() == RoleKey::new(RoleScope::Api, "PRIMARY_OWNER"))
            .expect("api primary owner");

        assert!(api_owner.is_system());
        assert!(api_owner.grant_for(PermissionResourceType::Reviews).is_empty());
        assert_eq!(api_owner.grant_for(PermissionResourceType::Plan), PermissionGrant::all());
    }

    #[test]
    fn system_role_names_are_reserved() {
        assert!(SystemRole::is_system("PRIMARY_OWNER"));
        assert!(!SystemRole::is_system("OWNER"));
    }
}
